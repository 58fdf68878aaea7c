//! Import and export of entry tables through the transform pipeline

mod common;

use alx::compression::{CompressionMethod, AKLZ_MAGIC};
use alx::config::DEFAULT_CONFIG;
use alx::entry::{kinds, MessageKind};
use alx::{
    AlxError, Config, Direction, EntryStore, Root, StdEntryTransform, Transform, TransformState, Worker,
    WorkerMode,
};
use common::{dc_install, gc_install, gc_root, new_root, ENEMY_RECORDS};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const WEAPON_OFFSET: usize = 0x2C0A40;
const WEAPON_SIZE: usize = 36;

fn run(root: &Root, kind: &str, direction: Direction) -> TransformState {
    let kind = kinds::find(kind).unwrap();
    let mut transform = StdEntryTransform::new(kind, direction, root).unwrap();
    transform.exec(&Worker::new(WorkerMode::Thread))
}

fn rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

fn row(path: &Path, id: i64) -> Vec<String> {
    rows(path)
        .into_iter()
        .find(|cells| cells[0] == id.to_string())
        .unwrap()
}

fn edit_row(path: &Path, id: i64, edits: &[(usize, &str)]) {
    let lines: Vec<String> = rows(path)
        .into_iter()
        .map(|mut cells| {
            if cells[0] == id.to_string() {
                for (index, value) in edits {
                    cells[*index] = value.to_string();
                }
            }
            cells.join(",")
        })
        .collect();
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_export_writes_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());

    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);

    let table = rows(&dir.path().join("data/weapon.csv"));
    assert_eq!(table.len(), 1 + 0x50);
    assert_eq!(
        table[0][..7],
        ["Entry ID", "Name", "Character ID", "Buy Price", "Attack", "Hit %", "Trait [1] ID"]
    );
    assert_eq!(table[1][0], "0");
    assert_eq!(table[0x50][0], "79");
}

#[test]
fn test_import_patches_records_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());
    let csv = dir.path().join("data/weapon.csv");

    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);
    edit_row(&csv, 1, &[(1, "Cutlass"), (4, "30")]);
    assert_eq!(run(&root, "weapon", Direction::Import), TransformState::Done);

    let dol = fs::read(dir.path().join("root/&&systemdata/Start.dol")).unwrap();
    assert_eq!(dol.len(), common::EXECUTABLE_SIZE);
    let record = &dol[WEAPON_OFFSET + WEAPON_SIZE..WEAPON_OFFSET + 2 * WEAPON_SIZE];
    assert_eq!(&record[..8], b"Cutlass\0");
    assert_eq!(&record[20..22], &[0x00, 0x1E]);
    assert!(dol[WEAPON_OFFSET..WEAPON_OFFSET + WEAPON_SIZE].iter().all(|&b| b == 0));

    fs::remove_file(&csv).unwrap();
    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);
    let cutlass = row(&csv, 1);
    assert_eq!(cutlass[1], "Cutlass");
    assert_eq!(cutlass[4], "30");
}

#[test]
fn test_character_export_names_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());

    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);
    edit_row(&dir.path().join("data/weapon.csv"), 1, &[(1, "Cutlass")]);
    assert_eq!(run(&root, "weapon", Direction::Import), TransformState::Done);

    let csv = dir.path().join("data/character.csv");
    assert_eq!(run(&root, "character", Direction::Export), TransformState::Done);
    let header = &rows(&csv)[0];
    assert_eq!(header[4], "Weapon ID");
    assert_eq!(header[5], "[Weapon Name]");
    assert_eq!(header[7], "[Armor [1] Name]");

    // The name column is ignored on import
    edit_row(&csv, 0, &[(1, "Vyse"), (4, "1"), (5, "Bogus")]);
    assert_eq!(run(&root, "character", Direction::Import), TransformState::Done);

    assert_eq!(run(&root, "character", Direction::Export), TransformState::Done);
    let vyse = row(&csv, 0);
    assert_eq!(vyse[1], "Vyse");
    assert_eq!(vyse[4], "1");
    assert_eq!(vyse[5], "Cutlass");
    assert_eq!(vyse[7], "");
}

#[test]
fn test_compressed_container_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());
    let enemy_csv = dir.path().join("data/enemy.csv");
    let magic_csv = dir.path().join("data/enemymagic.csv");

    assert_eq!(run(&root, "enemy", Direction::Export), TransformState::Done);
    assert_eq!(rows(&enemy_csv).len(), 1 + 0x200);
    edit_row(&enemy_csv, 3, &[(1, "Grouper"), (3, "5000")]);
    assert_eq!(run(&root, "enemy", Direction::Import), TransformState::Done);

    let container = fs::read(dir.path().join("root/battle/enemy.bin")).unwrap();
    assert!(container.starts_with(&AKLZ_MAGIC));
    let records = CompressionMethod::Aklz.codec().decompress(&container).unwrap();
    assert_eq!(records.len(), ENEMY_RECORDS);
    assert_eq!(&records[3 * 68..3 * 68 + 7], b"Grouper");

    assert_eq!(run(&root, "enemy_magic", Direction::Export), TransformState::Done);
    edit_row(&magic_csv, 0, &[(1, "Blast"), (2, "3")]);
    assert_eq!(run(&root, "enemy_magic", Direction::Import), TransformState::Done);
    assert_eq!(run(&root, "enemy_magic", Direction::Export), TransformState::Done);

    let blast = row(&magic_csv, 0);
    assert_eq!(blast[1], "Blast");
    assert_eq!(blast[2], "3");
    assert_eq!(blast[3], "Grouper");
}

#[test]
fn test_empty_range_context() {
    let dir = tempfile::tempdir().unwrap();
    dc_install(dir.path(), "J", "HDR-0119", "20001005");
    let mut root = new_root();
    assert!(root.load(dir.path()));

    let store = EntryStore::new(kinds::find("enemy_magic").unwrap(), &root, true).unwrap();
    assert!(store.id_range().is_empty());
    assert!(store.layout().data_file.is_none());

    assert_eq!(run(&root, "enemy_magic", Direction::Export), TransformState::Done);
    let table = rows(&dir.path().join("data/enemymagic.csv"));
    assert_eq!(table.len(), 1);
    assert_eq!(table[0][3], "[Enemy Name]");

    assert_eq!(run(&root, "enemy_magic", Direction::Import), TransformState::Done);
}

#[test]
fn test_dreamcast_records_are_little_endian() {
    let dir = tempfile::tempdir().unwrap();
    dc_install(dir.path(), "U", "MK-51052", "20010115");
    let mut root = new_root();
    assert!(root.load(dir.path()));

    let csv = dir.path().join("data/weapon.csv");
    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);
    edit_row(&csv, 0, &[(4, "0x1234")]);
    assert_eq!(run(&root, "weapon", Direction::Import), TransformState::Done);

    let exe = fs::read(dir.path().join("root/1ST_READ.BIN")).unwrap();
    assert_eq!(&exe[0x2A8E04 + 20..0x2A8E04 + 22], &[0x34, 0x12]);
}

#[test]
fn test_import_requires_csv() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());

    let kind = kinds::find("armor").unwrap();
    let mut transform = StdEntryTransform::new(kind, Direction::Import, &root).unwrap();
    assert!(!transform.valid());
    assert_eq!(transform.exec(&Worker::new(WorkerMode::Thread)), TransformState::Failed);
    assert!(!dir.path().join("data/armor.csv").exists());
}

#[test]
fn test_malformed_row_fails_import() {
    let dir = tempfile::tempdir().unwrap();
    let root = gc_root(dir.path());
    let csv = dir.path().join("data/shipcannon.csv");

    assert_eq!(run(&root, "ship-cannon", Direction::Export), TransformState::Done);
    let before = fs::read(dir.path().join("root/&&systemdata/Start.dol")).unwrap();

    edit_row(&csv, 2, &[(2, "-500")]);
    assert_eq!(run(&root, "ship_cannon", Direction::Import), TransformState::Failed);

    let after = fs::read(dir.path().join("root/&&systemdata/Start.dol")).unwrap();
    assert!(before == after);
}

#[test]
fn test_transform_requires_valid_root() {
    let root = new_root();
    let kind = kinds::find("weapon").unwrap();
    assert!(matches!(
        StdEntryTransform::new(kind, Direction::Export, &root),
        Err(AlxError::InstallationInvalid(_))
    ));
}

#[test]
fn test_shift_jis_names_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    dc_install(dir.path(), "J", "HDR-0119", "20001005");
    let exe_path = dir.path().join("root/1ST_READ.BIN");

    // "ヴァイス" and a byte Shift_JIS has no character for
    let mut exe = fs::read(&exe_path).unwrap();
    exe[0x2A8E04..0x2A8E0D].copy_from_slice(&[0x83, 0x94, 0x83, 0x40, 0x83, 0x43, 0x83, 0x58, 0xFF]);
    fs::write(&exe_path, &exe).unwrap();

    let mut root = new_root();
    assert!(root.load(dir.path()));
    assert_eq!(root.text_encoding().unwrap().name(), "Shift_JIS");

    let csv = dir.path().join("data/weapon.csv");
    assert_eq!(run(&root, "weapon", Direction::Export), TransformState::Done);
    assert_eq!(row(&csv, 0)[1], r"ヴァイス\xFF");

    assert_eq!(run(&root, "weapon", Direction::Import), TransformState::Done);
    assert!(fs::read(&exe_path).unwrap() == exe);

    edit_row(&csv, 1, &[(1, "アイカ")]);
    assert_eq!(run(&root, "weapon", Direction::Import), TransformState::Done);
    let exe = fs::read(&exe_path).unwrap();
    let at = 0x2A8E04 + WEAPON_SIZE;
    assert_eq!(&exe[at..at + 7], &[0x83, 0x41, 0x83, 0x43, 0x83, 0x4A, 0]);
}

const MESSAGE_CONFIG: &str = r#"
[dscrptr.accessory_name_files]
GC = { file = "root/msg/accessory_name.bin", offset = 4 }

[dscrptr.accessory_dscr_files]
GC = { file = "root/msg/accessory_dscr.bin", compressed = true }
"#;

#[test]
fn test_accessory_messages() {
    let dir = tempfile::tempdir().unwrap();
    gc_install(dir.path(), "GEAE", "8P");

    let mut names = b"MSG\0".to_vec();
    let mut descriptions = Vec::new();
    for id in 0xa0..=0xef {
        names.extend_from_slice(format!("Item {:x}\0", id).as_bytes());
        descriptions.extend_from_slice(format!("About item {:x}\0", id).as_bytes());
    }
    let codec = CompressionMethod::Aklz.codec();
    fs::create_dir_all(dir.path().join("root/msg")).unwrap();
    fs::write(dir.path().join("root/msg/accessory_name.bin"), &names).unwrap();
    fs::write(
        dir.path().join("root/msg/accessory_dscr.bin"),
        codec.compress(&descriptions).unwrap(),
    )
    .unwrap();

    let config = Config::parse(&format!("{}\n{}", DEFAULT_CONFIG, MESSAGE_CONFIG)).unwrap();
    let mut root = Root::new(Arc::new(config));
    assert!(root.load(dir.path()));

    let store = EntryStore::new(kinds::find("accessory").unwrap(), &root, false).unwrap();
    let files: Vec<MessageKind> = store.layout().message_files.keys().copied().collect();
    assert_eq!(files, [MessageKind::Name, MessageKind::Description]);

    let csv = dir.path().join("data/accessory.csv");
    assert_eq!(run(&root, "accessory", Direction::Export), TransformState::Done);
    let table = rows(&csv);
    let width = table[0].len();
    assert_eq!(table[0][width - 2..], ["Message Name", "Message Description"]);
    assert_eq!(row(&csv, 0xa3)[width - 2..], ["Item a3", "About item a3"]);

    edit_row(&csv, 0xa0, &[(width - 2, "Ring"), (width - 1, "Shiny")]);
    assert_eq!(run(&root, "accessory", Direction::Import), TransformState::Done);

    let patched = fs::read(dir.path().join("root/msg/accessory_name.bin")).unwrap();
    assert_eq!(patched.len(), names.len());
    assert!(patched.starts_with(b"MSG\0Ring\0Item a1\0"));
    assert!(patched.ends_with(b"Item ef\0\0\0\0"));

    let raw = fs::read(dir.path().join("root/msg/accessory_dscr.bin")).unwrap();
    let described = codec.decompress(&raw).unwrap();
    assert!(described.starts_with(b"Shiny\0About item a1\0"));

    assert_eq!(run(&root, "accessory", Direction::Export), TransformState::Done);
    assert_eq!(row(&csv, 0xa0)[width - 2..], ["Ring", "Shiny"]);
}
