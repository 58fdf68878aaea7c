//! Synthetic installations for integration tests

#![allow(dead_code)]

use alx::compression::CompressionMethod;
use alx::metadata::bnr::{BNR1_SIZE, INFO_OFFSET};
use alx::metadata::hdr::HDR_SIZE;
use alx::metadata::ip::IP_META_SIZE;
use alx::{Config, Root};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Size of the synthetic executables, large enough for every record table
pub const EXECUTABLE_SIZE: usize = 0x2C6000;

pub const ENEMY_RECORDS: usize = 0x200 * 68;
pub const ENEMY_MAGIC_RECORDS: usize = 0x40 * 24;

fn put(bytes: &mut [u8], offset: usize, text: &str) {
    bytes[offset..offset + text.len()].copy_from_slice(text.as_bytes());
}

fn write(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Compressed battle containers shared by both platforms
fn battle_files(dir: &Path) {
    let codec = CompressionMethod::Aklz.codec();
    write(
        &dir.join("root/battle/enemy.bin"),
        &codec.compress(&vec![0; ENEMY_RECORDS]).unwrap(),
    );
    write(
        &dir.join("root/battle/enemymagic.bin"),
        &codec.compress(&vec![0; ENEMY_MAGIC_RECORDS]).unwrap(),
    );
}

/// GameCube installation for `product_id` (e.g. `GEAE`) and maker `maker_id`
pub fn gc_install(dir: &Path, product_id: &str, maker_id: &str) {
    let mut hdr = vec![0u8; HDR_SIZE];
    put(&mut hdr, 0x00, product_id);
    put(&mut hdr, 0x04, maker_id);
    put(&mut hdr, 0x20, "Skies of Arcadia Legends");
    write(&dir.join("root/&&systemdata/ISO.hdr"), &hdr);

    let mut bnr = vec![0u8; BNR1_SIZE];
    put(&mut bnr, 0x00, "BNR1");
    put(&mut bnr, INFO_OFFSET, "Skies of Arcadia");
    put(&mut bnr, INFO_OFFSET + 0x20, "SEGA");
    put(&mut bnr, INFO_OFFSET + 0x40, "Skies of Arcadia Legends");
    put(&mut bnr, INFO_OFFSET + 0x80, "SEGA");
    put(&mut bnr, INFO_OFFSET + 0xC0, "Sail the skies of Arcadia");
    write(&dir.join("root/opening.bnr"), &bnr);

    write(&dir.join("root/&&systemdata/Start.dol"), &vec![0; EXECUTABLE_SIZE]);
    battle_files(dir);
}

/// Dreamcast installation with region `region_id` (e.g. `J`) and product
/// date `date`
pub fn dc_install(dir: &Path, region_id: &str, product_id: &str, date: &str) {
    let mut ip = vec![b' '; IP_META_SIZE];
    put(&mut ip, 0x00, "SEGA SEGAKATANA ");
    put(&mut ip, 0x10, "SEGA ENTERPRISES");
    put(&mut ip, 0x30, region_id);
    put(&mut ip, 0x40, product_id);
    put(&mut ip, 0x4A, "V1.001");
    put(&mut ip, 0x50, date);
    put(&mut ip, 0x70, "OVERWORKS");
    put(&mut ip, 0x80, "ETERNAL ARCADIA");
    write(&dir.join("root/IP.BIN"), &ip);

    write(&dir.join("root/1ST_READ.BIN"), &vec![0; EXECUTABLE_SIZE]);
    battle_files(dir);
}

pub fn new_root() -> Root {
    Root::new(Arc::new(Config::embedded().unwrap()))
}

/// Validated root over a US GameCube installation in `dir`
pub fn gc_root(dir: &Path) -> Root {
    gc_install(dir, "GEAE", "8P");
    let mut root = new_root();
    assert!(root.load(dir));
    root
}
