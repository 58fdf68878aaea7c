//! Entity kinds
//!
//! Every kind is a thin configuration of the generic [`EntryStore`]: a
//! record schema, the kinds it depends on, and the descriptor attributes
//! (`<name>_id_range`, `<name>_data_files`, `<name>_csv_file` and the
//! optional `<name>_name_files` and `<name>_dscr_files`) its layout is
//! resolved from.
//!
//! [`EntryStore`]: super::EntryStore

use super::message::MessageKind;
use super::schema::{Field, FieldType};

/// Capabilities of one entity kind
pub trait EntityKind: Send + Sync {
    /// Lowercase name, also the prefix of the descriptor attributes
    fn name(&self) -> &'static str;

    fn fields(&self) -> &'static [Field];

    /// Kinds whose collections back the dependency slots, loaded first
    fn dependencies(&self) -> &'static [&'static dyn EntityKind] {
        &[]
    }

    /// Number of IDs a single integer `id_range` stands for
    fn id_size(&self) -> i64 {
        1
    }

    fn id_range_attribute(&self) -> String {
        format!("{}_id_range", self.name())
    }

    fn data_file_attribute(&self) -> String {
        format!("{}_data_files", self.name())
    }

    fn csv_file_attribute(&self) -> String {
        format!("{}_csv_file", self.name())
    }

    /// Descriptor of the message file, only looked up when configured
    fn message_file_attribute(&self, kind: MessageKind) -> String {
        format!("{}_{}_files", self.name(), kind.infix())
    }
}

impl std::fmt::Debug for dyn EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every known kind
pub static KINDS: [&dyn EntityKind; 8] = [
    &Accessory,
    &Armor,
    &Weapon,
    &Character,
    &CharacterMagic,
    &Enemy,
    &EnemyMagic,
    &ShipCannon,
];

/// Look up a kind by name; dashes are accepted for underscores
pub fn find(name: &str) -> Option<&'static dyn EntityKind> {
    let name = name.to_ascii_lowercase().replace('-', "_");
    KINDS.iter().copied().find(|kind| kind.name() == name)
}

const TRAITS: [Field; 2] = [
    Field::new("Trait [%d] ID", FieldType::I8).array(4),
    Field::new("Trait [%d] Value", FieldType::I16).array(4),
];

pub struct Accessory;

static ACCESSORY_FIELDS: [Field; 5] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Character Flags", FieldType::U8),
    Field::new("Buy Price", FieldType::U16),
    TRAITS[0],
    TRAITS[1],
];

impl EntityKind for Accessory {
    fn name(&self) -> &'static str {
        "accessory"
    }

    fn fields(&self) -> &'static [Field] {
        &ACCESSORY_FIELDS
    }
}

pub struct Armor;

static ARMOR_FIELDS: [Field; 7] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Character Flags", FieldType::U8),
    Field::new("Buy Price", FieldType::U16),
    Field::new("Defense", FieldType::I16),
    Field::new("Magic Defense", FieldType::I16),
    TRAITS[0],
    TRAITS[1],
];

impl EntityKind for Armor {
    fn name(&self) -> &'static str {
        "armor"
    }

    fn fields(&self) -> &'static [Field] {
        &ARMOR_FIELDS
    }
}

pub struct Weapon;

static WEAPON_FIELDS: [Field; 7] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Character ID", FieldType::I8),
    Field::new("Buy Price", FieldType::U16),
    Field::new("Attack", FieldType::I16),
    Field::new("Hit %%", FieldType::I16),
    TRAITS[0],
    TRAITS[1],
];

impl EntityKind for Weapon {
    fn name(&self) -> &'static str {
        "weapon"
    }

    fn fields(&self) -> &'static [Field] {
        &WEAPON_FIELDS
    }
}

pub struct Character;

static CHARACTER_FIELDS: [Field; 14] = [
    Field::new("Name", FieldType::Str(11)),
    Field::new("Age", FieldType::I8),
    Field::new("Gender ID", FieldType::I8),
    Field::new("Weapon ID", FieldType::U16).refers("weapon", "[Weapon Name]"),
    Field::new("Armor [%d] ID", FieldType::U16)
        .array(2)
        .refers("armor", "[Armor [%d] Name]"),
    Field::new("Accessory ID", FieldType::U16).refers("accessory", "[Accessory Name]"),
    Field::new("Max HP", FieldType::U16),
    Field::new("Max MP", FieldType::I16),
    Field::new("Power", FieldType::I16),
    Field::new("Will", FieldType::I16),
    Field::new("Vigor", FieldType::I16),
    Field::new("Agile", FieldType::I16),
    Field::new("Quick", FieldType::I16),
    Field::new("Element [%d]", FieldType::I16).array(6),
];

static CHARACTER_DEPENDENCIES: [&dyn EntityKind; 3] = [&Weapon, &Armor, &Accessory];

impl EntityKind for Character {
    fn name(&self) -> &'static str {
        "character"
    }

    fn fields(&self) -> &'static [Field] {
        &CHARACTER_FIELDS
    }

    fn dependencies(&self) -> &'static [&'static dyn EntityKind] {
        &CHARACTER_DEPENDENCIES
    }
}

pub struct CharacterMagic;

static CHARACTER_MAGIC_FIELDS: [Field; 10] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Character ID", FieldType::I8),
    Field::new("Element ID", FieldType::I8),
    Field::new("Order", FieldType::I8),
    Field::new("Occasion Flags", FieldType::U8),
    Field::new("Effect ID", FieldType::I8),
    Field::new("Scope ID", FieldType::I8),
    Field::new("Category ID", FieldType::I8),
    Field::new("Effect Value", FieldType::I16),
    Field::new("SP Cost", FieldType::I8),
];

impl EntityKind for CharacterMagic {
    fn name(&self) -> &'static str {
        "character_magic"
    }

    fn fields(&self) -> &'static [Field] {
        &CHARACTER_MAGIC_FIELDS
    }
}

pub struct Enemy;

static ENEMY_FIELDS: [Field; 13] = [
    Field::new("Name", FieldType::Str(21)),
    Field::new("Element ID", FieldType::I8),
    Field::new("Max HP", FieldType::U32),
    Field::new("Attack", FieldType::I16),
    Field::new("Defense", FieldType::I16),
    Field::new("Magic Defense", FieldType::I16),
    Field::new("Hit %%", FieldType::I16),
    Field::new("Dodge %%", FieldType::I16),
    Field::new("EXP", FieldType::U16),
    Field::new("Gold", FieldType::U16),
    Field::new("Element [%d]", FieldType::I16).array(6),
    Field::new("Item [%d] Probability", FieldType::I16).array(4),
    Field::new("Item [%d] ID", FieldType::I16).array(4),
];

impl EntityKind for Enemy {
    fn name(&self) -> &'static str {
        "enemy"
    }

    fn fields(&self) -> &'static [Field] {
        &ENEMY_FIELDS
    }
}

pub struct EnemyMagic;

static ENEMY_MAGIC_FIELDS: [Field; 6] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Enemy ID", FieldType::U16).refers("enemy", "[Enemy Name]"),
    Field::new("Category ID", FieldType::I8),
    Field::new("Effect ID", FieldType::I8),
    Field::new("Scope ID", FieldType::I8),
    Field::new("Effect Value", FieldType::I16),
];

static ENEMY_MAGIC_DEPENDENCIES: [&dyn EntityKind; 1] = [&Enemy];

impl EntityKind for EnemyMagic {
    fn name(&self) -> &'static str {
        "enemy_magic"
    }

    fn fields(&self) -> &'static [Field] {
        &ENEMY_MAGIC_FIELDS
    }

    fn dependencies(&self) -> &'static [&'static dyn EntityKind] {
        &ENEMY_MAGIC_DEPENDENCIES
    }
}

pub struct ShipCannon;

static SHIP_CANNON_FIELDS: [Field; 8] = [
    Field::new("Name", FieldType::Str(17)),
    Field::new("Ship ID", FieldType::I8),
    Field::new("Type ID", FieldType::I8),
    Field::new("Attack", FieldType::I16),
    Field::new("Hit %%", FieldType::I16),
    Field::new("Limit", FieldType::I8),
    Field::new("SP Cost", FieldType::I8),
    Field::new("Buy Price", FieldType::U16),
];

impl EntityKind for ShipCannon {
    fn name(&self) -> &'static str {
        "ship_cannon"
    }

    fn fields(&self) -> &'static [Field] {
        &SHIP_CANNON_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::schema;
    use std::collections::HashSet;

    #[test]
    fn test_find_kind() {
        assert_eq!(find("weapon").map(|k| k.name()), Some("weapon"));
        assert_eq!(find("Enemy-Magic").map(|k| k.name()), Some("enemy_magic"));
        assert!(find("ship").is_none());
    }

    #[test]
    fn test_kind_names_are_unique() {
        let names: HashSet<&str> = KINDS.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), KINDS.len());
    }

    #[test]
    fn test_every_schema_starts_with_a_name() {
        for kind in KINDS {
            assert_eq!(kind.fields()[0].header, "Name", "{}", kind.name());
            assert!(matches!(kind.fields()[0].ty, FieldType::Str(_)));
            assert!(schema::record_size(kind.fields()) > 0);
        }
    }

    #[test]
    fn test_references_point_at_dependencies() {
        for kind in KINDS {
            let deps: Vec<&str> = kind.dependencies().iter().map(|d| d.name()).collect();
            for field in kind.fields() {
                if let Some(reference) = field.reference {
                    assert!(deps.contains(&reference.kind), "{} -> {}", kind.name(), reference.kind);
                }
            }
        }
    }

    #[test]
    fn test_descriptor_attributes() {
        assert_eq!(Character.id_range_attribute(), "character_id_range");
        assert_eq!(ShipCannon.data_file_attribute(), "ship_cannon_data_files");
        assert_eq!(EnemyMagic.csv_file_attribute(), "enemy_magic_csv_file");
        assert_eq!(
            EnemyMagic.message_file_attribute(MessageKind::Name),
            "enemy_magic_name_files"
        );
        assert_eq!(
            Accessory.message_file_attribute(MessageKind::Description),
            "accessory_dscr_files"
        );
    }

    #[test]
    fn test_character_columns() {
        let headers: Vec<String> = schema::columns(Character.fields())
            .iter()
            .map(|c| c.header.to_string())
            .collect();
        assert_eq!(
            &headers[..8],
            [
                "Name",
                "Age",
                "Gender ID",
                "Weapon ID",
                "[Weapon Name]",
                "Armor [1] ID",
                "[Armor [1] Name]",
                "Armor [2] ID",
            ]
        );
    }
}
