//! Entries and their stores
//!
//! An [`Entry`] is one record of an entity kind. Its cells follow the kind's
//! schema, and its dependency slots hold live handles to the collections of
//! other stores, so a character can name the weapon it carries without
//! copying the weapon table. Texts kept in message files ride along as
//! [`Message`]s.

pub mod kinds;
pub mod message;
pub mod schema;
pub mod store;

pub use kinds::{EntityKind, KINDS};
pub use message::{Message, MessageKind, MessageTable};
pub use schema::{Field, FieldType, FieldValue};
pub use store::{DataFile, EntryStore, StoreLayout};

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared, ordered entry collection of one store
pub type Collection = Arc<RwLock<Vec<Entry>>>;

/// One record
#[derive(Debug, Clone)]
pub struct Entry {
    id: i64,
    cells: Vec<FieldValue>,
    messages: BTreeMap<MessageKind, Message>,
    slots: BTreeMap<&'static str, Collection>,
}

impl Entry {
    /// Entry with every cell set to the zero value of its type
    pub fn new(id: i64, fields: &[Field]) -> Self {
        Entry {
            id,
            cells: schema::cells(fields)
                .into_iter()
                .map(FieldType::default_value)
                .collect(),
            messages: BTreeMap::new(),
            slots: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn cells(&self) -> &[FieldValue] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&FieldValue> {
        self.cells.get(index)
    }

    pub fn set_cell(&mut self, index: usize, value: FieldValue) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = value;
        }
    }

    /// First text cell, which every schema uses for the entry name
    pub fn name(&self) -> Option<&str> {
        self.cells.iter().find_map(FieldValue::as_str)
    }

    pub fn message(&self, kind: MessageKind) -> Option<&Message> {
        self.messages.get(&kind)
    }

    pub fn set_message(&mut self, kind: MessageKind, message: Message) {
        self.messages.insert(kind, message);
    }

    pub fn attach(&mut self, kind: &'static str, collection: Collection) {
        self.slots.insert(kind, collection);
    }

    pub fn slot(&self, kind: &str) -> Option<&Collection> {
        self.slots.get(kind)
    }

    /// Name of entry `id` in the `kind` slot, if both exist
    pub fn referenced_name(&self, kind: &str, id: i64) -> Option<String> {
        let entries = self.slot(kind)?.read();
        entries
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.name().map(str::to_string))
    }
}

/// Equal IDs, cells and message texts; file positions and slots are ignored
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.cells == other.cells
            && self.messages.len() == other.messages.len()
            && self
                .messages
                .iter()
                .zip(&other.messages)
                .all(|((a, x), (b, y))| a == b && x.value == y.value)
    }
}

impl Eq for Entry {}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[Field] = &[
        Field::new("Attack", FieldType::I16),
        Field::new("Name", FieldType::Str(8)),
    ];

    #[test]
    fn test_new_entry_defaults() {
        let entry = Entry::new(3, FIELDS);
        assert_eq!(entry.id(), 3);
        assert_eq!(entry.cells(), [FieldValue::Int(0), FieldValue::Str(String::new())]);
        assert_eq!(entry.name(), Some(""));
    }

    #[test]
    fn test_slots_are_live() {
        let weapons: Collection = Arc::new(RwLock::new(Vec::new()));
        let mut entry = Entry::new(0, FIELDS);
        entry.attach("weapon", Arc::clone(&weapons));
        assert_eq!(entry.referenced_name("weapon", 1), None);

        let mut cutlass = Entry::new(1, FIELDS);
        cutlass.set_cell(1, FieldValue::Str("Cutlass".into()));
        weapons.write().push(cutlass);

        assert_eq!(entry.referenced_name("weapon", 1).as_deref(), Some("Cutlass"));
        assert_eq!(entry.referenced_name("armor", 1), None);
    }

    #[test]
    fn test_equality_ignores_slots() {
        let mut a = Entry::new(1, FIELDS);
        let b = Entry::new(1, FIELDS);
        a.attach("weapon", Arc::new(RwLock::new(Vec::new())));
        assert_eq!(a, b);

        a.set_cell(0, FieldValue::Int(5));
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_compares_message_texts() {
        let mut a = Entry::new(1, FIELDS);
        let mut b = Entry::new(1, FIELDS);
        a.set_message(
            MessageKind::Name,
            Message {
                pos: 0x40,
                size: 8,
                value: "Cutlass".into(),
            },
        );
        assert_ne!(a, b);

        b.set_message(MessageKind::Name, Message::text("Cutlass"));
        assert_eq!(a, b);
        assert_eq!(a.message(MessageKind::Name).unwrap().pos, 0x40);
        assert!(a.message(MessageKind::Description).is_none());
    }
}
