//! Generic entry store
//!
//! An [`EntryStore`] owns the ordered collection of one entity kind and
//! moves it between the binary data file and the CSV file:
//!
//! ```text
//!            load_bin                    save_csv
//! data file ---------> [Entry, Entry, ...] ---------> CSV file
//!           <---------                    <---------
//!            save_bin                    load_csv
//! ```
//!
//! Stores built with dependency resolution own one store per dependency
//! kind. `load_bin` loads those first, depth-first, and every entry created
//! afterwards gets a live handle to each successfully loaded dependency.
//!
//! Kinds with message files carry one extra CSV column per file. The binary
//! side reads and patches those files next to the records.

use super::kinds::EntityKind;
use super::message::{Message, MessageKind, MessageTable};
use super::schema::{self, Column, ColumnKind, FieldType, FieldValue};
use super::{Collection, Entry};
use crate::compression::CompressionMethod;
use crate::config::Value;
use crate::error::{AlxError, Result};
use crate::io::{Endianness, RecordReader, RecordWriter};
use crate::pattern::PatternMatcher;
use crate::range::{self, RangeDescriptor};
use crate::root::Root;
use crate::text::TextEncoding;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Header of the leading CSV column
pub const ID_HEADER: &str = "Entry ID";

/// Location of the records inside a binary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    /// Offset of the first record, inside the decompressed data
    pub offset: usize,
    pub compressed: bool,
}

#[derive(Deserialize)]
struct DataFileSpec {
    file: String,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    compressed: bool,
}

impl DataFile {
    /// Build from a resolved descriptor, either a path or a table with
    /// `file`, `offset` and `compressed`. Glob patterns pick the first match.
    pub fn resolve(root: &Root, value: &Value) -> Result<Self> {
        let spec = match value {
            Value::String(file) => DataFileSpec {
                file: file.clone(),
                offset: 0,
                compressed: false,
            },
            Value::Table(_) => value.clone().try_into::<DataFileSpec>()?,
            other => {
                return Err(AlxError::TypeMismatch(format!(
                    "data file descriptor is {}, expected a string or a table",
                    other.type_str()
                )))
            }
        };

        let path = if PatternMatcher::is_pattern(&spec.file) {
            root.glob(&spec.file)
        } else {
            root.join(&spec.file)
        };

        Ok(DataFile {
            path,
            offset: spec.offset,
            compressed: spec.compressed,
        })
    }
}

/// Everything a store needs to know about its files
#[derive(Debug, Clone)]
pub struct StoreLayout {
    pub id_range: RangeDescriptor,
    /// Absent only when the ID range is empty
    pub data_file: Option<DataFile>,
    pub csv_file: PathBuf,
    pub endianness: Endianness,
    pub compression: CompressionMethod,
    pub text: TextEncoding,
    /// Configured message files, empty when the ID range is
    pub message_files: BTreeMap<MessageKind, DataFile>,
}

impl StoreLayout {
    /// Resolve the layout of `kind` for the installation in `root`
    pub fn resolve(kind: &dyn EntityKind, root: &Root) -> Result<Self> {
        root.ensure_valid()?;
        let dscrptr = &root.config().dscrptr;

        let id_range = range::normalize_value(
            root.require(dscrptr, &kind.id_range_attribute())?,
            kind.id_size(),
        )?;

        let data_file = if id_range.is_empty() {
            None
        } else {
            let value = root.require(dscrptr, &kind.data_file_attribute())?;
            Some(DataFile::resolve(root, value)?)
        };

        let mut message_files = BTreeMap::new();
        if !id_range.is_empty() {
            for message in MessageKind::ALL {
                if let Some(value) = root.dscrptr(&kind.message_file_attribute(message)) {
                    message_files.insert(message, DataFile::resolve(root, value)?);
                }
            }
        }

        let csv_file = root.join(root.require_str(dscrptr, &kind.csv_file_attribute())?);

        Ok(StoreLayout {
            id_range,
            data_file,
            csv_file,
            endianness: root.endianness()?,
            compression: root.compression()?,
            text: root.text_encoding()?,
            message_files,
        })
    }
}

/// Layout source used while building a store tree
pub type LayoutFn<'a> = dyn Fn(&'static dyn EntityKind) -> Result<StoreLayout> + 'a;

#[derive(Debug)]
pub struct EntryStore {
    kind: &'static dyn EntityKind,
    layout: StoreLayout,
    columns: Vec<Column>,
    entries: Collection,
    depend: bool,
    loaded: bool,
    dependencies: Vec<EntryStore>,
}

impl EntryStore {
    /// Store for `kind` laid out for the installation in `root`. With
    /// `depend`, a store for every dependency kind is built as well.
    pub fn new(kind: &'static dyn EntityKind, root: &Root, depend: bool) -> Result<Self> {
        Self::with_layouts(kind, depend, &|kind| StoreLayout::resolve(kind, root))
    }

    /// Store whose layouts come from `layouts`
    pub fn with_layouts(
        kind: &'static dyn EntityKind,
        depend: bool,
        layouts: &LayoutFn<'_>,
    ) -> Result<Self> {
        let layout = layouts(kind)?;

        let dependencies = if depend {
            kind.dependencies()
                .iter()
                .map(|dep| Self::with_layouts(*dep, true, layouts))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        debug!(
            "Store {} - ids {}, {} dependencies",
            kind.name(),
            layout.id_range,
            dependencies.len()
        );

        let mut columns = schema::columns(kind.fields());
        columns.extend(schema::message_columns(layout.message_files.keys().copied()));

        Ok(EntryStore {
            kind,
            layout,
            columns,
            entries: Arc::new(RwLock::new(Vec::new())),
            depend,
            loaded: false,
            dependencies,
        })
    }

    pub fn kind(&self) -> &'static dyn EntityKind {
        self.kind
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn id_range(&self) -> RangeDescriptor {
        self.layout.id_range
    }

    /// CSV columns after the ID column
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Live handle to the entry collection
    pub fn entries(&self) -> Collection {
        Arc::clone(&self.entries)
    }

    pub fn get(&self, id: i64) -> Option<Entry> {
        self.entries.read().iter().find(|e| e.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// True once the last load finished successfully
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dependencies(&self) -> &[EntryStore] {
        &self.dependencies
    }

    pub fn dependency(&self, name: &str) -> Option<&EntryStore> {
        self.dependencies.iter().find(|d| d.kind.name() == name)
    }

    /// New entry for `id` with a slot for every loaded dependency
    pub fn create_entry(&self, id: i64) -> Result<Entry> {
        self.layout.id_range.check(id)?;

        let mut entry = Entry::new(id, self.kind.fields());
        for dep in self.dependencies.iter().filter(|d| d.loaded) {
            entry.attach(dep.kind.name(), dep.entries());
        }
        Ok(entry)
    }

    /// Replace the whole collection, keeping the handle alive
    pub fn replace(&self, mut entries: Vec<Entry>) -> Result<()> {
        for entry in &entries {
            self.layout.id_range.check(entry.id())?;
        }
        entries.sort_by_key(Entry::id);
        *self.entries.write() = entries;
        Ok(())
    }

    /// Read every entry of the ID range from the data file
    pub fn load_bin(&mut self) -> Result<()> {
        if self.depend {
            for dep in &mut self.dependencies {
                if let Err(e) = dep.load_bin() {
                    let failure = AlxError::DependencyLoadFailure {
                        kind: dep.kind.name().to_string(),
                    };
                    warn!("{} ({})", failure, e);
                }
            }
        }

        self.loaded = false;
        let range = self.layout.id_range;
        if range.is_empty() {
            self.replace(Vec::new())?;
            self.loaded = true;
            info!("Load {} - no entries for ids {}", self.kind.name(), range);
            return Ok(());
        }

        let file = self.data_file()?;
        let data = self.read_data(file)?;
        let region = self.records(file, data.len())?;

        let cells = schema::cells(self.kind.fields());
        let mut reader =
            RecordReader::new(&data[region], self.layout.endianness).with_text(self.layout.text);
        let mut entries = Vec::with_capacity(range.len());
        for id in range.ids() {
            let mut entry = self.create_entry(id)?;
            for (index, ty) in cells.iter().enumerate() {
                entry.set_cell(index, ty.read(&mut reader)?);
            }
            entries.push(entry);
        }

        for (kind, message_file) in &self.layout.message_files {
            let data = self.read_data(message_file)?;
            let table = MessageTable::read(&data, message_file.offset, range.len(), self.layout.text)?;
            for (entry, message) in entries.iter_mut().zip(table.messages()) {
                entry.set_message(*kind, message.clone());
            }
            debug!(
                "Load {} - {} {} messages ({})",
                self.kind.name(),
                table.len(),
                kind,
                message_file.path.display()
            );
        }

        info!(
            "Load {} - {} entries ({})",
            self.kind.name(),
            entries.len(),
            file.path.display()
        );
        self.replace(entries)?;
        self.loaded = true;
        Ok(())
    }

    /// Patch the records and messages of every entry into the existing
    /// files. Nothing is written unless every patch succeeds.
    pub fn save_bin(&self) -> Result<()> {
        let range = self.layout.id_range;
        if range.is_empty() {
            info!("Save {} - no entries for ids {}", self.kind.name(), range);
            return Ok(());
        }

        let file = self.data_file()?;
        let mut data = self.read_data(file)?;
        self.records(file, data.len())?;

        let size = schema::record_size(self.kind.fields());
        let cells = schema::cells(self.kind.fields());
        let entries = self.entries.read();
        for entry in entries.iter() {
            range.check(entry.id())?;

            let mut writer = RecordWriter::new(self.layout.endianness).with_text(self.layout.text);
            for (ty, value) in cells.iter().zip(entry.cells()) {
                ty.write(&mut writer, value)?;
            }

            let at = file.offset + (entry.id() - range.min) as usize * size;
            data[at..at + size].copy_from_slice(&writer.into_inner());
        }

        // files by path, so records and messages may share one
        let mut buffers: BTreeMap<&PathBuf, (Vec<u8>, bool)> = BTreeMap::new();
        buffers.insert(&file.path, (data, file.compressed));

        let by_id: BTreeMap<i64, &Entry> = entries.iter().map(|e| (e.id(), e)).collect();
        for (kind, message_file) in &self.layout.message_files {
            let (data, _) = match buffers.entry(&message_file.path) {
                std::collections::btree_map::Entry::Occupied(slot) => slot.into_mut(),
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert((self.read_data(message_file)?, message_file.compressed))
                }
            };

            let table = MessageTable::read(&data[..], message_file.offset, range.len(), self.layout.text)?;
            let values: Vec<Option<&str>> = range
                .ids()
                .map(|id| {
                    by_id
                        .get(&id)
                        .and_then(|entry| entry.message(*kind))
                        .map(|message| message.value.as_str())
                })
                .collect();
            table.patch(&mut data[..], &values, self.layout.text)?;
        }

        for (path, (data, compressed)) in buffers {
            let out = if compressed {
                self.layout.compression.codec().compress(&data)?
            } else {
                data
            };
            fs::write(path, out)?;
        }

        info!(
            "Save {} - {} entries ({})",
            self.kind.name(),
            entries.len(),
            file.path.display()
        );
        Ok(())
    }

    /// Read entries from the CSV file. Name columns are ignored and rows
    /// outside the ID range are skipped.
    pub fn load_csv(&mut self) -> Result<()> {
        self.loaded = false;
        let path = &self.layout.csv_file;
        if !path.is_file() {
            return Err(AlxError::FileMissing(path.clone()));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let width = reader.headers()?.len();
        if width != self.columns.len() + 1 {
            return Err(AlxError::InputIntegrity(format!(
                "{} has {} columns, expected {}",
                path.display(),
                width,
                self.columns.len() + 1
            )));
        }

        let mut entries = BTreeMap::new();
        for record in reader.records() {
            let record = record?;
            let id = parse_id(record.get(0).unwrap_or_default())?;
            if !self.layout.id_range.contains(id) {
                warn!(
                    "Load {} - entry {} outside of ids {} skipped",
                    self.kind.name(),
                    id,
                    self.layout.id_range
                );
                continue;
            }

            let mut entry = self.create_entry(id)?;
            for (column, text) in self.columns.iter().zip(record.iter().skip(1)) {
                match column.kind {
                    ColumnKind::Value { cell, ty } => entry.set_cell(cell, ty.parse(text)?),
                    ColumnKind::Message(kind) => entry.set_message(kind, Message::text(text)),
                    ColumnKind::Name { .. } => {}
                }
            }

            if entries.insert(id, entry).is_some() {
                warn!("Load {} - entry {} repeated, last row wins", self.kind.name(), id);
            }
        }

        info!(
            "Load {} - {} entries ({})",
            self.kind.name(),
            entries.len(),
            path.display()
        );
        self.replace(entries.into_values().collect())?;
        self.loaded = true;
        Ok(())
    }

    /// Write every entry to the CSV file in ascending ID order
    pub fn save_csv(&self) -> Result<()> {
        let path = &self.layout.csv_file;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(ID_HEADER.to_string());
        header.extend(self.columns.iter().map(|c| c.header.to_string()));
        writer.write_record(&header)?;

        let entries = self.entries.read();
        for entry in entries.iter() {
            let mut row = Vec::with_capacity(header.len());
            row.push(entry.id().to_string());
            for column in &self.columns {
                row.push(render_column(entry, column.kind));
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;

        info!(
            "Save {} - {} entries ({})",
            self.kind.name(),
            entries.len(),
            path.display()
        );
        Ok(())
    }

    fn data_file(&self) -> Result<&DataFile> {
        self.layout
            .data_file
            .as_ref()
            .ok_or_else(|| AlxError::ConfigurationMissing {
                symbol: "DSCRPTR".to_string(),
                attribute: self.kind.data_file_attribute(),
                context: String::new(),
            })
    }

    fn read_data(&self, file: &DataFile) -> Result<Vec<u8>> {
        if !file.path.is_file() {
            return Err(AlxError::FileMissing(file.path.clone()));
        }

        let raw = fs::read(&file.path)?;
        if file.compressed {
            self.layout.compression.codec().decompress(&raw)
        } else {
            Ok(raw)
        }
    }

    /// Byte region of the records, checked against the data length
    fn records(&self, file: &DataFile, len: usize) -> Result<std::ops::Range<usize>> {
        let size = schema::record_size(self.kind.fields());
        let end = self
            .layout
            .id_range
            .len()
            .checked_mul(size)
            .and_then(|n| n.checked_add(file.offset))
            .filter(|&end| end <= len)
            .ok_or_else(|| {
                AlxError::InputIntegrity(format!(
                    "{} holds {:#x} bytes, too short for {} records of {:#x} bytes at {:#x}",
                    file.path.display(),
                    len,
                    self.layout.id_range.len(),
                    size,
                    file.offset
                ))
            })?;
        Ok(file.offset..end)
    }
}

fn parse_id(text: &str) -> Result<i64> {
    FieldType::U32
        .parse(text)?
        .as_int()
        .ok_or_else(|| AlxError::TypeMismatch(format!("{:?} is not an entry ID", text)))
}

fn render_column(entry: &Entry, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::Value { cell, .. } => entry.cell(cell).map(ToString::to_string).unwrap_or_default(),
        ColumnKind::Name { cell, kind } => entry
            .cell(cell)
            .and_then(FieldValue::as_int)
            .and_then(|id| entry.referenced_name(kind, id))
            .unwrap_or_default(),
        ColumnKind::Message(kind) => entry
            .message(kind)
            .map(|message| message.value.clone())
            .unwrap_or_default(),
    }
}

/// Zero-filled data file sized for `layout`, for fixtures
pub fn blank_data(kind: &dyn EntityKind, layout: &StoreLayout) -> Vec<u8> {
    let offset = layout.data_file.as_ref().map_or(0, |f| f.offset);
    vec![0; offset + layout.id_range.len() * schema::record_size(kind.fields())]
}
