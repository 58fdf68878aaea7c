//! Record schemas
//!
//! A schema is an ordered list of fields. Each field occupies `count`
//! consecutive cells of one type, both in the binary record and in the CSV
//! row. Array fields get one CSV column per cell, named by substituting the
//! 1-based cell index into the field's header template.

use super::message::MessageKind;
use crate::error::{AlxError, Result};
use crate::header::{DynamicHeader, HeaderArg, HeaderKey};
use crate::io::{RecordReader, RecordWriter};
use std::fmt;
use std::sync::Arc;

/// Binary representation of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    /// NUL-padded text of a fixed byte length
    Str(usize),
}

impl FieldType {
    pub const fn width(self) -> usize {
        match self {
            FieldType::U8 | FieldType::I8 => 1,
            FieldType::U16 | FieldType::I16 => 2,
            FieldType::U32 | FieldType::I32 => 4,
            FieldType::Str(len) => len,
        }
    }

    fn bounds(self) -> Option<(i64, i64)> {
        match self {
            FieldType::U8 => Some((0, u8::MAX as i64)),
            FieldType::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldType::U16 => Some((0, u16::MAX as i64)),
            FieldType::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldType::U32 => Some((0, u32::MAX as i64)),
            FieldType::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldType::Str(_) => None,
        }
    }

    /// Zero value of the type
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldType::Str(_) => FieldValue::Str(String::new()),
            _ => FieldValue::Int(0),
        }
    }

    pub fn read(self, reader: &mut RecordReader<'_>) -> Result<FieldValue> {
        let value = match self {
            FieldType::U8 | FieldType::U16 | FieldType::U32 => {
                FieldValue::Int(reader.uint(self.width())? as i64)
            }
            FieldType::I8 | FieldType::I16 | FieldType::I32 => {
                FieldValue::Int(reader.int(self.width())? as i64)
            }
            FieldType::Str(len) => FieldValue::Str(reader.text(len)?),
        };
        Ok(value)
    }

    pub fn write(self, writer: &mut RecordWriter, value: &FieldValue) -> Result<()> {
        match (self, value) {
            (FieldType::Str(len), FieldValue::Str(s)) => writer.text(s, len),
            (FieldType::Str(_), FieldValue::Int(n)) => Err(AlxError::TypeMismatch(format!(
                "{} is not text",
                n
            ))),
            (ty, FieldValue::Int(n)) => {
                ty.check(*n)?;
                writer.uint(ty.width(), *n as u32)
            }
            (ty, FieldValue::Str(s)) => Err(AlxError::TypeMismatch(format!(
                "{:?} is not a {:?} value",
                s, ty
            ))),
        }
    }

    /// Parse a CSV cell. Integers may be written in decimal or `0x` hex.
    pub fn parse(self, text: &str) -> Result<FieldValue> {
        if let FieldType::Str(_) = self {
            return Ok(FieldValue::Str(text.to_string()));
        }

        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => digits.parse::<i64>(),
        };
        let n = parsed
            .map(|n| if negative { -n } else { n })
            .map_err(|_| AlxError::TypeMismatch(format!("{:?} is not an integer", text)))?;

        self.check(n)?;
        Ok(FieldValue::Int(n))
    }

    fn check(self, n: i64) -> Result<()> {
        match self.bounds() {
            Some((min, max)) if n < min || n > max => Err(AlxError::TypeMismatch(format!(
                "{} does not fit {:?} ({}..={})",
                n, self, min, max
            ))),
            _ => Ok(()),
        }
    }
}

/// Cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::Int(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Str(s) => f.write_str(s),
        }
    }
}

/// Link from a field to the entries of another kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Name of the referenced kind
    pub kind: &'static str,
    /// Header template of the derived name column
    pub header: &'static str,
}

/// One schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub header: &'static str,
    pub ty: FieldType,
    pub count: usize,
    pub reference: Option<Reference>,
}

impl Field {
    pub const fn new(header: &'static str, ty: FieldType) -> Self {
        Field {
            header,
            ty,
            count: 1,
            reference: None,
        }
    }

    /// Repeat the field `count` times
    pub const fn array(self, count: usize) -> Self {
        Field { count, ..self }
    }

    /// Export the name of the referenced entry next to each cell
    pub const fn refers(self, kind: &'static str, header: &'static str) -> Self {
        Field {
            reference: Some(Reference { kind, header }),
            ..self
        }
    }
}

/// What a CSV column carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// A record cell
    Value { cell: usize, ty: FieldType },
    /// Name of the entry referenced by a cell, export only
    Name { cell: usize, kind: &'static str },
    /// Text from a message file
    Message(MessageKind),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub header: Arc<str>,
    pub kind: ColumnKind,
}

/// Cell types of a schema in record order
pub fn cells(fields: &[Field]) -> Vec<FieldType> {
    fields
        .iter()
        .flat_map(|field| std::iter::repeat(field.ty).take(field.count))
        .collect()
}

/// Byte size of one record
pub fn record_size(fields: &[Field]) -> usize {
    fields.iter().map(|field| field.ty.width() * field.count).sum()
}

/// CSV columns of a schema, without the leading ID column
pub fn columns(fields: &[Field]) -> Vec<Column> {
    let mut columns = Vec::new();
    let mut cell = 0;

    for field in fields {
        let header = DynamicHeader::shared(field.header);
        let name_header = field.reference.map(|r| DynamicHeader::shared(r.header));

        for index in 0..field.count {
            let key = if field.count > 1 {
                HeaderKey(vec![HeaderArg::Int(index as i64 + 1)])
            } else {
                HeaderKey(Vec::new())
            };

            columns.push(Column {
                header: header.get(key.clone()),
                kind: ColumnKind::Value { cell, ty: field.ty },
            });

            if let (Some(reference), Some(name_header)) = (field.reference, &name_header) {
                columns.push(Column {
                    header: name_header.get(key),
                    kind: ColumnKind::Name {
                        cell,
                        kind: reference.kind,
                    },
                });
            }

            cell += 1;
        }
    }

    columns
}

/// Columns of the message files, after the schema columns
pub fn message_columns(kinds: impl IntoIterator<Item = MessageKind>) -> Vec<Column> {
    kinds
        .into_iter()
        .map(|kind| Column {
            header: DynamicHeader::shared(kind.header()).get(HeaderKey::default()),
            kind: ColumnKind::Message(kind),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Endianness;

    const FIELDS: &[Field] = &[
        Field::new("Name", FieldType::Str(8)),
        Field::new("Weapon ID", FieldType::U16).refers("weapon", "[Weapon Name]"),
        Field::new("Element [%d]", FieldType::I16).array(3),
        Field::new("Hit %%", FieldType::I8),
    ];

    #[test]
    fn test_layout() {
        assert_eq!(record_size(FIELDS), 8 + 2 + 6 + 1);
        assert_eq!(cells(FIELDS).len(), 6);
    }

    #[test]
    fn test_columns_expand_arrays_and_references() {
        let headers: Vec<String> = columns(FIELDS).iter().map(|c| c.header.to_string()).collect();
        assert_eq!(
            headers,
            [
                "Name",
                "Weapon ID",
                "[Weapon Name]",
                "Element [1]",
                "Element [2]",
                "Element [3]",
                "Hit %",
            ]
        );

        let columns = columns(FIELDS);
        assert_eq!(columns[2].kind, ColumnKind::Name { cell: 1, kind: "weapon" });
        assert_eq!(
            columns[5].kind,
            ColumnKind::Value {
                cell: 4,
                ty: FieldType::I16
            }
        );
    }

    #[test]
    fn test_message_columns() {
        let columns = message_columns([MessageKind::Name, MessageKind::Description]);
        assert_eq!(&*columns[0].header, "Message Name");
        assert_eq!(columns[1].kind, ColumnKind::Message(MessageKind::Description));
        assert!(message_columns([]).is_empty());
    }

    #[test]
    fn test_headers_render_once() {
        const MEMO: &[Field] = &[Field::new("Memo Slot [%d]", FieldType::U8).array(2)];
        columns(MEMO);
        let renders = DynamicHeader::shared("Memo Slot [%d]").renders();
        assert_eq!(renders, 2);

        let again = columns(MEMO);
        assert_eq!(DynamicHeader::shared("Memo Slot [%d]").renders(), renders);
        assert_eq!(&*again[1].header, "Memo Slot [2]");
    }

    #[test]
    fn test_shift_jis_cells() {
        let sjis = crate::text::TextEncoding::from_label("shift_jis").unwrap();
        // "ヴァイス" followed by a byte outside of Shift_JIS
        let raw = [0x83, 0x94, 0x83, 0x40, 0x83, 0x43, 0x83, 0x58, 0xFF, 0, 0, 0];

        let mut reader = RecordReader::new(&raw, Endianness::Big).with_text(sjis);
        let value = FieldType::Str(12).read(&mut reader).unwrap();
        assert_eq!(value, FieldValue::Str(r"ヴァイス\xFF".to_string()));

        let mut writer = RecordWriter::new(Endianness::Big).with_text(sjis);
        FieldType::Str(12).write(&mut writer, &value).unwrap();
        assert_eq!(writer.into_inner(), raw);
    }

    #[test]
    fn test_cell_io() {
        let mut writer = RecordWriter::new(Endianness::Big);
        FieldType::Str(4).write(&mut writer, &FieldValue::Str("Ax".into())).unwrap();
        FieldType::I16.write(&mut writer, &FieldValue::Int(-3)).unwrap();
        FieldType::U8.write(&mut writer, &FieldValue::Int(200)).unwrap();
        let data = writer.into_inner();
        assert_eq!(data, vec![b'A', b'x', 0, 0, 0xFF, 0xFD, 200]);

        let mut reader = RecordReader::new(&data, Endianness::Big);
        assert_eq!(FieldType::Str(4).read(&mut reader).unwrap(), FieldValue::Str("Ax".into()));
        assert_eq!(FieldType::I16.read(&mut reader).unwrap(), FieldValue::Int(-3));
        assert_eq!(FieldType::U8.read(&mut reader).unwrap(), FieldValue::Int(200));
    }

    #[test]
    fn test_write_rejects_bad_values() {
        let mut writer = RecordWriter::new(Endianness::Little);
        assert!(FieldType::Str(2).write(&mut writer, &FieldValue::Str("Vyse".into())).is_err());
        assert!(FieldType::U8.write(&mut writer, &FieldValue::Int(256)).is_err());
        assert!(FieldType::I8.write(&mut writer, &FieldValue::Str("x".into())).is_err());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_parse_cells() {
        assert_eq!(FieldType::U16.parse("0x1F").unwrap(), FieldValue::Int(31));
        assert_eq!(FieldType::I8.parse(" -12 ").unwrap(), FieldValue::Int(-12));
        assert_eq!(FieldType::Str(4).parse(" a ").unwrap(), FieldValue::Str(" a ".into()));
        assert!(FieldType::I8.parse("200").is_err());
        assert!(FieldType::U32.parse("many").is_err());
    }
}
