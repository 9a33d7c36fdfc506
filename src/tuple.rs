use std::fmt;

use anyhow::{bail, Result};

use crate::error::EngineError;

/// Fixed width of a CHAR field on disk. Payload is NUL-padded and capped
/// at `MAX_CHAR_LENGTH - 1` bytes; decoding stops at the first NUL.
pub const MAX_CHAR_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Char,
}

impl DataType {
    pub fn byte_width(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Char => MAX_CHAR_LENGTH,
        }
    }

    /// On-disk encoding used in the `column_type` catalog column.
    pub fn to_code(self) -> i32 {
        match self {
            DataType::Int => 1,
            DataType::Float => 2,
            DataType::Char => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<DataType> {
        match code {
            1 => Ok(DataType::Int),
            2 => Ok(DataType::Float),
            3 => Ok(DataType::Char),
            _ => bail!(EngineError::Type(format!("unknown column type code {code}"))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Char => write!(f, "CHAR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub is_primary: bool,
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            columns: Vec::new(),
        }
    }

    pub fn add_column(&mut self, name: &str, data_type: DataType, is_primary: bool) -> Result<()> {
        if self.columns.iter().any(|c| c.name == name) {
            bail!(EngineError::Schema(format!(
                "duplicate column name '{name}'"
            )));
        }
        let ordinal = self.columns.len() as u32;
        self.columns.push(Column {
            name: name.to_string(),
            data_type,
            is_primary,
            ordinal,
        });
        Ok(())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Serialized byte size of any tuple of this schema: the u32 size
    /// header plus one fixed-width field per column.
    pub fn tuple_size(&self) -> usize {
        4 + self
            .columns
            .iter()
            .map(|c| c.data_type.byte_width())
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Char(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Char(_) => DataType::Char,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Char(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Char(s) => write!(f, "{s}"),
        }
    }
}

pub fn serialize_tuple(values: &[Value], schema: &Schema) -> Result<Vec<u8>> {
    if values.len() != schema.column_count() {
        bail!(EngineError::Schema(format!(
            "expected {} values, got {}",
            schema.column_count(),
            values.len()
        )));
    }

    let total_size = schema.tuple_size();
    let mut buf = Vec::with_capacity(total_size);
    buf.extend_from_slice(&(total_size as u32).to_le_bytes());

    for (value, column) in values.iter().zip(&schema.columns) {
        match (value, column.data_type) {
            (Value::Int(v), DataType::Int) => buf.extend_from_slice(&v.to_le_bytes()),
            (Value::Float(v), DataType::Float) => buf.extend_from_slice(&v.to_le_bytes()),
            (Value::Char(s), DataType::Char) => {
                let mut field = [0u8; MAX_CHAR_LENGTH];
                let bytes = s.as_bytes();
                let len = bytes.len().min(MAX_CHAR_LENGTH - 1);
                field[..len].copy_from_slice(&bytes[..len]);
                buf.extend_from_slice(&field);
            }
            (v, t) => bail!(EngineError::Schema(format!(
                "value {v} does not match type {t} of column '{}'",
                column.name
            ))),
        }
    }

    Ok(buf)
}

fn decode_field(data: &[u8], data_type: DataType) -> Result<Value> {
    if data.len() < data_type.byte_width() {
        bail!(EngineError::Schema(format!(
            "field of type {data_type} needs {} bytes, found {}",
            data_type.byte_width(),
            data.len()
        )));
    }
    match data_type {
        DataType::Int => Ok(Value::Int(i32::from_le_bytes(data[0..4].try_into()?))),
        DataType::Float => Ok(Value::Float(f32::from_le_bytes(data[0..4].try_into()?))),
        DataType::Char => {
            let end = data[..MAX_CHAR_LENGTH]
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(MAX_CHAR_LENGTH);
            Ok(Value::Char(
                String::from_utf8_lossy(&data[..end]).into_owned(),
            ))
        }
    }
}

pub fn deserialize_tuple(data: &[u8], schema: &Schema) -> Result<Vec<Value>> {
    if data.len() != schema.tuple_size() {
        bail!(EngineError::Schema(format!(
            "tuple holds {} bytes but the schema needs {}",
            data.len(),
            schema.tuple_size()
        )));
    }

    let mut values = Vec::with_capacity(schema.column_count());
    let mut offset = 4;
    for column in &schema.columns {
        values.push(decode_field(&data[offset..], column.data_type)?);
        offset += column.data_type.byte_width();
    }
    Ok(values)
}

/// An owned serialized row as stored in a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    pub data: Vec<u8>,
}

impl Tuple {
    pub fn from_values(values: &[Value], schema: &Schema) -> Result<Tuple> {
        Ok(Tuple {
            data: serialize_tuple(values, schema)?,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Tuple {
        Tuple {
            data: data.to_vec(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn values(&self, schema: &Schema) -> Result<Vec<Value>> {
        deserialize_tuple(&self.data, schema)
    }

    /// Decode a single column, located by summing the preceding widths.
    pub fn value_at(&self, index: usize, schema: &Schema) -> Result<Value> {
        let column = match schema.column(index) {
            Some(c) => c,
            None => bail!(EngineError::Schema(format!(
                "column index {index} out of range for schema with {} columns",
                schema.column_count()
            ))),
        };
        let offset = 4 + schema.columns[..index]
            .iter()
            .map(|c| c.data_type.byte_width())
            .sum::<usize>();
        decode_field(&self.data[offset..], column.data_type)
    }
}
