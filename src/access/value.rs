use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Cursor, Read};
use thiserror::Error;

/// Fixed number of bytes reserved for the characters of a varchar column.
pub const VARCHAR_LEN: usize = 128;

/// Column types a fixed-width record can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Int32,
    Varchar,
}

impl DataType {
    /// Number of bytes a value of this type occupies inside a record.
    pub fn width(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Int32 => 4,
            // length prefix + padded characters
            DataType::Varchar => 4 + VARCHAR_LEN,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Boolean),
            "int" | "int32" | "integer" => Ok(DataType::Int32),
            "varchar" | "string" | "text" => Ok(DataType::Varchar),
            other => Err(ValueError::UnknownType(other.to_string())),
        }
    }
}

/// Errors raised while encoding or decoding record values.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Unknown data type: {0}")]
    UnknownType(String),

    #[error("Value count {values} doesn't match schema length {columns}")]
    ArityMismatch { values: usize, columns: usize },

    #[error("Value {value:?} is not compatible with type {data_type:?}")]
    TypeMismatch { value: Value, data_type: DataType },

    #[error("NULL cannot be stored in a fixed-width record")]
    NullNotStorable,

    #[error("String of {len} bytes exceeds varchar length {}", VARCHAR_LEN)]
    StringTooLong { len: usize },

    #[error("Invalid boolean byte: {0}")]
    InvalidBoolean(u8),

    #[error("Invalid UTF-8 in varchar")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Record truncated: {0}")]
    Truncated(#[from] std::io::Error),
}

/// Values that can be stored in the database
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int32(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

/// Serialize values into a fixed-width record laid out according to `types`.
pub fn serialize_values(values: &[Value], types: &[DataType]) -> Result<Vec<u8>, ValueError> {
    if values.len() != types.len() {
        return Err(ValueError::ArityMismatch {
            values: values.len(),
            columns: types.len(),
        });
    }

    let width = types.iter().map(DataType::width).sum();
    let mut data = Vec::with_capacity(width);

    for (value, data_type) in values.iter().zip(types.iter()) {
        match (value, data_type) {
            (Value::Null, _) => return Err(ValueError::NullNotStorable),
            (Value::Boolean(b), DataType::Boolean) => {
                data.write_u8(u8::from(*b))?;
            }
            (Value::Int32(i), DataType::Int32) => {
                data.write_i32::<BigEndian>(*i)?;
            }
            (Value::String(s), DataType::Varchar) => {
                let bytes = s.as_bytes();
                if bytes.len() > VARCHAR_LEN {
                    return Err(ValueError::StringTooLong { len: bytes.len() });
                }
                data.write_u32::<BigEndian>(bytes.len() as u32)?;
                data.extend_from_slice(bytes);
                data.resize(data.len() + VARCHAR_LEN - bytes.len(), 0);
            }
            (value, data_type) => {
                return Err(ValueError::TypeMismatch {
                    value: value.clone(),
                    data_type: *data_type,
                });
            }
        }
    }

    Ok(data)
}

/// Deserialize a fixed-width record produced by [`serialize_values`].
pub fn deserialize_values(data: &[u8], types: &[DataType]) -> Result<Vec<Value>, ValueError> {
    let mut cursor = Cursor::new(data);
    let mut values = Vec::with_capacity(types.len());

    for data_type in types {
        let value = match data_type {
            DataType::Boolean => match cursor.read_u8()? {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                other => return Err(ValueError::InvalidBoolean(other)),
            },
            DataType::Int32 => Value::Int32(cursor.read_i32::<BigEndian>()?),
            DataType::Varchar => {
                let len = cursor.read_u32::<BigEndian>()? as usize;
                if len > VARCHAR_LEN {
                    return Err(ValueError::StringTooLong { len });
                }
                let mut chars = [0u8; VARCHAR_LEN];
                cursor.read_exact(&mut chars)?;
                Value::String(String::from_utf8(chars[..len].to_vec())?)
            }
        };
        values.push(value);
    }

    Ok(values)
}
