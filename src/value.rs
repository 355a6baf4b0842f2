use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use allocative::Allocative;

use crate::data_type::DataType;
use crate::error::{DataError, Result};

/// Represents a single data value stored in the engine.
///
/// This enum wraps all supported primitive types into a single type that can
/// be passed around the engine. It includes support for missing (`Null`)
/// values.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub enum Value {
    /// Represents an empty or missing value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// An 8-bit signed integer value.
    Byte(i8),
    /// A 32-bit signed integer value.
    Int(i32),
    /// A 64-bit signed integer value.
    Long(i64),
    /// A 32-bit floating-point value.
    Float(f32),
    /// A 64-bit floating-point value.
    Double(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for efficient,
    /// thread-safe sharing and cheap cloning.
    Text(#[allocative(skip)] Arc<str>),
}

impl Value {
    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inner byte value if this is a [Value::Byte].
    pub fn as_byte(&self) -> Option<i8> {
        match self {
            Self::Byte(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner long value if this is a [Value::Long].
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the inner double value if this is a [Value::Double].
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a
    /// [Value::Text]. Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the logical [DataType] corresponding to this value.
    ///
    /// Returns `None` if the value is [Value::Null]: a standalone null is
    /// untyped until it is placed in a column.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(DataType::Bool),
            Self::Byte(_) => Some(DataType::Byte),
            Self::Int(_) => Some(DataType::Int),
            Self::Long(_) => Some(DataType::Long),
            Self::Float(_) => Some(DataType::Float),
            Self::Double(_) => Some(DataType::Double),
            Self::Text(_) => Some(DataType::Text),
        }
    }

    /// Widens this value to a 32-bit integer when numerically safe.
    pub fn widen_int(&self) -> Option<i32> {
        match self {
            Self::Byte(b) => Some(i32::from(*b)),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Widens this value to a 64-bit integer when numerically safe.
    pub fn widen_long(&self) -> Option<i64> {
        match self {
            Self::Byte(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Widens this value to a 32-bit float when numerically safe.
    pub fn widen_float(&self) -> Option<f32> {
        match self {
            Self::Byte(b) => Some(f32::from(*b)),
            Self::Int(i) => Some(*i as f32),
            Self::Long(l) => Some(*l as f32),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Widens this value to a 64-bit float when numerically safe.
    pub fn widen_double(&self) -> Option<f64> {
        match self {
            Self::Byte(b) => Some(f64::from(*b)),
            Self::Int(i) => Some(f64::from(*i)),
            Self::Long(l) => Some(*l as f64),
            Self::Float(f) => Some(f64::from(*f)),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Converts this value to the given storage type along the widening
    /// lattice.
    ///
    /// # Errors
    /// Fails with [DataError::TypeMismatch] when the conversion would narrow
    /// or cross kinds (e.g. boolean to numeric). `Null` widens to `Null`.
    pub fn widen_to(&self, target: DataType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let found = self.data_type().expect("non-null value has a type");
        let widened = match target {
            DataType::Bool => self.as_bool().map(Value::Bool),
            DataType::Byte => self.as_byte().map(Value::Byte),
            DataType::Int => self.widen_int().map(Value::Int),
            DataType::Long => self.widen_long().map(Value::Long),
            DataType::Float => self.widen_float().map(Value::Float),
            DataType::Double => self.widen_double().map(Value::Double),
            DataType::Text => match self {
                Self::Text(s) => Some(Value::Text(Arc::clone(s))),
                _ => None,
            },
        };
        widened.ok_or(DataError::TypeMismatch {
            stored: target,
            requested: found,
        })
    }

    /// Bit-for-bit equality used for change suppression: floats compare by
    /// their raw bits, everything else by value.
    pub fn bits_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Strict total order over all values, used by sort comparators and the
    /// generic index key. Null sorts first, then values of the same kind in
    /// their natural order; numerics of different widths compare through the
    /// widening lattice, and remaining cross-kind pairs fall back to the type
    /// order of [DataType].
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => match (self.widen_double(), other.widen_double()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => {
                    let a = self.data_type().map(|t| t as u8).unwrap_or(0);
                    let b = other.data_type().map(|t| t as u8).unwrap_or(0);
                    a.cmp(&b)
                }
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Byte(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Arc::from(v))
    }
}
