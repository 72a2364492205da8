//! WDL data types carried on ports.
//!
//! Ports and declarations carry atomic types such as `Int`, `Boolean`, and
//! `String`, plus the parametric `Array[T]`. Each type is an immutable enum
//! value.
//!
//! Coercion rules (the subset of WDL's rules this compiler checks on edges):
//! 1. `Int` coerces to `Float`
//! 2. `Boolean`, `Int`, `Float`, and `File` coerce to `String`
//! 3. `String` coerces to `File`
//! 4. `Array[T]` coerces to `Array[U]` provided `T` coerces to `U`

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WDL value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Boolean type (true/false)
    Boolean,

    /// Integer type
    Int,

    /// Floating point type
    Float,

    /// String type
    String,

    /// File type (represents a filesystem path)
    File,

    /// Array type, parameterized by item type
    Array { item_type: Box<Type> },
}

impl Type {
    /// Create a new Array type.
    pub fn array(item_type: Type) -> Self {
        Type::Array {
            item_type: Box::new(item_type),
        }
    }

    /// Check whether a value of this type can flow into a port of type `to`.
    pub fn coerces(&self, to: &Type) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (Type::Int, Type::Float) => true,
            (Type::Boolean | Type::Int | Type::Float | Type::File, Type::String) => true,
            (Type::String, Type::File) => true,
            (Type::Array { item_type: from }, Type::Array { item_type: to }) => from.coerces(to),
            _ => false,
        }
    }

    /// Get the item type of an Array, if this is one.
    pub fn item_type(&self) -> Option<&Type> {
        match self {
            Type::Array { item_type } => Some(item_type),
            _ => None,
        }
    }

    /// Name of the WDL standard-library function that reads a value of this
    /// type back from a task output file.
    ///
    /// Scalars follow the `read_<lowercased_type>` convention expected by
    /// downstream engines; arrays are read line-wise.
    pub fn read_fn(&self) -> String {
        match self {
            Type::Array { .. } => "read_lines".to_string(),
            scalar => format!("read_{}", scalar.to_string().to_lowercase()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "Boolean"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::String => write!(f, "String"),
            Type::File => write!(f, "File"),
            Type::Array { item_type } => write!(f, "Array[{}]", item_type),
        }
    }
}
