//! Type system for Cyclone machines.
//!
//! Types are plain values: a closed set of primitive categories plus
//! named enumerations. Category checks and compatibility are exhaustive
//! matches over [`Type`], so adding a category is a compile-time change.

use std::fmt;

/// Represents the type of a declaration or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    Real,
    Str,
    Char,
    /// User-defined enumeration, identified by its declared name.
    Enum(String),
    /// Sentinel for expressions whose type could not be determined.
    ///
    /// Compatible with nothing, and checks against it are never reported,
    /// so a single root cause produces a single diagnostic.
    Error,
}

impl Type {
    /// Built-in type for a keyword such as `int` or `bool`.
    pub fn from_keyword(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int),
            "bool" => Some(Type::Bool),
            "real" => Some(Type::Real),
            "string" => Some(Type::Str),
            "char" => Some(Type::Char),
            _ => None,
        }
    }

    pub fn is_int_type(&self) -> bool {
        matches!(self, Type::Int)
    }

    pub fn is_bool_type(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_real_type(&self) -> bool {
        matches!(self, Type::Real)
    }

    pub fn is_enum_type(&self) -> bool {
        matches!(self, Type::Enum(_))
    }

    pub fn is_string_type(&self) -> bool {
        matches!(self, Type::Str)
    }

    pub fn is_char_type(&self) -> bool {
        matches!(self, Type::Char)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Real)
    }

    /// Types that support `<`, `<=`, `>` and `>=`.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Type::Int | Type::Real | Type::Char)
    }

    /// Human-readable name, as written in source.
    pub fn name(&self) -> &str {
        match self {
            Type::Int => "int",
            Type::Bool => "bool",
            Type::Real => "real",
            Type::Str => "string",
            Type::Char => "char",
            Type::Enum(name) => name,
            Type::Error => "<error>",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check whether a value of type `actual` may fill a slot of type `expected`.
///
/// * identical primitive categories are compatible
/// * distinct categories are not; there is no implicit numeric coercion
/// * enumerations are compatible only with the enumeration of the same name
/// * the error type is compatible with nothing, including itself
pub fn compatible(expected: &Type, actual: &Type) -> bool {
    match (expected, actual) {
        (Type::Error, _) | (_, Type::Error) => false,
        (Type::Enum(left), Type::Enum(right)) => left == right,
        (Type::Int, Type::Int)
        | (Type::Bool, Type::Bool)
        | (Type::Real, Type::Real)
        | (Type::Str, Type::Str)
        | (Type::Char, Type::Char) => true,
        (
            Type::Int | Type::Bool | Type::Real | Type::Str | Type::Char | Type::Enum(_),
            _,
        ) => false,
    }
}

/// Slot check with the configurable int-to-real widening applied on top
/// of [`compatible`].
pub fn accepts(expected: &Type, actual: &Type, widen_int_to_real: bool) -> bool {
    compatible(expected, actual)
        || (widen_int_to_real && expected.is_real_type() && actual.is_int_type())
}
