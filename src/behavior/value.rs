//! Typed property values and parameters that may be read indirectly.
//!
//! Table properties carry one of a handful of types. A property whose string
//! value starts with `*` is an indirect reference: it names a variable that is
//! read when the node runs, so the node always sees the current value.

use std::fmt;

use super::error::VariableError;

/// A typed value stored in property bags and variable stores.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(String),
    Color(Color),
    File(String),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Color(_) => "color",
            Value::File(_) => "file",
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String-like payload (plain strings and file references).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::File(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) | Value::File(s) => f.write_str(s),
            Value::Color(c) => write!(f, "{c}"),
        }
    }
}

/// RGBA color parsed from `#AARRGGBB` or `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    /// Parse a hex color string. Eight digits are alpha first, as the tile
    /// editor writes them.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 255,
            }),
            8 => Some(Color {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }
}

/// A property as written in a table: a literal or an indirect reference.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Literal(Value),
    Indirect(String),
}

/// Read access to variables at evaluation time.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// Conversion from a stored [`Value`] into a node parameter type.
pub trait FromValue: Sized {
    const EXPECTED: &'static str;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for f32 {
    const EXPECTED: &'static str = "float";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f32()
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "int";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i32),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) | Value::File(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Color {
    const EXPECTED: &'static str = "color";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Color(c) => Some(*c),
            Value::Str(s) => Color::from_hex(s),
            _ => None,
        }
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// A node parameter: fixed at load time or read from a variable when used.
#[derive(Debug, Clone, PartialEq)]
pub enum Param<T> {
    Literal(T),
    Indirect(String),
}

impl<T: FromValue + Clone> Param<T> {
    /// Build a parameter from a table property, checking literal types now.
    pub fn from_property(value: &PropertyValue) -> Result<Self, String> {
        match value {
            PropertyValue::Indirect(name) => Ok(Param::Indirect(name.clone())),
            PropertyValue::Literal(v) => T::from_value(v).map(Param::Literal).ok_or_else(|| {
                format!("expected {}, found {}", T::EXPECTED, v.type_name())
            }),
        }
    }

    /// Produce the current value, reading the variable for indirect params.
    pub fn resolve(&self, vars: &dyn VariableLookup) -> Result<T, VariableError> {
        match self {
            Param::Literal(v) => Ok(v.clone()),
            Param::Indirect(name) => {
                let value = vars
                    .lookup(name)
                    .ok_or_else(|| VariableError::VariableNotFound(name.clone()))?;
                T::from_value(&value).ok_or_else(|| VariableError::TypeMismatch {
                    name: name.clone(),
                    expected: T::EXPECTED,
                    found: value.type_name(),
                })
            }
        }
    }
}
