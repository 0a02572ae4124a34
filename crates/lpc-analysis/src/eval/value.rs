use crate::unit::UnitId;

/// What evaluation knows about an expression. Anything it cannot decide
/// statically is [`Value::Unknown`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unknown,
    Int(i64),
    Float(f64),
    String(String),
    /// A loaded object, by its source unit.
    Object(UnitId),
    /// A value of the named struct or class type.
    Struct(String),
    Array(Vec<Value>),
    Closure,
}

impl Value {
    /// Value of a declaration with this type and no known initializer.
    pub fn of_type(type_name: Option<&str>) -> Value {
        let Some(ty) = type_name else {
            return Value::Unknown;
        };
        match ty.strip_prefix("struct ").or_else(|| ty.strip_prefix("class ")) {
            Some(name) if !name.contains('*') => Value::Struct(name.trim().to_string()),
            _ => Value::Unknown,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Value::Struct(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// `+` on two known values: string concatenation or arithmetic.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            (Value::String(a), Value::Int(b)) => Value::String(format!("{a}{b}")),
            (Value::Int(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.iter().chain(b.iter()).cloned().collect())
            }
            _ => Value::Unknown,
        }
    }

    pub fn arithmetic(&self, other: &Value, op: fn(i64, i64) -> Option<i64>) -> Value {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => op(*a, *b).map_or(Value::Unknown, Value::Int),
            _ => Value::Unknown,
        }
    }
}
