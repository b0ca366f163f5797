use serde::{Deserialize, Serialize};

/// Runtime value in the cinder language.
///
/// Values are the only data that can live on the VM operand stack and in a
/// chunk's constant pool. The compiler only ever produces `Number`; the other
/// two alternatives exist so the value model can grow without changing shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The absence of a value (`nil` in surface syntax).
    Absence,

    /// Boolean value.
    Boolean(bool),

    /// 64-bit floating-point number.
    Number(f64),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Absence | Value::Boolean(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absence => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Absence => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}
