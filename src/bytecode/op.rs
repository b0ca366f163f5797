// =============================================================================
// OPCODE - Bytecode instruction bytes
// =============================================================================

/// One-byte instruction opcodes.
///
/// Discriminants are the encoded byte values and are stable for every chunk
/// this crate writes, including serialized images.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `Constant <index:u8>`: push `constants[index]`.
    Constant = 1,

    // binary
    Add,
    Subtract,
    Multiply,
    Divide,

    // unary
    Negate,

    /// Pop the result and stop.
    Return,
}

impl OpCode {
    /// Encoded width of the instruction, operand bytes included.
    pub fn width(self) -> usize {
        match self {
            OpCode::Constant => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Return => "OP_RETURN",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    /// The byte that failed to decode.
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            1 => OpCode::Constant,
            2 => OpCode::Add,
            3 => OpCode::Subtract,
            4 => OpCode::Multiply,
            5 => OpCode::Divide,
            6 => OpCode::Negate,
            7 => OpCode::Return,
            other => return Err(other),
        })
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
