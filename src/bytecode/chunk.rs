use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::OpCode;
use crate::lang::value::Value;

/// A constant index is a single operand byte, so one chunk can address at
/// most this many constants.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("constant pool is full ({MAX_CONSTANTS} entries)")]
    ConstantPoolFull,

    #[error("line table has {lines} entries for {code} code bytes")]
    LineTableMismatch { code: usize, lines: usize },

    #[error("constant pool holds {0} entries, the limit is {MAX_CONSTANTS}")]
    TooManyConstants(usize),

    #[error("failed to decode bytecode image: {0}")]
    Decode(postcard::Error),

    #[error("failed to encode bytecode image: {0}")]
    Encode(postcard::Error),
}

/// A compiled unit of bytecode.
///
/// Append-only: bytes go in with [`Chunk::write`], constants with
/// [`Chunk::add_const`]. `lines[i]` is the source line that produced
/// `code[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Append `value` to the constant pool and return its index.
    ///
    /// Equal values are not shared; every call takes a new slot.
    pub fn add_const(&mut self, value: Value) -> Result<u8, ChunkError> {
        let index =
            u8::try_from(self.constants.len()).map_err(|_| ChunkError::ConstantPoolFull)?;
        self.constants.push(value);
        Ok(index)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(index as usize).copied()
    }

    pub fn line_at(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Encode the chunk as a compact postcard image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        postcard::to_allocvec(self).map_err(ChunkError::Encode)
    }

    /// Decode a postcard image, re-checking the invariants the append-only
    /// API normally guarantees.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChunkError> {
        let chunk: Chunk = postcard::from_bytes(bytes).map_err(ChunkError::Decode)?;

        if chunk.code.len() != chunk.lines.len() {
            return Err(ChunkError::LineTableMismatch {
                code: chunk.code.len(),
                lines: chunk.lines.len(),
            });
        }

        if chunk.constants.len() > MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants(chunk.constants.len()));
        }

        Ok(chunk)
    }
}
