use thiserror::Error;

use crate::bytecode::OpCode;

/// Failures raised while executing a chunk.
///
/// Chunks produced by the compiler never trigger these; they guard against
/// hand-built or corrupted bytecode images.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("[line {line}] stack underflow at offset {offset}")]
    StackUnderflow { offset: usize, line: usize },

    #[error("[line {line}] invalid opcode {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize, line: usize },

    #[error("[line {line}] {op} at offset {offset} is missing its operand")]
    MissingOperand { op: OpCode, offset: usize, line: usize },

    #[error("[line {line}] constant index {index} out of range (pool holds {pool})")]
    ConstantOutOfRange {
        index: u8,
        pool: usize,
        offset: usize,
        line: usize,
    },

    #[error("[line {line}] operand must be a number, got {found}")]
    TypeMismatch {
        found: &'static str,
        offset: usize,
        line: usize,
    },

    #[error("execution reached offset {offset} without a return")]
    MissingReturn { offset: usize },
}

impl RuntimeError {
    /// Source line of the failing instruction, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::StackUnderflow { line, .. }
            | RuntimeError::InvalidOpcode { line, .. }
            | RuntimeError::MissingOperand { line, .. }
            | RuntimeError::ConstantOutOfRange { line, .. }
            | RuntimeError::TypeMismatch { line, .. } => Some(*line),
            RuntimeError::MissingReturn { .. } => None,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            RuntimeError::StackUnderflow { offset, .. }
            | RuntimeError::InvalidOpcode { offset, .. }
            | RuntimeError::MissingOperand { offset, .. }
            | RuntimeError::ConstantOutOfRange { offset, .. }
            | RuntimeError::TypeMismatch { offset, .. }
            | RuntimeError::MissingReturn { offset } => *offset,
        }
    }
}
