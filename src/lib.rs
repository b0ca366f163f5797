//! # cinder
//!
//! A single-pass expression compiler and stack-based bytecode VM.
//!
//! Source text is scanned on demand, parsed with a Pratt parser that emits
//! bytecode directly into a [`Chunk`], and executed by the [`Vm`].
//!
//! ```
//! use cinder::{Value, interpret};
//!
//! assert_eq!(interpret("(1 + 2) * 3").unwrap(), Value::Number(9.0));
//! ```

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use bytecode::{Chunk, ChunkError, OpCode, compile};
pub use lang::value::Value;
pub use runtime::{InterpretError, InterpretResult, RuntimeError, Vm, VmConfig};

/// Compile and run `source` on a fresh VM.
pub fn interpret(source: &str) -> InterpretResult {
    Vm::new().interpret(source)
}
