use thiserror::Error;
use tracing::{debug, trace};

use crate::bytecode::compile_error::CompileErrors;
use crate::bytecode::disasm::{disassemble_chunk, disassemble_instruction};
use crate::bytecode::{Chunk, OpCode, compile};
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    /// Log the operand stack and the next instruction before every dispatch.
    pub trace_execution: bool,
    /// Log the disassembly of each freshly compiled chunk.
    pub print_code: bool,
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileErrors),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type InterpretResult = Result<Value, InterpretError>;

/// Stack machine executing one chunk at a time.
pub struct Vm {
    chunk: Chunk,
    ip: usize,
    stack: Vec<Value>,
    config: VmConfig,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            chunk: Chunk::new(),
            ip: 0,
            stack: Vec::new(),
            config,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// The chunk most recently handed to the VM.
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Compile `source` into a fresh chunk and run it.
    ///
    /// A compile failure is returned before anything executes.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        self.stack.clear();

        let mut chunk = Chunk::new();
        compile(source, &mut chunk)?;

        if self.config.print_code {
            debug!("\n{}", disassemble_chunk(&chunk, "code"));
        }

        Ok(self.run_chunk(chunk)?)
    }

    /// Take ownership of a finished chunk and execute it from offset 0.
    pub fn run_chunk(&mut self, chunk: Chunk) -> Result<Value, RuntimeError> {
        self.chunk = chunk;
        self.ip = 0;
        self.stack.clear();
        self.run()
    }

    // Execution

    fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            if self.config.trace_execution {
                self.trace_instruction();
            }

            let offset = self.ip;
            let byte = self
                .read_byte()
                .ok_or(RuntimeError::MissingReturn { offset })?;
            let op = OpCode::try_from(byte).map_err(|byte| RuntimeError::InvalidOpcode {
                byte,
                offset,
                line: self.line(offset),
            })?;

            match op {
                OpCode::Constant => {
                    let value = self.read_constant(offset)?;
                    self.push(value);
                }

                OpCode::Add => self.binary_op(offset, |a, b| a + b)?,
                OpCode::Subtract => self.binary_op(offset, |a, b| a - b)?,
                OpCode::Multiply => self.binary_op(offset, |a, b| a * b)?,
                OpCode::Divide => self.binary_op(offset, |a, b| a / b)?,

                OpCode::Negate => {
                    let n = self.pop_number(offset)?;
                    self.push(Value::Number(-n));
                }

                OpCode::Return => {
                    let result = self.pop(offset)?;
                    debug!(result = %result, "execution finished");
                    return Ok(result);
                }
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.chunk.code().get(self.ip).copied()?;
        self.ip += 1;
        Some(byte)
    }

    fn read_constant(&mut self, offset: usize) -> Result<Value, RuntimeError> {
        let index = self.read_byte().ok_or(RuntimeError::MissingOperand {
            op: OpCode::Constant,
            offset,
            line: self.line(offset),
        })?;

        self.chunk
            .constant(index)
            .ok_or(RuntimeError::ConstantOutOfRange {
                index,
                pool: self.chunk.constants().len(),
                offset,
                line: self.line(offset),
            })
    }

    /// `a` is popped first (the top of the stack), `b` second; the result is
    /// `a <op> b`.
    fn binary_op(&mut self, offset: usize, op: fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let a = self.pop_number(offset)?;
        let b = self.pop_number(offset)?;
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn line(&self, offset: usize) -> usize {
        self.chunk.line_at(offset).unwrap_or(0)
    }

    fn trace_instruction(&self) {
        let stack: String = self.stack.iter().map(|v| format!("[ {} ]", v)).collect();

        let mut instruction = String::new();
        if self.ip < self.chunk.len() {
            disassemble_instruction(&self.chunk, self.ip, &mut instruction);
        }

        trace!(stack = %stack, "{}", instruction.trim_end());
    }

    // Stack operations

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self, offset: usize) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            offset,
            line: self.line(offset),
        })
    }

    fn pop_number(&mut self, offset: usize) -> Result<f64, RuntimeError> {
        let value = self.pop(offset)?;
        value.as_number().ok_or(RuntimeError::TypeMismatch {
            found: value.type_name(),
            offset,
            line: self.line(offset),
        })
    }
}
