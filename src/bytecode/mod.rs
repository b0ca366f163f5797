pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod op;

pub use chunk::{Chunk, ChunkError};
pub use compile::compile;
pub use op::OpCode;
