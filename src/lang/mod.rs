//! # cinder language data model
//!
//! Values shared by the compiler's constant pool and the VM operand stack.

pub mod value;
