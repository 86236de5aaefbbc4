#![warn(missing_docs)]
//! The intermediate representation of the UMSC trigger compiler: a flat,
//! stack-machine instruction set that sits between the AST lowerer and the
//! trigger assembler.

mod instruction;

pub use instruction::{Instruction, JumpTarget, Quantity, UnitOrder};
pub use umsc_types::RegisterId;
