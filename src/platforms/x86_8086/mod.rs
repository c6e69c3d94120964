//! Architecture-specific encoding constants for the 8086 instruction subset
//! this crate decodes and simulates: register naming, ModR/M addressing,
//! and opcode-byte classification.
pub mod addressing;
pub mod instruction;
pub mod register;

pub use instruction::Mnemonic;
pub use register::{AddressingMode, RegisterAccess, Slot};
