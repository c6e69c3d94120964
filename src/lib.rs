//! Decoder and simulator for a subset of the Intel 8086 instruction set:
//! MOV, ADD, SUB, CMP, and the conditional jump JNZ.
//!
//! The pipeline is bytes -> [`decode::Decoder`] -> [`decode::instruction::Instruction`]
//! -> {[`printer`] ∥ [`cpu::executor`]}, consulting and mutating a
//! [`cpu::state::MachineState`] when executing.
pub mod cpu;
pub mod decode;
pub mod error;
pub mod platforms;
pub mod printer;
