//! The structured `Instruction` record produced by the decoder: one per
//! decode step, transient, not retained across instructions.
use crate::decode::operand::Operand;
use crate::platforms::x86_8086::Mnemonic;

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    /// Write target. After decode this is always the write target: when
    /// the encoding's `d` bit was 0, source and destination were swapped
    /// during decode so this invariant holds uniformly downstream.
    pub destination: Operand,
    pub source: Operand,
    /// Encoding bits preserved verbatim for the printer and executor.
    pub w_bit: u8,
    pub s_bit: u8,
    pub d_bit: u8,
    pub mode: u8,
    /// Total encoded length in bytes, 1..=6.
    pub length: u16,
}

impl Instruction {
    pub fn is_word(&self) -> bool {
        self.w_bit == 1
    }
}
