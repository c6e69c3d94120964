//! The tagged-union `Operand` representation: a register, a memory
//! effective address, or an immediate value.
use crate::platforms::x86_8086::register::{access_for_code, RegisterAccess};

/// Distinguishes the three ways an `Immediate` operand's raw value is
/// interpreted, rather than the original reference's boolean side channels
/// (`mem`, `relative`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    /// A literal value (the `source` of a MOV/ADD/SUB/CMP immediate form).
    Literal,
    /// A direct 16-bit memory address (`mod=00, rm=110`, or the accumulator
    /// `MOV`-with-address forms).
    MemoryAbsolute,
    /// A signed offset relative to the address of the *next* instruction
    /// (JNZ). Stored as the raw decoded byte; the assembler's `+2` print
    /// convention is applied only by the printer.
    RelativeOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register {
        /// Combined `(reg << 1) | w` code; resolve via `access()`.
        code: u8,
    },
    EffectiveAddress {
        /// `r/m` field, 0..=7, selecting one of the eight base expressions.
        base_selector: u8,
        displacement: i16,
    },
    Immediate {
        value: u16,
        width: Width,
        kind: ImmediateKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn from_w_bit(w: u8) -> Self {
        if w == 1 {
            Width::Word
        } else {
            Width::Byte
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
        }
    }
}

impl Operand {
    pub fn register(code: u8) -> Self {
        Operand::Register { code }
    }

    /// Resolves a `Register` operand to its storage slot and byte-width.
    /// Panics if called on a non-register operand; callers branch on the
    /// operand's variant first, as the executor and printer both do.
    pub fn access(&self) -> RegisterAccess {
        match self {
            Operand::Register { code } => access_for_code(*code),
            _ => panic!("access() called on a non-register operand"),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(
            self,
            Operand::EffectiveAddress { .. }
                | Operand::Immediate {
                    kind: ImmediateKind::MemoryAbsolute,
                    ..
                }
        )
    }
}
