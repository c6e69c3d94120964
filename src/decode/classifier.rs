//! Maps the first byte of an instruction (and, for the shared arithmetic
//! family, the reg field of the second byte) to a mnemonic and encoding
//! variant. A `match` over byte patterns, exhaustiveness-checked by the
//! compiler, rather than a runtime hash map.
use crate::error::SimError;
use crate::platforms::x86_8086::instruction::shared_arithmetic_subop as subop;
use crate::platforms::x86_8086::Mnemonic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingVariant {
    /// `100010dw` (MOV) / `000000dw` (ADD) / `001010dw` (SUB) / `001110dw` (CMP).
    RegMemToFromReg,
    /// `1100011w` (MOV) + `mod 000 r/m`, or the shared `100000sw` family.
    ImmediateToRm,
    /// `1011wrrr` (MOV only).
    ImmediateToRegister,
    /// `1010000w` (MOV only).
    MemoryToAccumulator,
    /// `1010001w` (MOV only).
    AccumulatorToMemory,
    /// `0000010w` / `0010110w` / `0011110w` (ADD/SUB/CMP only).
    ImmediateToAccumulator,
    /// `01110101` (JNZ only).
    RelativeJump,
}

/// Classifies the first byte of an instruction. For the shared
/// `100000sw` ADD/SUB/CMP family, `second_byte` supplies the byte whose
/// reg field disambiguates the mnemonic; every other first byte ignores it.
pub fn classify(first_byte: u8, second_byte: u8) -> Result<(Mnemonic, EncodingVariant), SimError> {
    match first_byte {
        0b1000_1000..=0b1000_1011 => Ok((Mnemonic::Mov, EncodingVariant::RegMemToFromReg)),
        0b1100_0110 | 0b1100_0111 => Ok((Mnemonic::Mov, EncodingVariant::ImmediateToRm)),
        0b1011_0000..=0b1011_1111 => Ok((Mnemonic::Mov, EncodingVariant::ImmediateToRegister)),
        0b1010_0000 | 0b1010_0001 => Ok((Mnemonic::Mov, EncodingVariant::MemoryToAccumulator)),
        0b1010_0010 | 0b1010_0011 => Ok((Mnemonic::Mov, EncodingVariant::AccumulatorToMemory)),

        0b0000_0000..=0b0000_0011 => Ok((Mnemonic::Add, EncodingVariant::RegMemToFromReg)),
        0b0000_0100 | 0b0000_0101 => Ok((Mnemonic::Add, EncodingVariant::ImmediateToAccumulator)),

        0b0010_1000..=0b0010_1011 => Ok((Mnemonic::Sub, EncodingVariant::RegMemToFromReg)),
        0b0010_1100 | 0b0010_1101 => Ok((Mnemonic::Sub, EncodingVariant::ImmediateToAccumulator)),

        0b0011_1000..=0b0011_1011 => Ok((Mnemonic::Cmp, EncodingVariant::RegMemToFromReg)),
        0b0011_1100 | 0b0011_1101 => Ok((Mnemonic::Cmp, EncodingVariant::ImmediateToAccumulator)),

        0b1000_0000..=0b1000_0011 => {
            let bits = (second_byte >> 3) & 0b111;
            let mnemonic = match bits {
                subop::ADD => Mnemonic::Add,
                subop::SUB => Mnemonic::Sub,
                subop::CMP => Mnemonic::Cmp,
                _ => return Err(SimError::InvalidArithmeticSubop { bits }),
            };
            Ok((mnemonic, EncodingVariant::ImmediateToRm))
        }

        0b0111_0101 => Ok((Mnemonic::Jnz, EncodingVariant::RelativeJump)),

        other => Err(SimError::UnknownOpcode { byte: other, ip: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mov_reg_mem_to_from_reg() {
        assert_eq!(
            classify(0b1000_1001, 0).unwrap(),
            (Mnemonic::Mov, EncodingVariant::RegMemToFromReg)
        );
    }

    #[test]
    fn classifies_mov_immediate_to_register() {
        assert_eq!(
            classify(0b1011_0101, 0).unwrap(),
            (Mnemonic::Mov, EncodingVariant::ImmediateToRegister)
        );
    }

    #[test]
    fn classifies_shared_arithmetic_family_by_reg_field() {
        // mod=11, reg=000 (ADD), rm=000
        assert_eq!(
            classify(0b1000_0001, 0b1100_0000).unwrap(),
            (Mnemonic::Add, EncodingVariant::ImmediateToRm)
        );
        // reg=101 (SUB)
        assert_eq!(
            classify(0b1000_0001, 0b1100_1000).unwrap(),
            (Mnemonic::Sub, EncodingVariant::ImmediateToRm)
        );
        // reg=111 (CMP)
        assert_eq!(
            classify(0b1000_0001, 0b1111_1000).unwrap(),
            (Mnemonic::Cmp, EncodingVariant::ImmediateToRm)
        );
    }

    #[test]
    fn rejects_invalid_shared_family_subop() {
        let err = classify(0b1000_0001, 0b1101_0000).unwrap_err();
        assert_eq!(err, SimError::InvalidArithmeticSubop { bits: 0b010 });
    }

    #[test]
    fn classifies_jnz() {
        assert_eq!(
            classify(0b0111_0101, 0).unwrap(),
            (Mnemonic::Jnz, EncodingVariant::RelativeJump)
        );
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = classify(0xF0, 0).unwrap_err();
        assert_eq!(err, SimError::UnknownOpcode { byte: 0xF0, ip: 0 });
    }
}
