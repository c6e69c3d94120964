//! Instruction decoder: turns a byte stream into a sequence of
//! [`Instruction`] records, one `decode_next` call per instruction.
pub mod classifier;
pub mod cursor;
pub mod instruction;
pub mod operand;

use crate::error::SimError;
use crate::platforms::x86_8086::addressing::{
    is_direct_address_escape, split_modrm, MOD_MEMORY_DISP16, MOD_MEMORY_DISP8,
    MOD_MEMORY_NO_DISP, MOD_REGISTER_DIRECT,
};
use crate::platforms::x86_8086::Mnemonic;
use classifier::{classify, EncodingVariant};
use cursor::ByteCursor;
use instruction::Instruction;
use operand::{ImmediateKind, Operand, Width};

/// Wraps a [`ByteCursor`] and produces one [`Instruction`] per call to
/// [`Decoder::decode_next`], advancing the cursor by the instruction's
/// encoded length each time.
pub struct Decoder<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8], ip: u16) -> Self {
        Decoder {
            cursor: ByteCursor::new(bytes, ip),
        }
    }

    pub fn ip(&self) -> u16 {
        self.cursor.ip()
    }

    pub fn at_end(&self) -> bool {
        self.cursor.at_end()
    }

    /// Relocates the decoder to resume at `ip`, for control-flow
    /// instructions that jump rather than fall through sequentially.
    pub fn set_ip(&mut self, ip: u16) {
        self.cursor.set_ip(ip);
    }

    pub fn decode_next(&mut self) -> Result<Instruction, SimError> {
        let first_byte = self.cursor.peek(0)?;

        // Only the shared `100000sw` family needs the second byte's reg
        // field to disambiguate ADD/SUB/CMP; every other opcode byte
        // determines its mnemonic on its own.
        let needs_modrm_for_classification = matches!(first_byte, 0b1000_0000..=0b1000_0011);
        let second_byte = if needs_modrm_for_classification {
            self.cursor.peek(1)?
        } else {
            0
        };

        let (mnemonic, variant) = classify(first_byte, second_byte).map_err(|err| match err {
            SimError::UnknownOpcode { byte, .. } => SimError::UnknownOpcode {
                byte,
                ip: self.cursor.ip(),
            },
            other => other,
        })?;

        let instruction = match variant {
            EncodingVariant::RegMemToFromReg => self.decode_reg_mem_to_from_reg(mnemonic, first_byte)?,
            EncodingVariant::ImmediateToRm => self.decode_immediate_to_rm(mnemonic, first_byte)?,
            EncodingVariant::ImmediateToRegister => self.decode_immediate_to_register(first_byte)?,
            EncodingVariant::MemoryToAccumulator => self.decode_memory_to_accumulator(first_byte)?,
            EncodingVariant::AccumulatorToMemory => self.decode_accumulator_to_memory(first_byte)?,
            EncodingVariant::ImmediateToAccumulator => {
                self.decode_immediate_to_accumulator(mnemonic, first_byte)?
            }
            EncodingVariant::RelativeJump => self.decode_relative_jump(mnemonic)?,
        };

        self.cursor.advance(instruction.length);
        Ok(instruction)
    }

    /// Decodes the `r/m` field of a ModR/M byte into an operand, reading
    /// whatever displacement bytes follow. Returns the operand and the
    /// number of displacement/address bytes consumed after the ModR/M byte
    /// itself.
    fn decode_rm_operand(&self, mode: u8, rm: u8, w: u8, after_modrm: usize) -> Result<(Operand, u16), SimError> {
        if mode == MOD_REGISTER_DIRECT {
            return Ok((Operand::register((rm << 1) | w), 0));
        }
        if is_direct_address_escape(mode, rm) {
            let address = self.cursor.peek_u16(after_modrm)?;
            return Ok((
                Operand::Immediate {
                    value: address,
                    width: Width::Word,
                    kind: ImmediateKind::MemoryAbsolute,
                },
                2,
            ));
        }
        let displacement = match mode {
            MOD_MEMORY_NO_DISP => 0,
            MOD_MEMORY_DISP8 => self.cursor.peek(after_modrm)? as i8 as i16,
            MOD_MEMORY_DISP16 => self.cursor.peek_u16(after_modrm)? as i16,
            other => unreachable!("ModR/M mode field is 2 bits, got {other}"),
        };
        let consumed = match mode {
            MOD_MEMORY_NO_DISP => 0,
            MOD_MEMORY_DISP8 => 1,
            MOD_MEMORY_DISP16 => 2,
            _ => unreachable!(),
        };
        Ok((
            Operand::EffectiveAddress {
                base_selector: rm,
                displacement,
            },
            consumed,
        ))
    }

    fn decode_reg_mem_to_from_reg(&self, mnemonic: Mnemonic, first_byte: u8) -> Result<Instruction, SimError> {
        let d_bit = (first_byte >> 1) & 1;
        let w_bit = first_byte & 1;
        let modrm = self.cursor.peek(1)?;
        let (mode, reg, rm) = split_modrm(modrm);

        let (rm_operand, disp_bytes) = self.decode_rm_operand(mode, rm, w_bit, 2)?;
        let reg_operand = Operand::register((reg << 1) | w_bit);

        let (destination, source) = if d_bit == 1 {
            (reg_operand, rm_operand)
        } else {
            (rm_operand, reg_operand)
        };

        Ok(Instruction {
            mnemonic,
            destination,
            source,
            w_bit,
            s_bit: 0,
            d_bit,
            mode,
            length: 2 + disp_bytes,
        })
    }

    fn decode_immediate_to_rm(&self, mnemonic: Mnemonic, first_byte: u8) -> Result<Instruction, SimError> {
        let s_bit = if mnemonic == Mnemonic::Mov {
            0
        } else {
            (first_byte >> 1) & 1
        };
        let w_bit = first_byte & 1;
        let modrm = self.cursor.peek(1)?;
        let (mode, _reg, rm) = split_modrm(modrm);

        let (destination, disp_bytes) = self.decode_rm_operand(mode, rm, w_bit, 2)?;
        let imm_offset = 2 + disp_bytes as usize;

        let imm_is_byte = s_bit == 1 || w_bit == 0;
        let raw = if imm_is_byte {
            self.cursor.peek(imm_offset)? as u16
        } else {
            self.cursor.peek_u16(imm_offset)?
        };
        let value = if w_bit == 1 && imm_is_byte {
            (raw as i8 as i16) as u16
        } else {
            raw
        };
        let imm_bytes: u16 = if imm_is_byte { 1 } else { 2 };

        let source = Operand::Immediate {
            value,
            width: Width::from_w_bit(w_bit),
            kind: ImmediateKind::Literal,
        };

        Ok(Instruction {
            mnemonic,
            destination,
            source,
            w_bit,
            s_bit,
            d_bit: 0,
            mode,
            length: 2 + disp_bytes + imm_bytes,
        })
    }

    fn decode_immediate_to_register(&self, first_byte: u8) -> Result<Instruction, SimError> {
        let w_bit = (first_byte >> 3) & 1;
        let reg = first_byte & 0b111;
        let code = (reg << 1) | w_bit;

        let (value, imm_bytes) = if w_bit == 1 {
            (self.cursor.peek_u16(1)?, 2u16)
        } else {
            (self.cursor.peek(1)? as u16, 1u16)
        };

        Ok(Instruction {
            mnemonic: Mnemonic::Mov,
            destination: Operand::register(code),
            source: Operand::Immediate {
                value,
                width: Width::from_w_bit(w_bit),
                kind: ImmediateKind::Literal,
            },
            w_bit,
            s_bit: 0,
            d_bit: 1,
            mode: MOD_REGISTER_DIRECT,
            length: 1 + imm_bytes,
        })
    }

    fn decode_memory_to_accumulator(&self, first_byte: u8) -> Result<Instruction, SimError> {
        let w_bit = first_byte & 1;
        let (address, length) = if w_bit == 1 {
            (self.cursor.peek_u16(1)?, 3)
        } else {
            (self.cursor.peek(1)? as u16, 2)
        };
        Ok(Instruction {
            mnemonic: Mnemonic::Mov,
            destination: Operand::register(w_bit),
            source: Operand::Immediate {
                value: address,
                width: Width::Word,
                kind: ImmediateKind::MemoryAbsolute,
            },
            w_bit,
            s_bit: 0,
            d_bit: 1,
            mode: MOD_REGISTER_DIRECT,
            length,
        })
    }

    fn decode_accumulator_to_memory(&self, first_byte: u8) -> Result<Instruction, SimError> {
        let w_bit = first_byte & 1;
        let (address, length) = if w_bit == 1 {
            (self.cursor.peek_u16(1)?, 3)
        } else {
            (self.cursor.peek(1)? as u16, 2)
        };
        Ok(Instruction {
            mnemonic: Mnemonic::Mov,
            destination: Operand::Immediate {
                value: address,
                width: Width::Word,
                kind: ImmediateKind::MemoryAbsolute,
            },
            source: Operand::register(w_bit),
            w_bit,
            s_bit: 0,
            d_bit: 0,
            mode: MOD_REGISTER_DIRECT,
            length,
        })
    }

    fn decode_immediate_to_accumulator(&self, mnemonic: Mnemonic, first_byte: u8) -> Result<Instruction, SimError> {
        let w_bit = first_byte & 1;
        let (value, imm_bytes) = if w_bit == 1 {
            (self.cursor.peek_u16(1)?, 2u16)
        } else {
            (self.cursor.peek(1)? as u16, 1u16)
        };
        Ok(Instruction {
            mnemonic,
            destination: Operand::register(w_bit),
            source: Operand::Immediate {
                value,
                width: Width::from_w_bit(w_bit),
                kind: ImmediateKind::Literal,
            },
            w_bit,
            s_bit: 0,
            d_bit: 1,
            mode: MOD_REGISTER_DIRECT,
            length: 1 + imm_bytes,
        })
    }

    /// JNZ carries its sole operand, the raw signed displacement, in
    /// `destination`; `source` is unused for this mnemonic. The printer
    /// applies the conventional `+2` offset to express it relative to the
    /// jump instruction's own address, while the executor adds the raw
    /// value to `ip` after that has already advanced past this instruction.
    fn decode_relative_jump(&self, mnemonic: Mnemonic) -> Result<Instruction, SimError> {
        let displacement = self.cursor.peek(1)? as i8 as i16;
        Ok(Instruction {
            mnemonic,
            destination: Operand::Immediate {
                value: displacement as u16,
                width: Width::Byte,
                kind: ImmediateKind::RelativeOffset,
            },
            source: Operand::Immediate {
                value: 0,
                width: Width::Byte,
                kind: ImmediateKind::Literal,
            },
            w_bit: 1,
            s_bit: 0,
            d_bit: 1,
            mode: MOD_REGISTER_DIRECT,
            length: 2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mov_register_to_register() {
        // mov cx, bx -> 89 D9 (100010 0 1, mod=11 reg=011 rm=001)
        let bytes = [0x89, 0xD9];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.mnemonic, Mnemonic::Mov);
        assert_eq!(instr.length, 2);
        assert_eq!(instr.destination, Operand::register(0b011 << 1 | 1));
        assert_eq!(instr.source, Operand::register(0b001 << 1 | 1));
        assert!(decoder.at_end());
    }

    #[test]
    fn decodes_mov_immediate_to_register_word() {
        // mov cx, 12 -> B9 0C 00
        let bytes = [0xB9, 0x0C, 0x00];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.mnemonic, Mnemonic::Mov);
        assert_eq!(instr.length, 3);
        match instr.source {
            Operand::Immediate { value, .. } => assert_eq!(value, 12),
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn decodes_mov_memory_with_8bit_displacement() {
        // mov al, [bx + si + 4] -> 8A 40 04
        let bytes = [0x8A, 0x40, 0x04];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.length, 3);
        assert_eq!(
            instr.source,
            Operand::EffectiveAddress {
                base_selector: 0b000,
                displacement: 4,
            }
        );
    }

    #[test]
    fn decodes_mov_direct_address() {
        // mov [1000], ax -> 89 06 E8 03
        let bytes = [0x89, 0x06, 0xE8, 0x03];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.length, 4);
        match instr.destination {
            Operand::Immediate {
                value,
                kind: ImmediateKind::MemoryAbsolute,
                ..
            } => assert_eq!(value, 1000),
            other => panic!("expected direct address, got {other:?}"),
        }
    }

    #[test]
    fn decodes_memory_to_accumulator_byte_form_reads_a_single_address_byte() {
        // mov al, [0x10] -> A0 10, followed by an unrelated next instruction
        // whose first byte must not be consumed as a second address byte.
        let bytes = [0xA0, 0x10, 0xB9, 0x0C, 0x00];
        let mut decoder = Decoder::new(&bytes, 0);
        let first = decoder.decode_next().unwrap();
        assert_eq!(first.length, 2);
        match first.source {
            Operand::Immediate {
                value,
                kind: ImmediateKind::MemoryAbsolute,
                ..
            } => assert_eq!(value, 0x10),
            other => panic!("expected direct address, got {other:?}"),
        }
        let second = decoder.decode_next().unwrap();
        assert_eq!(second.mnemonic, Mnemonic::Mov);
        assert!(decoder.at_end());
    }

    #[test]
    fn decodes_accumulator_to_memory_byte_form_reads_a_single_address_byte() {
        // mov [0x20], al -> A2 20
        let bytes = [0xA2, 0x20];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.length, 2);
        match instr.destination {
            Operand::Immediate {
                value,
                kind: ImmediateKind::MemoryAbsolute,
                ..
            } => assert_eq!(value, 0x20),
            other => panic!("expected direct address, got {other:?}"),
        }
        assert!(decoder.at_end());
    }

    #[test]
    fn decodes_memory_to_accumulator_word_form_reads_two_address_bytes() {
        // mov ax, [0x1234] -> A1 34 12
        let bytes = [0xA1, 0x34, 0x12];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.length, 3);
        match instr.source {
            Operand::Immediate {
                value,
                kind: ImmediateKind::MemoryAbsolute,
                ..
            } => assert_eq!(value, 0x1234),
            other => panic!("expected direct address, got {other:?}"),
        }
    }

    #[test]
    fn decodes_add_immediate_to_rm_with_sign_extension() {
        // add bx, -10 (word dest, sign-extended byte immediate) -> 83 C3 F6
        let bytes = [0x83, 0xC3, 0xF6];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.mnemonic, Mnemonic::Add);
        assert_eq!(instr.length, 3);
        match instr.source {
            Operand::Immediate { value, .. } => assert_eq!(value as i16, -10),
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn decodes_sub_immediate_to_accumulator() {
        // sub ax, 2 -> 2D 02 00
        let bytes = [0x2D, 0x02, 0x00];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.mnemonic, Mnemonic::Sub);
        assert_eq!(instr.length, 3);
        assert_eq!(instr.destination, Operand::register(1));
    }

    #[test]
    fn decodes_jnz_with_raw_signed_displacement() {
        // jnz $-4 -> 75 FA (raw displacement -6, print convention adds 2)
        let bytes = [0x75, 0xFA];
        let mut decoder = Decoder::new(&bytes, 0);
        let instr = decoder.decode_next().unwrap();
        assert_eq!(instr.mnemonic, Mnemonic::Jnz);
        assert_eq!(instr.length, 2);
        match instr.destination {
            Operand::Immediate { value, .. } => assert_eq!(value as i16, -6),
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn decodes_consecutive_instructions_advancing_ip() {
        let bytes = [0xB9, 0x0C, 0x00, 0x89, 0xD9];
        let mut decoder = Decoder::new(&bytes, 0);
        let first = decoder.decode_next().unwrap();
        assert_eq!(first.length, 3);
        assert_eq!(decoder.ip(), 3);
        let second = decoder.decode_next().unwrap();
        assert_eq!(second.length, 2);
        assert!(decoder.at_end());
    }

    #[test]
    fn truncated_instruction_is_reported() {
        let bytes = [0x89];
        let mut decoder = Decoder::new(&bytes, 0);
        assert_eq!(
            decoder.decode_next().unwrap_err(),
            SimError::TruncatedInstruction { ip: 0 }
        );
    }
}
