//! Applies a decoded [`Instruction`] to a [`MachineState`]: resolves
//! effective addresses, reads the source, writes the destination, derives
//! flags, and steers the instruction pointer for JNZ.
use crate::cpu::flags::{FlagBit, Flags};
use crate::cpu::state::MachineState;
use crate::decode::instruction::Instruction;
use crate::decode::operand::{ImmediateKind, Operand};
use crate::error::SimError;
use crate::platforms::x86_8086::register::Slot;
use crate::platforms::x86_8086::Mnemonic;

pub fn execute(instruction: &Instruction, state: &mut MachineState) -> Result<(), SimError> {
    let is_word = instruction.is_word();
    match instruction.mnemonic {
        Mnemonic::Mov => {
            let value = read_operand(&instruction.source, is_word, state)?;
            write_operand(&instruction.destination, value, is_word, state)
        }
        Mnemonic::Add | Mnemonic::Sub | Mnemonic::Cmp => {
            let destination_value = read_operand(&instruction.destination, is_word, state)?;
            let source_value = read_operand(&instruction.source, is_word, state)?;
            let result = match instruction.mnemonic {
                Mnemonic::Add => destination_value.wrapping_add(source_value),
                Mnemonic::Sub | Mnemonic::Cmp => destination_value.wrapping_sub(source_value),
                Mnemonic::Mov | Mnemonic::Jnz => unreachable!("handled in outer match"),
            };
            let masked = mask_to_width(result, is_word);
            state.flags = Flags::derive_from_result(masked, is_word);
            if instruction.mnemonic != Mnemonic::Cmp {
                write_operand(&instruction.destination, masked, is_word, state)?;
            }
            Ok(())
        }
        Mnemonic::Jnz => {
            if !state.flags.get(FlagBit::Zero) {
                let offset = match instruction.destination {
                    Operand::Immediate { value, .. } => value as i16,
                    other => unreachable!("JNZ's operand is always a relative offset, got {other:?}"),
                };
                let target = (state.ip() as i32 + offset as i32) as u16;
                state.set_ip(target);
            }
            Ok(())
        }
    }
}

fn mask_to_width(value: u16, is_word: bool) -> u16 {
    if is_word {
        value
    } else {
        value & 0x00FF
    }
}

/// Sums the registers named by an EAC base selector with the signed
/// displacement, wrapping as 16-bit arithmetic.
fn effective_address(base_selector: u8, displacement: i16, state: &MachineState) -> u16 {
    let bx = state.register_word(Slot::Bx);
    let bp = state.register_word(Slot::Bp);
    let si = state.register_word(Slot::Si);
    let di = state.register_word(Slot::Di);
    let base = match base_selector {
        0b000 => bx.wrapping_add(si),
        0b001 => bx.wrapping_add(di),
        0b010 => bp.wrapping_add(si),
        0b011 => bp.wrapping_add(di),
        0b100 => si,
        0b101 => di,
        0b110 => bp,
        0b111 => bx,
        other => unreachable!("r/m base selector is 3 bits, got {other}"),
    };
    base.wrapping_add(displacement as u16)
}

fn read_operand(operand: &Operand, is_word: bool, state: &MachineState) -> Result<u16, SimError> {
    match operand {
        Operand::Register { .. } => Ok(state.read(operand.access())),
        Operand::EffectiveAddress {
            base_selector,
            displacement,
        } => {
            let address = effective_address(*base_selector, *displacement, state) as u32;
            read_memory(state, address, is_word)
        }
        Operand::Immediate {
            value,
            kind: ImmediateKind::MemoryAbsolute,
            ..
        } => read_memory(state, *value as u32, is_word),
        Operand::Immediate { value, .. } => Ok(*value),
    }
}

fn write_operand(operand: &Operand, value: u16, is_word: bool, state: &mut MachineState) -> Result<(), SimError> {
    match operand {
        Operand::Register { .. } => {
            state.write(operand.access(), value);
            Ok(())
        }
        Operand::EffectiveAddress {
            base_selector,
            displacement,
        } => {
            let address = effective_address(*base_selector, *displacement, state) as u32;
            write_memory(state, address, value, is_word)
        }
        Operand::Immediate {
            kind: ImmediateKind::MemoryAbsolute,
            value: address,
            ..
        } => write_memory(state, *address as u32, value, is_word),
        Operand::Immediate { .. } => Err(SimError::UnwritableDestination),
    }
}

fn read_memory(state: &MachineState, address: u32, is_word: bool) -> Result<u16, SimError> {
    if is_word {
        state.memory.read_u16(address)
    } else {
        state.memory.read_u8(address).map(u16::from)
    }
}

fn write_memory(state: &mut MachineState, address: u32, value: u16, is_word: bool) -> Result<(), SimError> {
    if is_word {
        state.memory.write_u16(address, value)
    } else {
        state.memory.write_u8(address, value as u8)
    }
}
