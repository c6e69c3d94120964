//! Renders a decoded [`Instruction`] as an assembler-syntax listing line,
//! and (when executing) a trailing diff comment against a [`MachineState`].
use crate::cpu::state::MachineState;
use crate::decode::instruction::Instruction;
use crate::decode::operand::{ImmediateKind, Operand};
use crate::platforms::x86_8086::addressing::EAC_BASE_EXPRESSIONS;
use crate::platforms::x86_8086::register::{name_for_code, SLOT_NAMES};
use crate::platforms::x86_8086::Mnemonic;

/// The raw stored signed offset plus the assembler's own `+2`: the printed
/// `$+N`/`$-N` names the branch target relative to the jump instruction's
/// own address rather than the instruction after it.
const JNZ_PRINT_ADJUSTMENT: i16 = 2;

/// Renders an instruction's assembler-syntax text, with no trailing diff.
pub fn render_instruction(instr: &Instruction) -> String {
    if instr.mnemonic == Mnemonic::Jnz {
        return format!("{} {}", instr.mnemonic, relative_offset_text(instr.destination));
    }

    let destination_text = operand_text(&instr.destination, instr.destination.is_memory());
    let source_text = operand_text(&instr.source, instr.destination.is_memory());
    format!("{} {}, {}", instr.mnemonic, destination_text, source_text)
}

/// Renders the ` ; ...` execution diff comment for an instruction that was
/// just applied to `state`, comparing against the snapshot taken before it
/// ran. Always present when executing, since the instruction pointer
/// always moves.
pub fn render_diff(instr: &Instruction, state: &MachineState) -> String {
    let mut parts = Vec::new();

    if let Operand::Register { code } = instr.destination {
        let access = instr.destination.access();
        let name = name_for_code(code);
        let prev = state.previous_register_word(access.slot);
        let cur = state.register_word(access.slot);
        parts.push(format!("{name}:{prev:#x}->{cur:#x}"));
    }

    let prev_ip = state.previous_register_word(crate::platforms::x86_8086::register::Slot::Ip);
    let cur_ip = state.ip();
    parts.push(format!("ip:{prev_ip:#x}->{cur_ip:#x}"));

    if instr.mnemonic.is_arithmetic() && (!state.previous_flags.is_empty() || !state.flags.is_empty()) {
        parts.push(format!("flags:{}->{}", state.previous_flags, state.flags));
    }

    format!(" ; {}", parts.join(" "))
}

fn operand_text(operand: &Operand, destination_is_memory: bool) -> String {
    match operand {
        Operand::Register { code } => name_for_code(*code).to_string(),
        Operand::EffectiveAddress {
            base_selector,
            displacement,
        } => effective_address_text(*base_selector, *displacement),
        Operand::Immediate {
            value,
            kind: ImmediateKind::MemoryAbsolute,
            ..
        } => format!("[{value}]"),
        Operand::Immediate {
            value,
            kind: ImmediateKind::Literal,
            ..
        } => {
            let qualifier = if destination_is_memory { size_qualifier(operand) } else { "" };
            format!("{qualifier}{value}")
        }
        Operand::Immediate {
            kind: ImmediateKind::RelativeOffset,
            ..
        } => relative_offset_text(*operand),
    }
}

fn effective_address_text(base_selector: u8, displacement: i16) -> String {
    let base = EAC_BASE_EXPRESSIONS[base_selector as usize];
    if displacement >= 0 {
        format!("[{base} + {displacement}]")
    } else {
        format!("[{base} - {}]", displacement.unsigned_abs())
    }
}

fn relative_offset_text(operand: Operand) -> String {
    match operand {
        Operand::Immediate {
            value,
            kind: ImmediateKind::RelativeOffset,
            ..
        } => {
            let printed = value as i16 + JNZ_PRINT_ADJUSTMENT;
            if printed >= 0 {
                format!("$+{printed}")
            } else {
                format!("$-{}", printed.unsigned_abs())
            }
        }
        other => panic!("relative_offset_text called on non-relative operand {other:?}"),
    }
}

/// `word `/`byte ` precedes a literal immediate only when the destination
/// is a memory operand; `self` here is always that immediate operand, so
/// its own width tells us which qualifier applies.
fn size_qualifier(operand: &Operand) -> &'static str {
    match operand {
        Operand::Immediate {
            width: crate::decode::operand::Width::Word,
            ..
        } => "word ",
        Operand::Immediate {
            width: crate::decode::operand::Width::Byte,
            ..
        } => "byte ",
        _ => "",
    }
}

/// Formats the final, non-zero registers and flags for the end-of-run
/// report (§6 of the design: `Final registers:` then one line per non-zero
/// register in slot order, then a `flags:` line).
pub fn render_final_registers(state: &MachineState) -> String {
    let mut lines = vec!["Final registers:".to_string()];
    for slot in MachineState::all_slots() {
        let value = state.register_word(slot);
        if value != 0 {
            lines.push(format!("      {}: {:#06x} ({})", SLOT_NAMES[slot as usize], value, value));
        }
    }
    lines.push(format!("   flags: {}", state.flags));
    lines.join("\n")
}
