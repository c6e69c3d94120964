//! 8086 ModR/M addressing-mode constants.
//!
//! The 8086 ModR/M byte has no SIB byte and no REX prefix; its `r/m` field
//! (when `mod != 11`) selects directly from a fixed table of eight base
//! expressions, with a single direct-address escape at `mod=00, r/m=110`.

/// Mod = 00: memory access, no displacement (except the direct-address escape).
pub const MOD_MEMORY_NO_DISP: u8 = 0b00;

/// Mod = 01: memory access, 8-bit displacement (sign-extended to 16 bits).
pub const MOD_MEMORY_DISP8: u8 = 0b01;

/// Mod = 10: memory access, 16-bit displacement.
pub const MOD_MEMORY_DISP16: u8 = 0b10;

/// Mod = 11: register-to-register, no memory access.
pub const MOD_REGISTER_DIRECT: u8 = 0b11;

/// r/m = 110: when `mod = 00`, this is the direct-address escape (a bare
/// 16-bit memory immediate) rather than `[bp]`.
pub const RM_DIRECT_ADDRESS_ESCAPE: u8 = 0b110;

/// Bit shift of the Mod field within a ModR/M byte (bits 6-7).
pub const MODRM_MOD_SHIFT: u8 = 6;

/// Bit shift of the Reg field within a ModR/M byte (bits 3-5).
pub const MODRM_REG_SHIFT: u8 = 3;

/// 3-bit field mask, used for both the reg and r/m fields.
pub const BITS_3_MASK: u8 = 0x7;

/// Base expression printed for each `r/m` value when `mod != 11` (and not
/// the direct-address escape). Indexed directly by `r/m` (0..=7).
pub const EAC_BASE_EXPRESSIONS: [&str; 8] = [
    "bx + si", "bx + di", "bp + si", "bp + di", "si", "di", "bp", "bx",
];

/// Splits a ModR/M byte into `(mod, reg, rm)`.
pub fn split_modrm(modrm: u8) -> (u8, u8, u8) {
    let mode = (modrm >> MODRM_MOD_SHIFT) & 0b11;
    let reg = (modrm >> MODRM_REG_SHIFT) & BITS_3_MASK;
    let rm = modrm & BITS_3_MASK;
    (mode, reg, rm)
}

/// `true` when `mod = 00, r/m = 110`, i.e. the direct-address escape rather
/// than an effective address based on `bp`.
pub fn is_direct_address_escape(mode: u8, rm: u8) -> bool {
    mode == MOD_MEMORY_NO_DISP && rm == RM_DIRECT_ADDRESS_ESCAPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_modrm_fields() {
        // 0b11_010_011 -> mod=11, reg=010, rm=011
        assert_eq!(split_modrm(0b11_010_011), (0b11, 0b010, 0b011));
    }

    #[test]
    fn recognises_direct_address_escape() {
        assert!(is_direct_address_escape(MOD_MEMORY_NO_DISP, 0b110));
        assert!(!is_direct_address_escape(MOD_MEMORY_DISP8, 0b110));
        assert!(!is_direct_address_escape(MOD_MEMORY_NO_DISP, 0b111));
    }

    #[test]
    fn base_expressions_match_the_rm_table() {
        assert_eq!(EAC_BASE_EXPRESSIONS[0b000], "bx + si");
        assert_eq!(EAC_BASE_EXPRESSIONS[0b110], "bp");
        assert_eq!(EAC_BASE_EXPRESSIONS[0b111], "bx");
    }
}
