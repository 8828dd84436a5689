//! Opcode table: one descriptor per opcode byte.
//!
//! The table is a compile-time constant. Every byte has an entry; bytes with
//! no documented meaning decode to [`OpcodeDescriptor::ILLEGAL`].

use std::fmt;

/// 6502 addressing modes.
///
/// The mode decides how many operand bytes follow the opcode and how the
/// effective location is computed from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand (CLC, RTS, ...)
    Implied,
    /// Operates on A (ASL A, ROR A, ...)
    Accumulator,
    /// `#$nn`: the operand byte is the value
    Immediate,
    /// `$nn`
    ZeroPage,
    /// `$nn,X`, wraps within page zero
    ZeroPageX,
    /// `$nn,Y`, wraps within page zero
    ZeroPageY,
    /// `$nnnn`
    Absolute,
    /// `$nnnn,X`
    AbsoluteX,
    /// `$nnnn,Y`
    AbsoluteY,
    /// `($nnnn)`, JMP only
    Indirect,
    /// `($nn,X)`
    IndexedIndirect,
    /// `($nn),Y`
    IndirectIndexed,
    /// Signed branch displacement
    Relative,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed
            | AddressingMode::Relative => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// Documented 6502 instruction mnemonics, plus the sentinel for bytes that
/// have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    Illegal,
}

impl Mnemonic {
    #[rustfmt::skip]
    pub const fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Illegal => "???",
        }
    }

    /// Instructions that only read their operand and therefore pay the
    /// indexed page-cross cycle.
    const fn reads_operand(self) -> bool {
        use Mnemonic::*;
        matches!(self, Adc | And | Cmp | Eor | Lda | Ldx | Ldy | Ora | Sbc)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static information about one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDescriptor {
    pub mnemonic: Mnemonic,
    pub addressing_mode: AddressingMode,
    /// Total bytes including the opcode (1-3)
    pub length: u8,
    /// Documented cycle count before penalties
    pub base_cycles: u8,
    /// Whether a page cross during operand resolution costs one cycle
    pub page_penalty: bool,
}

impl OpcodeDescriptor {
    pub const ILLEGAL: OpcodeDescriptor = OpcodeDescriptor {
        mnemonic: Mnemonic::Illegal,
        addressing_mode: AddressingMode::Implied,
        length: 1,
        base_cycles: 0,
        page_penalty: false,
    };

    const fn new(mnemonic: Mnemonic, addressing_mode: AddressingMode, base_cycles: u8) -> Self {
        let page_penalty = mnemonic.reads_operand()
            && matches!(
                addressing_mode,
                AddressingMode::AbsoluteX
                    | AddressingMode::AbsoluteY
                    | AddressingMode::IndirectIndexed
            );
        Self {
            mnemonic,
            addressing_mode,
            length: 1 + addressing_mode.operand_len(),
            base_cycles,
            page_penalty,
        }
    }

    pub const fn is_illegal(&self) -> bool {
        matches!(self.mnemonic, Mnemonic::Illegal)
    }
}

/// Look up the descriptor for an opcode byte. Total: never fails.
#[inline]
pub fn decode(opcode: u8) -> OpcodeDescriptor {
    OPCODE_TABLE[opcode as usize]
}

/// All 256 descriptors, indexed by opcode byte.
pub const OPCODE_TABLE: [OpcodeDescriptor; 256] = build_table();

const fn build_table() -> [OpcodeDescriptor; 256] {
    let mut table = [OpcodeDescriptor::ILLEGAL; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = describe(i as u8);
        i += 1;
    }
    table
}

#[rustfmt::skip]
const fn describe(opcode: u8) -> OpcodeDescriptor {
    use AddressingMode::*;
    use Mnemonic::*;
    let (m, mode, cycles) = match opcode {
        0x69 => (Adc, Immediate, 2), 0x65 => (Adc, ZeroPage, 3), 0x75 => (Adc, ZeroPageX, 4),
        0x6D => (Adc, Absolute, 4), 0x7D => (Adc, AbsoluteX, 4), 0x79 => (Adc, AbsoluteY, 4),
        0x61 => (Adc, IndexedIndirect, 6), 0x71 => (Adc, IndirectIndexed, 5),

        0x29 => (And, Immediate, 2), 0x25 => (And, ZeroPage, 3), 0x35 => (And, ZeroPageX, 4),
        0x2D => (And, Absolute, 4), 0x3D => (And, AbsoluteX, 4), 0x39 => (And, AbsoluteY, 4),
        0x21 => (And, IndexedIndirect, 6), 0x31 => (And, IndirectIndexed, 5),

        0x0A => (Asl, Accumulator, 2), 0x06 => (Asl, ZeroPage, 5), 0x16 => (Asl, ZeroPageX, 6),
        0x0E => (Asl, Absolute, 6), 0x1E => (Asl, AbsoluteX, 7),

        0x90 => (Bcc, Relative, 2), 0xB0 => (Bcs, Relative, 2), 0xF0 => (Beq, Relative, 2),
        0x30 => (Bmi, Relative, 2), 0xD0 => (Bne, Relative, 2), 0x10 => (Bpl, Relative, 2),
        0x50 => (Bvc, Relative, 2), 0x70 => (Bvs, Relative, 2),

        0x24 => (Bit, ZeroPage, 3), 0x2C => (Bit, Absolute, 4),

        0x00 => (Brk, Implied, 7),

        0x18 => (Clc, Implied, 2), 0xD8 => (Cld, Implied, 2), 0x58 => (Cli, Implied, 2),
        0xB8 => (Clv, Implied, 2),

        0xC9 => (Cmp, Immediate, 2), 0xC5 => (Cmp, ZeroPage, 3), 0xD5 => (Cmp, ZeroPageX, 4),
        0xCD => (Cmp, Absolute, 4), 0xDD => (Cmp, AbsoluteX, 4), 0xD9 => (Cmp, AbsoluteY, 4),
        0xC1 => (Cmp, IndexedIndirect, 6), 0xD1 => (Cmp, IndirectIndexed, 5),

        0xE0 => (Cpx, Immediate, 2), 0xE4 => (Cpx, ZeroPage, 3), 0xEC => (Cpx, Absolute, 4),
        0xC0 => (Cpy, Immediate, 2), 0xC4 => (Cpy, ZeroPage, 3), 0xCC => (Cpy, Absolute, 4),

        0xC6 => (Dec, ZeroPage, 5), 0xD6 => (Dec, ZeroPageX, 6), 0xCE => (Dec, Absolute, 6),
        0xDE => (Dec, AbsoluteX, 7),
        0xCA => (Dex, Implied, 2), 0x88 => (Dey, Implied, 2),

        0x49 => (Eor, Immediate, 2), 0x45 => (Eor, ZeroPage, 3), 0x55 => (Eor, ZeroPageX, 4),
        0x4D => (Eor, Absolute, 4), 0x5D => (Eor, AbsoluteX, 4), 0x59 => (Eor, AbsoluteY, 4),
        0x41 => (Eor, IndexedIndirect, 6), 0x51 => (Eor, IndirectIndexed, 5),

        0xE6 => (Inc, ZeroPage, 5), 0xF6 => (Inc, ZeroPageX, 6), 0xEE => (Inc, Absolute, 6),
        0xFE => (Inc, AbsoluteX, 7),
        0xE8 => (Inx, Implied, 2), 0xC8 => (Iny, Implied, 2),

        0x4C => (Jmp, Absolute, 3), 0x6C => (Jmp, Indirect, 5),
        0x20 => (Jsr, Absolute, 6),

        0xA9 => (Lda, Immediate, 2), 0xA5 => (Lda, ZeroPage, 3), 0xB5 => (Lda, ZeroPageX, 4),
        0xAD => (Lda, Absolute, 4), 0xBD => (Lda, AbsoluteX, 4), 0xB9 => (Lda, AbsoluteY, 4),
        0xA1 => (Lda, IndexedIndirect, 6), 0xB1 => (Lda, IndirectIndexed, 5),

        0xA2 => (Ldx, Immediate, 2), 0xA6 => (Ldx, ZeroPage, 3), 0xB6 => (Ldx, ZeroPageY, 4),
        0xAE => (Ldx, Absolute, 4), 0xBE => (Ldx, AbsoluteY, 4),

        0xA0 => (Ldy, Immediate, 2), 0xA4 => (Ldy, ZeroPage, 3), 0xB4 => (Ldy, ZeroPageX, 4),
        0xAC => (Ldy, Absolute, 4), 0xBC => (Ldy, AbsoluteX, 4),

        0x4A => (Lsr, Accumulator, 2), 0x46 => (Lsr, ZeroPage, 5), 0x56 => (Lsr, ZeroPageX, 6),
        0x4E => (Lsr, Absolute, 6), 0x5E => (Lsr, AbsoluteX, 7),

        0xEA => (Nop, Implied, 2),

        0x09 => (Ora, Immediate, 2), 0x05 => (Ora, ZeroPage, 3), 0x15 => (Ora, ZeroPageX, 4),
        0x0D => (Ora, Absolute, 4), 0x1D => (Ora, AbsoluteX, 4), 0x19 => (Ora, AbsoluteY, 4),
        0x01 => (Ora, IndexedIndirect, 6), 0x11 => (Ora, IndirectIndexed, 5),

        0x48 => (Pha, Implied, 3), 0x08 => (Php, Implied, 3),
        0x68 => (Pla, Implied, 4), 0x28 => (Plp, Implied, 4),

        0x2A => (Rol, Accumulator, 2), 0x26 => (Rol, ZeroPage, 5), 0x36 => (Rol, ZeroPageX, 6),
        0x2E => (Rol, Absolute, 6), 0x3E => (Rol, AbsoluteX, 7),

        0x6A => (Ror, Accumulator, 2), 0x66 => (Ror, ZeroPage, 5), 0x76 => (Ror, ZeroPageX, 6),
        0x6E => (Ror, Absolute, 6), 0x7E => (Ror, AbsoluteX, 7),

        0x40 => (Rti, Implied, 6), 0x60 => (Rts, Implied, 6),

        0xE9 => (Sbc, Immediate, 2), 0xE5 => (Sbc, ZeroPage, 3), 0xF5 => (Sbc, ZeroPageX, 4),
        0xED => (Sbc, Absolute, 4), 0xFD => (Sbc, AbsoluteX, 4), 0xF9 => (Sbc, AbsoluteY, 4),
        0xE1 => (Sbc, IndexedIndirect, 6), 0xF1 => (Sbc, IndirectIndexed, 5),

        0x38 => (Sec, Implied, 2), 0xF8 => (Sed, Implied, 2), 0x78 => (Sei, Implied, 2),

        0x85 => (Sta, ZeroPage, 3), 0x95 => (Sta, ZeroPageX, 4), 0x8D => (Sta, Absolute, 4),
        0x9D => (Sta, AbsoluteX, 5), 0x99 => (Sta, AbsoluteY, 5),
        0x81 => (Sta, IndexedIndirect, 6), 0x91 => (Sta, IndirectIndexed, 6),

        0x86 => (Stx, ZeroPage, 3), 0x96 => (Stx, ZeroPageY, 4), 0x8E => (Stx, Absolute, 4),
        0x84 => (Sty, ZeroPage, 3), 0x94 => (Sty, ZeroPageX, 4), 0x8C => (Sty, Absolute, 4),

        0xAA => (Tax, Implied, 2), 0xA8 => (Tay, Implied, 2), 0xBA => (Tsx, Implied, 2),
        0x8A => (Txa, Implied, 2), 0x9A => (Txs, Implied, 2), 0x98 => (Tya, Implied, 2),

        _ => return OpcodeDescriptor::ILLEGAL,
    };
    OpcodeDescriptor::new(m, mode, cycles)
}
