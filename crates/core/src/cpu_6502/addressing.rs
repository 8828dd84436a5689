//! Addressing-mode resolution.
//!
//! Resolution reads the operand bytes at `pc`, advances `pc` past them and
//! yields an [`EffectiveLocation`]. Executors then go through the memory
//! interface for every operand access; nothing here hands out references
//! into the backing memory.

use super::opcodes::AddressingMode;
use super::state::CpuState;
use super::Memory6502;

/// Where an instruction's operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveLocation {
    /// No operand
    Implied,
    /// The accumulator register
    Accumulator,
    /// A memory address. For Immediate this is the address of the operand
    /// byte itself; for Relative it is the address of the displacement.
    Address(u16),
}

/// Result of resolving one addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub location: EffectiveLocation,
    /// Set when indexing moved the address onto a different page
    pub page_crossed: bool,
}

impl Resolved {
    #[inline]
    fn at(addr: u16) -> Self {
        Self {
            location: EffectiveLocation::Address(addr),
            page_crossed: false,
        }
    }

    #[inline]
    fn indexed(base: u16, addr: u16) -> Self {
        Self {
            location: EffectiveLocation::Address(addr),
            page_crossed: pages_differ(base, addr),
        }
    }

    /// The extra cycle this resolution may cost (0 or 1).
    #[inline]
    pub fn extra_cycles(&self) -> u32 {
        self.page_crossed as u32
    }
}

#[inline]
pub fn pages_differ(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}

/// Read a 16-bit pointer stored in page zero. The high byte wraps within
/// the page.
#[inline]
fn read_zero_page_u16<M: Memory6502 + ?Sized>(memory: &M, ptr: u8) -> u16 {
    let lo = memory.read(ptr as u16) as u16;
    let hi = memory.read(ptr.wrapping_add(1) as u16) as u16;
    (hi << 8) | lo
}

/// Read the JMP ($nnnn) target with the 6502 page-wrapping bug.
#[inline]
fn read_indirect_u16_bug<M: Memory6502 + ?Sized>(memory: &M, addr: u16) -> u16 {
    let lo = memory.read(addr) as u16;
    let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
    let hi = memory.read(hi_addr) as u16;
    (hi << 8) | lo
}

/// Compute the operand location for `mode`, consuming operand bytes at `pc`.
pub fn resolve<M: Memory6502 + ?Sized>(
    mode: AddressingMode,
    cpu: &mut CpuState,
    memory: &M,
) -> Resolved {
    match mode {
        AddressingMode::Implied => Resolved {
            location: EffectiveLocation::Implied,
            page_crossed: false,
        },
        AddressingMode::Accumulator => Resolved {
            location: EffectiveLocation::Accumulator,
            page_crossed: false,
        },
        AddressingMode::Immediate | AddressingMode::Relative => {
            let addr = cpu.pc;
            cpu.pc = cpu.pc.wrapping_add(1);
            Resolved::at(addr)
        }
        AddressingMode::ZeroPage => {
            let zp = cpu.fetch_u8(memory);
            Resolved::at(zp as u16)
        }
        AddressingMode::ZeroPageX => {
            let zp = cpu.fetch_u8(memory).wrapping_add(cpu.x);
            Resolved::at(zp as u16)
        }
        AddressingMode::ZeroPageY => {
            let zp = cpu.fetch_u8(memory).wrapping_add(cpu.y);
            Resolved::at(zp as u16)
        }
        AddressingMode::Absolute => {
            let addr = cpu.fetch_u16(memory);
            Resolved::at(addr)
        }
        AddressingMode::AbsoluteX => {
            let base = cpu.fetch_u16(memory);
            Resolved::indexed(base, base.wrapping_add(cpu.x as u16))
        }
        AddressingMode::AbsoluteY => {
            let base = cpu.fetch_u16(memory);
            Resolved::indexed(base, base.wrapping_add(cpu.y as u16))
        }
        AddressingMode::Indirect => {
            let ptr = cpu.fetch_u16(memory);
            Resolved::at(read_indirect_u16_bug(memory, ptr))
        }
        AddressingMode::IndexedIndirect => {
            let ptr = cpu.fetch_u8(memory).wrapping_add(cpu.x);
            Resolved::at(read_zero_page_u16(memory, ptr))
        }
        AddressingMode::IndirectIndexed => {
            let ptr = cpu.fetch_u8(memory);
            let base = read_zero_page_u16(memory, ptr);
            Resolved::indexed(base, base.wrapping_add(cpu.y as u16))
        }
    }
}
