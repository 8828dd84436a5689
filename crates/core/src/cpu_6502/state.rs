//! Architectural register state of the 6502.
//!
//! `CpuState` is a plain owned value. Every operation in the core takes it by
//! `&mut` together with the memory it runs against, so independent CPU
//! instances never share anything.

use serde::{Deserialize, Serialize};

use super::Memory6502;
use crate::config::CpuConfig;

/// Carry flag (bit 0)
pub const CARRY: u8 = 0x01;
/// Zero flag (bit 1)
pub const ZERO: u8 = 0x02;
/// Interrupt disable flag (bit 2)
pub const INTERRUPT_DISABLE: u8 = 0x04;
/// Decimal mode flag (bit 3)
pub const DECIMAL: u8 = 0x08;
/// Break flag (bit 4). Only meaningful in copies pushed to the stack.
pub const BREAK: u8 = 0x10;
/// Unused bit 5. Reads back as 1 in pushed copies.
pub const UNUSED: u8 = 0x20;
/// Overflow flag (bit 6)
pub const OVERFLOW: u8 = 0x40;
/// Negative flag (bit 7)
pub const NEGATIVE: u8 = 0x80;

/// NMI vector ($FFFA-$FFFB)
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector ($FFFC-$FFFD)
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector ($FFFE-$FFFF)
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Base of the hardware stack page.
pub const STACK_BASE: u16 = 0x0100;

/// Which member of the 6502 family is being emulated.
///
/// The only behavioral difference modelled is decimal mode: the NMOS part
/// performs BCD arithmetic in ADC/SBC when D is set, the NES's Ricoh 2A03
/// tracks the flag but always adds in binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Nmos,
    #[serde(rename = "ricoh2a03")]
    Ricoh2A03,
}

/// The processor's registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    /// Accumulator register
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (points to 0x0100 + sp)
    pub sp: u8,
    /// Status register (NV-BDIZC)
    pub status: u8,
    /// Program counter
    pub pc: u16,
    #[serde(default)]
    pub variant: Variant,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuState {
    /// Power-on register values with `pc` at zero. Tests that place code at
    /// address 0 can use this directly instead of [`CpuState::init`].
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            status: 0,
            pc: 0,
            variant: Variant::Nmos,
        }
    }

    /// Registers as they stand after reset: `pc` comes from the reset vector.
    pub fn init<M: Memory6502 + ?Sized>(memory: &M) -> Self {
        let mut cpu = Self::new();
        cpu.pc = read_u16(memory, RESET_VECTOR);
        cpu
    }

    /// Apply the CPU-related parts of a configuration.
    pub fn with_config(mut self, config: &CpuConfig) -> Self {
        self.variant = config.variant;
        self
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        (self.status & mask) != 0
    }

    #[inline]
    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    #[inline]
    pub fn carry(&self) -> u8 {
        self.status & CARRY
    }

    /// Set Z and N from a result byte.
    #[inline]
    pub fn set_zero_and_negative(&mut self, v: u8) {
        self.set_flag(ZERO, v == 0);
        self.set_flag(NEGATIVE, (v & 0x80) != 0);
    }

    /// Whether ADC/SBC should use BCD arithmetic right now.
    #[inline]
    pub fn decimal_active(&self) -> bool {
        self.variant == Variant::Nmos && self.flag(DECIMAL)
    }

    #[inline]
    pub fn push_u8<M: Memory6502 + ?Sized>(&mut self, memory: &mut M, v: u8) {
        memory.write(STACK_BASE | self.sp as u16, v);
        self.sp = self.sp.wrapping_sub(1);
    }

    #[inline]
    pub fn pop_u8<M: Memory6502 + ?Sized>(&mut self, memory: &M) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        memory.read(STACK_BASE | self.sp as u16)
    }

    #[inline]
    pub fn push_u16<M: Memory6502 + ?Sized>(&mut self, memory: &mut M, v: u16) {
        self.push_u8(memory, (v >> 8) as u8);
        self.push_u8(memory, v as u8);
    }

    #[inline]
    pub fn pop_u16<M: Memory6502 + ?Sized>(&mut self, memory: &M) -> u16 {
        let lo = self.pop_u8(memory) as u16;
        let hi = self.pop_u8(memory) as u16;
        (hi << 8) | lo
    }

    /// Read the byte at `pc` and advance `pc`.
    #[inline]
    pub fn fetch_u8<M: Memory6502 + ?Sized>(&mut self, memory: &M) -> u8 {
        let v = memory.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        v
    }

    #[inline]
    pub fn fetch_u16<M: Memory6502 + ?Sized>(&mut self, memory: &M) -> u16 {
        let lo = self.fetch_u8(memory) as u16;
        let hi = self.fetch_u8(memory) as u16;
        (hi << 8) | lo
    }

    /// Render the status register as `NV-BDIZC`, upper case for set bits.
    pub fn flags_string(&self) -> String {
        const NAMES: [(u8, char); 8] = [
            (NEGATIVE, 'N'),
            (OVERFLOW, 'V'),
            (UNUSED, '-'),
            (BREAK, 'B'),
            (DECIMAL, 'D'),
            (INTERRUPT_DISABLE, 'I'),
            (ZERO, 'Z'),
            (CARRY, 'C'),
        ];
        NAMES
            .iter()
            .map(|&(mask, c)| {
                if self.flag(mask) {
                    c
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    }
}

/// Little-endian 16-bit read that wraps at $FFFF.
pub fn read_u16<M: Memory6502 + ?Sized>(memory: &M, addr: u16) -> u16 {
    let lo = memory.read(addr) as u16;
    let hi = memory.read(addr.wrapping_add(1)) as u16;
    (hi << 8) | lo
}
