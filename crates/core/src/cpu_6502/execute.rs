//! Instruction semantics, one routine per mnemonic.
//!
//! Every routine works on an already-resolved [`EffectiveLocation`] and goes
//! through the memory interface for operand reads and write-backs. The only
//! cycles accounted for here are the branch-taken penalties; everything else
//! is charged by the execution loop from the opcode table.

use super::addressing::{pages_differ, EffectiveLocation};
use super::opcodes::Mnemonic;
use super::state::{
    read_u16, CpuState, BREAK, CARRY, DECIMAL, INTERRUPT_DISABLE, IRQ_VECTOR, NEGATIVE, OVERFLOW,
    UNUSED, ZERO,
};
use super::Memory6502;
use crate::logging::{log, LogCategory, LogLevel};

#[inline]
fn read_operand<M: Memory6502 + ?Sized>(
    cpu: &CpuState,
    memory: &M,
    location: EffectiveLocation,
) -> u8 {
    match location {
        EffectiveLocation::Accumulator => cpu.a,
        EffectiveLocation::Address(addr) => memory.read(addr),
        EffectiveLocation::Implied => 0,
    }
}

#[inline]
fn write_operand<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &mut M,
    location: EffectiveLocation,
    v: u8,
) {
    match location {
        EffectiveLocation::Accumulator => cpu.a = v,
        EffectiveLocation::Address(addr) => memory.write(addr, v),
        EffectiveLocation::Implied => {}
    }
}

#[inline]
fn target(location: EffectiveLocation) -> u16 {
    match location {
        EffectiveLocation::Address(addr) => addr,
        _ => 0,
    }
}

/// Execute `mnemonic` against `location`. Returns the cycles spent on top of
/// the opcode's base cost (only branches add any).
pub fn execute<M: Memory6502 + ?Sized>(
    mnemonic: Mnemonic,
    location: EffectiveLocation,
    cpu: &mut CpuState,
    memory: &mut M,
) -> u32 {
    match mnemonic {
        // Loads and stores
        Mnemonic::Lda => {
            cpu.a = read_operand(cpu, memory, location);
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Ldx => {
            cpu.x = read_operand(cpu, memory, location);
            cpu.set_zero_and_negative(cpu.x);
        }
        Mnemonic::Ldy => {
            cpu.y = read_operand(cpu, memory, location);
            cpu.set_zero_and_negative(cpu.y);
        }
        Mnemonic::Sta => {
            let v = cpu.a;
            write_operand(cpu, memory, location, v);
        }
        Mnemonic::Stx => {
            let v = cpu.x;
            write_operand(cpu, memory, location, v);
        }
        Mnemonic::Sty => {
            let v = cpu.y;
            write_operand(cpu, memory, location, v);
        }

        // Register transfers
        Mnemonic::Tax => {
            cpu.x = cpu.a;
            cpu.set_zero_and_negative(cpu.x);
        }
        Mnemonic::Tay => {
            cpu.y = cpu.a;
            cpu.set_zero_and_negative(cpu.y);
        }
        Mnemonic::Txa => {
            cpu.a = cpu.x;
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Tya => {
            cpu.a = cpu.y;
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Tsx => {
            cpu.x = cpu.sp;
            cpu.set_zero_and_negative(cpu.x);
        }
        // TXS leaves the flags alone
        Mnemonic::Txs => cpu.sp = cpu.x,

        // Stack
        Mnemonic::Pha => cpu.push_u8(memory, cpu.a),
        Mnemonic::Php => cpu.push_u8(memory, cpu.status | BREAK | UNUSED),
        Mnemonic::Pla => {
            cpu.a = cpu.pop_u8(memory);
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Plp => cpu.status = cpu.pop_u8(memory),

        // Logic
        Mnemonic::And => {
            let m = read_operand(cpu, memory, location);
            cpu.a &= m;
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Ora => {
            let m = read_operand(cpu, memory, location);
            cpu.a |= m;
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Eor => {
            let m = read_operand(cpu, memory, location);
            cpu.a ^= m;
            cpu.set_zero_and_negative(cpu.a);
        }
        Mnemonic::Bit => {
            let m = read_operand(cpu, memory, location);
            cpu.set_flag(ZERO, (cpu.a & m) == 0);
            cpu.set_flag(OVERFLOW, (m & 0x40) != 0);
            cpu.set_flag(NEGATIVE, (m & 0x80) != 0);
        }

        // Arithmetic
        Mnemonic::Adc => {
            let m = read_operand(cpu, memory, location);
            adc(cpu, m);
        }
        Mnemonic::Sbc => {
            let m = read_operand(cpu, memory, location);
            sbc(cpu, m);
        }
        Mnemonic::Cmp => {
            let m = read_operand(cpu, memory, location);
            let reg = cpu.a;
            compare(cpu, reg, m);
        }
        Mnemonic::Cpx => {
            let m = read_operand(cpu, memory, location);
            let reg = cpu.x;
            compare(cpu, reg, m);
        }
        Mnemonic::Cpy => {
            let m = read_operand(cpu, memory, location);
            let reg = cpu.y;
            compare(cpu, reg, m);
        }

        // Increments and decrements
        Mnemonic::Inc => {
            let v = read_operand(cpu, memory, location).wrapping_add(1);
            write_operand(cpu, memory, location, v);
            cpu.set_zero_and_negative(v);
        }
        Mnemonic::Dec => {
            let v = read_operand(cpu, memory, location).wrapping_sub(1);
            write_operand(cpu, memory, location, v);
            cpu.set_zero_and_negative(v);
        }
        Mnemonic::Inx => {
            cpu.x = cpu.x.wrapping_add(1);
            cpu.set_zero_and_negative(cpu.x);
        }
        Mnemonic::Iny => {
            cpu.y = cpu.y.wrapping_add(1);
            cpu.set_zero_and_negative(cpu.y);
        }
        Mnemonic::Dex => {
            cpu.x = cpu.x.wrapping_sub(1);
            cpu.set_zero_and_negative(cpu.x);
        }
        Mnemonic::Dey => {
            cpu.y = cpu.y.wrapping_sub(1);
            cpu.set_zero_and_negative(cpu.y);
        }

        // Shifts and rotates: flags come from the shifted value
        Mnemonic::Asl => {
            let old = read_operand(cpu, memory, location);
            let res = old << 1;
            write_operand(cpu, memory, location, res);
            cpu.set_flag(CARRY, (old & 0x80) != 0);
            cpu.set_zero_and_negative(res);
        }
        Mnemonic::Lsr => {
            let old = read_operand(cpu, memory, location);
            let res = old >> 1;
            write_operand(cpu, memory, location, res);
            cpu.set_flag(CARRY, (old & 0x01) != 0);
            cpu.set_zero_and_negative(res);
        }
        Mnemonic::Rol => {
            let old = read_operand(cpu, memory, location);
            let res = (old << 1) | cpu.carry();
            write_operand(cpu, memory, location, res);
            cpu.set_flag(CARRY, (old & 0x80) != 0);
            cpu.set_zero_and_negative(res);
        }
        Mnemonic::Ror => {
            let old = read_operand(cpu, memory, location);
            let res = (old >> 1) | (cpu.carry() << 7);
            write_operand(cpu, memory, location, res);
            cpu.set_flag(CARRY, (old & 0x01) != 0);
            cpu.set_zero_and_negative(res);
        }

        // Jumps and calls
        Mnemonic::Jmp => cpu.pc = target(location),
        Mnemonic::Jsr => {
            // pc is past the operand; push the address of JSR's last byte
            let ret = cpu.pc.wrapping_sub(1);
            cpu.push_u16(memory, ret);
            cpu.pc = target(location);
        }
        Mnemonic::Rts => {
            let ret = cpu.pop_u16(memory);
            cpu.pc = ret.wrapping_add(1);
        }

        // Branches
        Mnemonic::Bcc => return branch(cpu, memory, location, CARRY, false),
        Mnemonic::Bcs => return branch(cpu, memory, location, CARRY, true),
        Mnemonic::Beq => return branch(cpu, memory, location, ZERO, true),
        Mnemonic::Bne => return branch(cpu, memory, location, ZERO, false),
        Mnemonic::Bmi => return branch(cpu, memory, location, NEGATIVE, true),
        Mnemonic::Bpl => return branch(cpu, memory, location, NEGATIVE, false),
        Mnemonic::Bvs => return branch(cpu, memory, location, OVERFLOW, true),
        Mnemonic::Bvc => return branch(cpu, memory, location, OVERFLOW, false),

        // Flag changes
        Mnemonic::Clc => cpu.set_flag(CARRY, false),
        Mnemonic::Sec => cpu.set_flag(CARRY, true),
        Mnemonic::Cli => cpu.set_flag(INTERRUPT_DISABLE, false),
        Mnemonic::Sei => cpu.set_flag(INTERRUPT_DISABLE, true),
        Mnemonic::Cld => cpu.set_flag(DECIMAL, false),
        Mnemonic::Sed => cpu.set_flag(DECIMAL, true),
        Mnemonic::Clv => cpu.set_flag(OVERFLOW, false),

        // System
        Mnemonic::Brk => {
            let brk_pc = cpu.pc.wrapping_sub(1);
            // BRK carries a padding byte, so the return address skips it
            let ret = cpu.pc.wrapping_add(1);
            cpu.push_u16(memory, ret);
            cpu.push_u8(memory, cpu.status | BREAK | UNUSED);
            cpu.set_flag(INTERRUPT_DISABLE, true);
            cpu.pc = read_u16(memory, IRQ_VECTOR);
            log(LogCategory::Interrupts, LogLevel::Debug, || {
                format!(
                    "CPU: BRK at PC={:04X}, pushed {:04X}, jumping to {:04X}",
                    brk_pc, ret, cpu.pc
                )
            });
        }
        Mnemonic::Rti => {
            cpu.status = cpu.pop_u8(memory);
            cpu.pc = cpu.pop_u16(memory);
            log(LogCategory::Interrupts, LogLevel::Debug, || {
                format!("CPU: RTI to {:04X}, status={:02X}", cpu.pc, cpu.status)
            });
        }
        Mnemonic::Nop => {}

        // The execution loop rejects illegal opcodes before they get here
        Mnemonic::Illegal => {}
    }
    0
}

/// Take a relative branch when `flag` reads as `when`. One cycle for the
/// branch, one more if the target lies on a different page from the
/// following instruction.
fn branch<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &M,
    location: EffectiveLocation,
    flag: u8,
    when: bool,
) -> u32 {
    if cpu.flag(flag) != when {
        return 0;
    }
    let offset = read_operand(cpu, memory, location) as i8;
    let next = cpu.pc;
    cpu.pc = next.wrapping_add(offset as i16 as u16);
    if pages_differ(next, cpu.pc) {
        2
    } else {
        1
    }
}

fn compare(cpu: &mut CpuState, reg: u8, m: u8) {
    cpu.set_flag(CARRY, reg >= m);
    cpu.set_zero_and_negative(reg.wrapping_sub(m));
}

/// Add with carry. Binary unless decimal mode is active on an NMOS part.
pub fn adc(cpu: &mut CpuState, m: u8) {
    if cpu.decimal_active() {
        adc_decimal(cpu, m);
        return;
    }
    let a = cpu.a;
    let sum = a as u16 + m as u16 + cpu.carry() as u16;
    let result = sum as u8;
    cpu.set_flag(CARRY, sum > 0xFF);
    // overflow: operands share a sign that the result does not
    cpu.set_flag(OVERFLOW, ((a ^ result) & (m ^ result) & 0x80) != 0);
    cpu.a = result;
    cpu.set_zero_and_negative(result);
}

/// Subtract with borrow: `A = A - M - (1 - C)`.
pub fn sbc(cpu: &mut CpuState, m: u8) {
    if cpu.decimal_active() {
        sbc_decimal(cpu, m);
        return;
    }
    let a = cpu.a;
    let sum = a as u16 + (!m) as u16 + cpu.carry() as u16;
    let result = sum as u8;
    cpu.set_flag(CARRY, sum > 0xFF);
    cpu.set_flag(OVERFLOW, ((a ^ m) & (a ^ result) & 0x80) != 0);
    cpu.a = result;
    cpu.set_zero_and_negative(result);
}

/// NMOS BCD addition. Z reflects the binary sum, N and V the intermediate
/// result before the high-nibble adjust.
fn adc_decimal(cpu: &mut CpuState, m: u8) {
    let a = cpu.a;
    let c = cpu.carry() as u16;
    let binary = (a as u16 + m as u16 + c) as u8;

    let mut lo = (a & 0x0F) as u16 + (m & 0x0F) as u16 + c;
    let mut hi = (a >> 4) as u16 + (m >> 4) as u16;
    if lo > 0x09 {
        lo += 0x06;
    }
    if lo > 0x0F {
        hi += 1;
    }
    let intermediate = ((hi << 4) & 0xFF) as u8;
    cpu.set_flag(ZERO, binary == 0);
    cpu.set_flag(NEGATIVE, (intermediate & 0x80) != 0);
    cpu.set_flag(OVERFLOW, ((a ^ intermediate) & !(a ^ m) & 0x80) != 0);
    if hi > 0x09 {
        hi += 0x06;
    }
    cpu.set_flag(CARRY, hi > 0x0F);
    cpu.a = (((hi << 4) | (lo & 0x0F)) & 0xFF) as u8;
}

/// NMOS BCD subtraction. Flags follow the binary subtraction.
fn sbc_decimal(cpu: &mut CpuState, m: u8) {
    let a = cpu.a;
    let borrow = 1 - cpu.carry() as i16;
    let binary = a as u16 + (!m) as u16 + cpu.carry() as u16;
    let binary_result = binary as u8;

    let mut lo = (a & 0x0F) as i16 - (m & 0x0F) as i16 - borrow;
    let mut hi = (a >> 4) as i16 - (m >> 4) as i16;
    if lo < 0 {
        lo -= 0x06;
        hi -= 1;
    }
    if hi < 0 {
        hi -= 0x06;
    }

    cpu.set_flag(CARRY, binary > 0xFF);
    cpu.set_flag(OVERFLOW, ((a ^ m) & (a ^ binary_result) & 0x80) != 0);
    cpu.set_zero_and_negative(binary_result);
    cpu.a = ((hi << 4) | (lo & 0x0F)) as u8;
}
