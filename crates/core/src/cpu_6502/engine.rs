//! Fetch-decode-execute loop, interrupt entry and the run helpers built on
//! top of `step`.

use super::addressing::resolve;
use super::disasm::trace_line;
use super::execute::execute;
use super::opcodes::decode;
use super::state::{read_u16, CpuState, BREAK, INTERRUPT_DISABLE, IRQ_VECTOR, NMI_VECTOR, UNUSED};
use super::{CpuError, Memory6502};
use crate::logging::{log, LogCategory, LogLevel};

/// CPU cycles in one NTSC NES frame (1.789773 MHz / 60.0988 Hz).
pub const NTSC_CYCLES_PER_FRAME: u64 = 29_780;

/// Cycles taken to enter an interrupt handler.
pub const INTERRUPT_CYCLES: u32 = 7;

/// Where the execution loop is within an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum ExecPhase {
    /// Between instructions
    #[default]
    Ready,
    Fetching,
    Resolving,
    Executing,
    /// Stopped on an illegal opcode until the next reset
    Halted,
}

/// Execute exactly one instruction and return the cycles it took, penalties
/// included.
///
/// On an illegal opcode `pc` is left pointing at the offending byte.
pub fn step<M: Memory6502 + ?Sized>(cpu: &mut CpuState, memory: &mut M) -> Result<u32, CpuError> {
    let mut phase = ExecPhase::Ready;
    step_phased(cpu, memory, &mut phase)
}

pub(crate) fn step_phased<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &mut M,
    phase: &mut ExecPhase,
) -> Result<u32, CpuError> {
    *phase = ExecPhase::Fetching;
    let pc = cpu.pc;
    log(LogCategory::CPU, LogLevel::Trace, || trace_line(cpu, &*memory));

    let opcode = cpu.fetch_u8(memory);
    let desc = decode(opcode);
    if desc.is_illegal() {
        cpu.pc = pc;
        *phase = ExecPhase::Halted;
        log(LogCategory::Decode, LogLevel::Error, || {
            format!(
                "ILLEGAL OPCODE: pc=0x{:04X} op=0x{:02X} a=0x{:02X} x=0x{:02X} y=0x{:02X} sp=0x{:02X} p=0x{:02X}",
                pc, opcode, cpu.a, cpu.x, cpu.y, cpu.sp, cpu.status
            )
        });
        return Err(CpuError::IllegalOpcode { opcode, pc });
    }

    *phase = ExecPhase::Resolving;
    let resolved = resolve(desc.addressing_mode, cpu, &*memory);

    *phase = ExecPhase::Executing;
    let mut cycles = desc.base_cycles as u32;
    if desc.page_penalty {
        cycles += resolved.extra_cycles();
    }
    cycles += execute(desc.mnemonic, resolved.location, cpu, memory);

    *phase = ExecPhase::Ready;
    Ok(cycles)
}

/// Step until `pc == target`. Returns the cycles consumed.
///
/// The check happens before each step, so a target equal to the current
/// `pc` returns immediately. An unreachable target loops forever; that is
/// the caller's contract to uphold.
pub fn run_until<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &mut M,
    target: u16,
) -> Result<u64, CpuError> {
    let mut total = 0u64;
    while cpu.pc != target {
        total += step(cpu, memory)? as u64;
    }
    Ok(total)
}

/// Step until `pc` lands on any of `breakpoints`.
pub fn run_until_any<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &mut M,
    breakpoints: &[u16],
) -> Result<u64, CpuError> {
    let mut total = 0u64;
    while !breakpoints.contains(&cpu.pc) {
        total += step(cpu, memory)? as u64;
    }
    log(LogCategory::CPU, LogLevel::Debug, || {
        format!("CPU: breakpoint hit at PC={:04X} after {} cycles", cpu.pc, total)
    });
    Ok(total)
}

/// Step until at least `budget` cycles have been consumed, e.g. one video
/// frame's worth. The last instruction may overshoot the budget.
pub fn run_cycles<M: Memory6502 + ?Sized>(
    cpu: &mut CpuState,
    memory: &mut M,
    budget: u64,
) -> Result<u64, CpuError> {
    let mut total = 0u64;
    while total < budget {
        total += step(cpu, memory)? as u64;
    }
    Ok(total)
}

fn enter_interrupt<M: Memory6502 + ?Sized>(cpu: &mut CpuState, memory: &mut M, vector: u16) {
    let ret = cpu.pc;
    cpu.push_u16(memory, ret);
    // hardware interrupts push B clear
    cpu.push_u8(memory, (cpu.status & !BREAK) | UNUSED);
    cpu.set_flag(INTERRUPT_DISABLE, true);
    cpu.pc = read_u16(memory, vector);
}

/// Service a non-maskable interrupt. Always taken.
pub fn nmi<M: Memory6502 + ?Sized>(cpu: &mut CpuState, memory: &mut M) -> u32 {
    let from = cpu.pc;
    enter_interrupt(cpu, memory, NMI_VECTOR);
    log(LogCategory::Interrupts, LogLevel::Debug, || {
        format!("CPU: NMI at PC={:04X}, jumping to {:04X}", from, cpu.pc)
    });
    INTERRUPT_CYCLES
}

/// Service a maskable interrupt. Returns 0 and does nothing while the
/// interrupt-disable flag is set.
pub fn irq<M: Memory6502 + ?Sized>(cpu: &mut CpuState, memory: &mut M) -> u32 {
    if cpu.flag(INTERRUPT_DISABLE) {
        return 0;
    }
    let from = cpu.pc;
    enter_interrupt(cpu, memory, IRQ_VECTOR);
    log(LogCategory::Interrupts, LogLevel::Debug, || {
        format!("CPU: IRQ at PC={:04X}, jumping to {:04X}", from, cpu.pc)
    });
    INTERRUPT_CYCLES
}
