//! MOS 6502 CPU core implementation
//!
//! A generic 6502 instruction-execution core that any host (NES, Atari 2600,
//! Apple II, test harnesses) can drive by implementing [`Memory6502`].
//!
//! The core is split the way an instruction flows through it:
//!
//! * [`opcodes`]: the 256-entry decode table
//! * [`addressing`]: operand location resolution
//! * [`execute`]: instruction semantics
//! * [`engine`]: the fetch-decode-execute loop, interrupts and run helpers
//! * [`disasm`]: disassembly and trace formatting
//!
//! The free functions in [`engine`] work on a bare [`CpuState`] plus memory.
//! [`Cpu6502`] bundles the two with a cycle counter and halts on illegal
//! opcodes until reset.

pub mod addressing;
pub mod disasm;
pub mod engine;
pub mod execute;
pub mod opcodes;
pub mod state;

use serde_json::{json, Value};

use crate::config::CpuConfig;
use crate::logging::{log, LogCategory, LogLevel};

pub use addressing::EffectiveLocation;
pub use disasm::{disassemble, trace_line};
pub use engine::{
    irq, nmi, run_cycles, run_until, run_until_any, step, ExecPhase, NTSC_CYCLES_PER_FRAME,
};
pub use opcodes::{decode, AddressingMode, Mnemonic, OpcodeDescriptor, OPCODE_TABLE};
pub use state::{CpuState, Variant};

/// Memory interface trait for the 6502 CPU
///
/// Hosts must implement this trait to provide memory access. Reads take
/// `&self`; hosts that need read side effects (I/O registers) use interior
/// mutability.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u16, val: u8);
}

/// Errors raised while executing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    #[error("CPU halted on illegal opcode ${opcode:02X} at ${pc:04X}; reset required")]
    Halted { opcode: u8, pc: u16 },
}

/// A 6502 bound to its memory, with a running cycle count.
#[derive(Debug)]
pub struct Cpu6502<M: Memory6502> {
    /// Register state
    pub state: CpuState,
    /// Total cycles executed since reset
    pub cycles: u64,
    /// Memory interface
    pub memory: M,
    phase: ExecPhase,
    /// Opcode and address that stopped the CPU
    halted_on: Option<(u8, u16)>,
}

impl<M: Memory6502> Cpu6502<M> {
    /// Create a new 6502 CPU with the given memory interface. Registers hold
    /// power-on values until [`Cpu6502::reset`] loads the reset vector.
    pub fn new(memory: M) -> Self {
        Self {
            state: CpuState::new(),
            cycles: 0,
            memory,
            phase: ExecPhase::Ready,
            halted_on: None,
        }
    }

    /// Create a CPU configured for a particular variant.
    pub fn with_config(memory: M, config: &CpuConfig) -> Self {
        let mut cpu = Self::new(memory);
        cpu.state = cpu.state.with_config(config);
        cpu
    }

    /// Reset the CPU to initial state (preserves memory and variant)
    pub fn reset(&mut self) {
        let variant = self.state.variant;
        self.state = CpuState::init(&self.memory);
        self.state.variant = variant;
        self.cycles = 0;
        self.phase = ExecPhase::Ready;
        self.halted_on = None;
        log(LogCategory::CPU, LogLevel::Debug, || {
            format!("CPU: reset, PC={:04X}", self.state.pc)
        });
    }

    /// Replace the memory interface while preserving CPU state
    pub fn with_memory<N: Memory6502>(self, new_memory: N) -> Cpu6502<N> {
        Cpu6502 {
            state: self.state,
            cycles: self.cycles,
            memory: new_memory,
            phase: self.phase,
            halted_on: self.halted_on,
        }
    }

    pub fn phase(&self) -> ExecPhase {
        self.phase
    }

    pub fn is_halted(&self) -> bool {
        self.phase == ExecPhase::Halted
    }

    pub fn a(&self) -> u8 {
        self.state.a
    }

    pub fn x(&self) -> u8 {
        self.state.x
    }

    pub fn y(&self) -> u8 {
        self.state.y
    }

    pub fn sp(&self) -> u8 {
        self.state.sp
    }

    pub fn status(&self) -> u8 {
        self.state.status
    }

    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    /// Execute a single instruction and return the cycles it took.
    ///
    /// An illegal opcode stops the CPU: the first call returns
    /// [`CpuError::IllegalOpcode`] and every later call returns
    /// [`CpuError::Halted`] until [`Cpu6502::reset`].
    pub fn step(&mut self) -> Result<u32, CpuError> {
        if let Some((opcode, pc)) = self.halted_on {
            return Err(CpuError::Halted { opcode, pc });
        }
        match engine::step_phased(&mut self.state, &mut self.memory, &mut self.phase) {
            Ok(cycles) => {
                self.cycles += cycles as u64;
                Ok(cycles)
            }
            Err(err) => {
                if let CpuError::IllegalOpcode { opcode, pc } = err {
                    self.halted_on = Some((opcode, pc));
                }
                self.phase = ExecPhase::Halted;
                log(LogCategory::CPU, LogLevel::Debug, || {
                    format!("CPU: halted after {} cycles: {}", self.cycles, err)
                });
                Err(err)
            }
        }
    }

    /// Step until `pc == target`; returns the cycles consumed.
    pub fn run_until(&mut self, target: u16) -> Result<u64, CpuError> {
        let mut total = 0u64;
        while self.state.pc != target {
            total += self.step()? as u64;
        }
        Ok(total)
    }

    /// Step until `pc` reaches any of `breakpoints`.
    pub fn run_until_any(&mut self, breakpoints: &[u16]) -> Result<u64, CpuError> {
        let mut total = 0u64;
        while !breakpoints.contains(&self.state.pc) {
            total += self.step()? as u64;
        }
        Ok(total)
    }

    /// Step until at least `budget` cycles have run.
    pub fn run_cycles(&mut self, budget: u64) -> Result<u64, CpuError> {
        let mut total = 0u64;
        while total < budget {
            total += self.step()? as u64;
        }
        Ok(total)
    }

    /// Run one NTSC frame's worth of cycles.
    pub fn run_frame(&mut self) -> Result<u64, CpuError> {
        self.run_cycles(NTSC_CYCLES_PER_FRAME)
    }

    /// Trigger a Non-Maskable Interrupt. Returns the cycles taken.
    pub fn trigger_nmi(&mut self) -> u32 {
        let cycles = engine::nmi(&mut self.state, &mut self.memory);
        self.cycles += cycles as u64;
        cycles
    }

    /// Request a maskable interrupt. Returns 0 when masked by I.
    pub fn trigger_irq(&mut self) -> u32 {
        let cycles = engine::irq(&mut self.state, &mut self.memory);
        self.cycles += cycles as u64;
        cycles
    }

    /// Disassemble the instruction at `addr`.
    pub fn disassemble(&self, addr: u16) -> (String, u8) {
        disassemble(&self.memory, addr)
    }

    /// Snapshot of registers and execution status for debuggers.
    pub fn debug_state(&self) -> Value {
        let (next, _) = self.disassemble(self.state.pc);
        json!({
            "a": self.state.a,
            "x": self.state.x,
            "y": self.state.y,
            "sp": self.state.sp,
            "pc": self.state.pc,
            "status": self.state.status,
            "flags": self.state.flags_string(),
            "variant": self.state.variant,
            "cycles": self.cycles,
            "phase": self.phase,
            "next": next,
        })
    }
}

impl<M: Memory6502> crate::Cpu for Cpu6502<M> {
    type Error = CpuError;

    fn reset(&mut self) {
        Cpu6502::reset(self)
    }

    fn step(&mut self) -> Result<u32, CpuError> {
        Cpu6502::step(self)
    }
}

/// Simple array-based memory implementation for testing
#[derive(Debug, Clone)]
pub struct ArrayMemory {
    pub data: Box<[u8; 0x10000]>,
}

impl ArrayMemory {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 0x10000]),
        }
    }

    /// Load a program into memory and point the reset vector at it.
    ///
    /// Bytes past $FFFF are dropped.
    pub fn load_program(&mut self, offset: u16, data: &[u8]) {
        let off = offset as usize;
        let len = data.len().min(0x10000 - off);
        self.data[off..off + len].copy_from_slice(&data[..len]);
        let [lo, hi] = offset.to_le_bytes();
        self.data[0xFFFC] = lo;
        self.data[0xFFFD] = hi;
    }
}

impl Default for ArrayMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for ArrayMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }
}
