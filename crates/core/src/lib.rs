//! MOS 6502 instruction-execution core.
//!
//! The crate models the CPU only: registers, flags, the 256-entry opcode
//! table, addressing modes, instruction semantics and cycle counts. Hosts
//! provide memory through [`cpu_6502::Memory6502`] and drive the core one
//! instruction at a time.

pub mod config;
pub mod cpu_6502;
pub mod logging;

pub use config::{ConfigError, CpuConfig};
pub use cpu_6502::{ArrayMemory, Cpu6502, CpuError, CpuState, Memory6502, Variant};

/// A CPU-like component that can be stepped; returns cycles consumed.
pub trait Cpu {
    type Error: std::error::Error + Send + Sync + 'static;

    fn reset(&mut self);
    fn step(&mut self) -> Result<u32, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_opcode() {
        let err = CpuError::IllegalOpcode {
            opcode: 0x02,
            pc: 0xC000,
        };
        assert_eq!(err.to_string(), "illegal opcode $02 at $C000");
        let err = CpuError::Halted {
            opcode: 0xFF,
            pc: 0x0010,
        };
        assert!(err.to_string().contains("reset required"));
    }

    #[test]
    fn cpu_error_is_boxable() {
        fn boxed() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let mut cpu = Cpu6502::new(ArrayMemory::new());
            cpu.memory.load_program(0x0400, &[0x02]);
            Cpu::reset(&mut cpu);
            Cpu::step(&mut cpu)?;
            Ok(())
        }
        assert!(boxed().is_err());
    }
}
