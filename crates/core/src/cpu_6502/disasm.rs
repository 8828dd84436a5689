//! One-instruction disassembler and trace-line formatter.

use super::opcodes::{decode, AddressingMode};
use super::state::CpuState;
use super::Memory6502;

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the instruction length in bytes. Bytes that are
/// not a documented opcode render as `.byte $nn` with length 1.
pub fn disassemble<M: Memory6502 + ?Sized>(memory: &M, addr: u16) -> (String, u8) {
    let opcode = memory.read(addr);
    let desc = decode(opcode);
    if desc.is_illegal() {
        return (format!(".byte ${:02X}", opcode), 1);
    }

    let b1 = memory.read(addr.wrapping_add(1));
    let b2 = memory.read(addr.wrapping_add(2));
    let word = u16::from_le_bytes([b1, b2]);
    let name = desc.mnemonic.name();

    let text = match desc.addressing_mode {
        AddressingMode::Implied => name.to_string(),
        AddressingMode::Accumulator => format!("{} A", name),
        AddressingMode::Immediate => format!("{} #${:02X}", name, b1),
        AddressingMode::ZeroPage => format!("{} ${:02X}", name, b1),
        AddressingMode::ZeroPageX => format!("{} ${:02X},X", name, b1),
        AddressingMode::ZeroPageY => format!("{} ${:02X},Y", name, b1),
        AddressingMode::Absolute => format!("{} ${:04X}", name, word),
        AddressingMode::AbsoluteX => format!("{} ${:04X},X", name, word),
        AddressingMode::AbsoluteY => format!("{} ${:04X},Y", name, word),
        AddressingMode::Indirect => format!("{} (${:04X})", name, word),
        AddressingMode::IndexedIndirect => format!("{} (${:02X},X)", name, b1),
        AddressingMode::IndirectIndexed => format!("{} (${:02X}),Y", name, b1),
        AddressingMode::Relative => {
            let target = addr.wrapping_add(2).wrapping_add(b1 as i8 as u16);
            format!("{} ${:04X}", name, target)
        }
    };
    (text, desc.length)
}

/// Format a single trace line for the instruction at `cpu.pc`, in the
/// column layout common to 6502 reference logs:
///
/// `C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD`
pub fn trace_line<M: Memory6502 + ?Sized>(cpu: &CpuState, memory: &M) -> String {
    let (text, len) = disassemble(memory, cpu.pc);
    let bytes: Vec<String> = (0..len as u16)
        .map(|i| format!("{:02X}", memory.read(cpu.pc.wrapping_add(i))))
        .collect();
    format!(
        "{:04X}  {:<8}  {:<32}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
        cpu.pc,
        bytes.join(" "),
        text,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status,
        cpu.sp
    )
}
