//! End-to-end behavior of the 6502 core through its public API.

use emu_6502::cpu_6502::addressing::{resolve, EffectiveLocation};
use emu_6502::cpu_6502::state::{CARRY, DECIMAL, NEGATIVE, OVERFLOW, ZERO};
use emu_6502::cpu_6502::{self, AddressingMode, ArrayMemory, CpuState, Memory6502, OPCODE_TABLE};
use emu_6502::{Cpu6502, CpuConfig, CpuError, Variant};

/// Program at address 0, registers at power-on values.
fn at_zero(program: &[u8]) -> (CpuState, ArrayMemory) {
    let mut mem = ArrayMemory::new();
    mem.load_program(0x0000, program);
    let cpu = CpuState::init(&mem);
    (cpu, mem)
}

#[test]
fn and_immediate_zero_clears_accumulator() {
    let (mut cpu, mut mem) = at_zero(&[0x29, 0x00]);
    cpu.a = 0xFF;
    cpu_6502::step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.flag(ZERO));
    assert!(!cpu.flag(CARRY));
    assert!(!cpu.flag(NEGATIVE));
    assert!(!cpu.flag(OVERFLOW));
}

#[test]
fn asl_accumulator_shifts_into_carry() {
    let (mut cpu, mut mem) = at_zero(&[0x0A]);
    cpu.a = 0x80;
    cpu_6502::step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.flag(CARRY));
    assert!(cpu.flag(ZERO));
}

#[test]
fn bcc_taken_skips_one_byte() {
    let (mut cpu, mut mem) = at_zero(&[0x90, 0x01]);
    assert_eq!(cpu_6502::step(&mut cpu, &mut mem), Ok(3));
    assert_eq!(cpu.pc, 0x0003);
}

#[test]
fn dec_zero_page_wraps_to_ff() {
    let (mut cpu, mut mem) = at_zero(&[0xC6, 0x02, 0x00]);
    assert_eq!(cpu_6502::step(&mut cpu, &mut mem), Ok(5));
    assert_eq!(mem.read(0x0002), 0xFF);
    assert!(cpu.flag(NEGATIVE));
}

#[test]
fn jmp_absolute() {
    let (mut cpu, mut mem) = at_zero(&[0x4C, 0x03, 0x00, 0xAB]);
    assert_eq!(cpu_6502::step(&mut cpu, &mut mem), Ok(3));
    assert_eq!(cpu.pc, 0x0003);
}

#[test]
fn brk_round_trip_through_irq_vector() {
    let (mut cpu, mut mem) = at_zero(&[0x00]);
    mem.write(0xFFFE, 0xCC);
    mem.write(0xFFFF, 0xBA);
    mem.write(0xBACC, 0x40); // RTI
    cpu.status = CARRY;

    assert_eq!(cpu_6502::step(&mut cpu, &mut mem), Ok(7));
    assert_eq!(cpu.pc, 0xBACC);
    // return address skips the padding byte
    assert_eq!(mem.read(0x01FF), 0x00);
    assert_eq!(mem.read(0x01FE), 0x02);
    assert_eq!(mem.read(0x01FD), CARRY | 0x30);

    assert_eq!(cpu_6502::step(&mut cpu, &mut mem), Ok(6));
    assert_eq!(cpu.pc, 0x0002);
    assert_eq!(cpu.sp, 0xFF);
}

#[test]
fn pha_pla_preserves_sp_and_accumulator() {
    for v in 0..=255u8 {
        // PHA; LDA #$00; PLA
        let (mut cpu, mut mem) = at_zero(&[0x48, 0xA9, 0x00, 0x68]);
        cpu.a = v;
        let cycles = cpu_6502::run_until(&mut cpu, &mut mem, 0x0004).unwrap();
        assert_eq!(cycles, 3 + 2 + 4);
        assert_eq!(cpu.a, v);
        assert_eq!(cpu.sp, 0xFF);
        assert_eq!(cpu.flag(ZERO), v == 0);
        assert_eq!(cpu.flag(NEGATIVE), v & 0x80 != 0);
    }
}

#[test]
fn jsr_rts_returns_to_following_instruction() {
    let mut mem = ArrayMemory::new();
    mem.load_program(0xC000, &[0x20, 0x00, 0xD0, 0xEA]);
    mem.write(0xD000, 0x60);
    let mut cpu = CpuState::init(&mem);
    cpu_6502::step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.pc, 0xD000);
    assert_eq!(cpu.sp, 0xFD);
    cpu_6502::step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.pc, 0xC003);
    assert_eq!(cpu.sp, 0xFF);
}

#[test]
fn adc_then_sbc_restores_accumulator() {
    let mut mem = ArrayMemory::new();
    for a in 0..=255u8 {
        for m in 0..=255u8 {
            for carry_in in [false, true] {
                // CLC/SEC; ADC #m; SEC/CLC; SBC #m
                let (set, undo) = if carry_in { (0x38, 0x18) } else { (0x18, 0x38) };
                mem.load_program(0x0000, &[set, 0x69, m, undo, 0xE9, m]);
                let mut cpu = CpuState::new();
                cpu.a = a;
                cpu_6502::run_until(&mut cpu, &mut mem, 0x0006).unwrap();
                assert_eq!(cpu.a, a, "a={a:02X} m={m:02X} c={carry_in}");
            }
        }
    }
}

#[test]
fn lda_sets_zero_and_negative_from_result() {
    for v in 0..=255u8 {
        let (mut cpu, mut mem) = at_zero(&[0xA9, v]);
        cpu_6502::step(&mut cpu, &mut mem).unwrap();
        assert_eq!(cpu.flag(ZERO), v == 0);
        assert_eq!(cpu.flag(NEGATIVE), v & 0x80 != 0);
    }
}

#[test]
fn increments_wrap_within_a_byte() {
    // INX; INY; DEC $10
    let (mut cpu, mut mem) = at_zero(&[0xE8, 0xC8, 0xC6, 0x10]);
    cpu.x = 0xFF;
    cpu.y = 0xFF;
    cpu_6502::run_until(&mut cpu, &mut mem, 0x0004).unwrap();
    assert_eq!((cpu.x, cpu.y), (0, 0));
    assert_eq!(mem.read(0x0010), 0xFF);
}

#[test]
fn pc_wraps_at_top_of_memory() {
    let mut mem = ArrayMemory::new();
    mem.write(0xFFFF, 0xEA);
    let mut cpu = CpuState::new();
    cpu.pc = 0xFFFF;
    cpu_6502::step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.pc, 0x0000);
}

#[test]
fn page_cross_reported_iff_high_byte_changes() {
    let modes = [AddressingMode::AbsoluteX, AddressingMode::AbsoluteY];
    let mut mem = ArrayMemory::new();
    for base in (0..=0xFFFFu16).step_by(0x3D) {
        for index in [0x00u8, 0x01, 0x7F, 0x80, 0xFF] {
            for mode in modes {
                let [lo, hi] = base.to_le_bytes();
                mem.write(0x0300, lo);
                mem.write(0x0301, hi);
                let mut cpu = CpuState::new();
                cpu.pc = 0x0300;
                cpu.x = index;
                cpu.y = index;
                let r = resolve(mode, &mut cpu, &mem);
                let effective = base.wrapping_add(index as u16);
                assert_eq!(r.location, EffectiveLocation::Address(effective));
                assert_eq!(r.page_crossed, (base & 0xFF00) != (effective & 0xFF00));
            }
        }
    }
}

#[test]
fn read_vs_write_page_penalty() {
    for (opcode, desc) in OPCODE_TABLE.iter().enumerate() {
        if desc.page_penalty {
            assert!(
                matches!(
                    desc.addressing_mode,
                    AddressingMode::AbsoluteX
                        | AddressingMode::AbsoluteY
                        | AddressingMode::IndirectIndexed
                ),
                "opcode {opcode:02X}"
            );
        }
    }
    // STA abs,X never pays; LDA abs,X does
    assert!(!OPCODE_TABLE[0x9D].page_penalty);
    assert!(OPCODE_TABLE[0xBD].page_penalty);
}

#[test]
fn every_legal_opcode_executes() {
    for (opcode, desc) in OPCODE_TABLE.iter().enumerate() {
        if desc.is_illegal() {
            continue;
        }
        let (mut cpu, mut mem) = at_zero(&[opcode as u8, 0x10, 0x02]);
        let cycles = cpu_6502::step(&mut cpu, &mut mem).unwrap();
        assert!(
            cycles >= desc.base_cycles as u32 && cycles <= desc.base_cycles as u32 + 2,
            "opcode {opcode:02X} took {cycles}"
        );
    }
}

#[test]
fn illegal_opcode_halts_wrapper() {
    let mut cpu = Cpu6502::new(ArrayMemory::new());
    cpu.memory.load_program(0x8000, &[0xA9, 0x01, 0x12]);
    cpu.reset();
    let err = cpu.run_until(0x9000).unwrap_err();
    assert_eq!(
        err,
        CpuError::IllegalOpcode {
            opcode: 0x12,
            pc: 0x8002
        }
    );
    assert!(matches!(cpu.step(), Err(CpuError::Halted { .. })));
    assert_eq!(cpu.a(), 0x01);
    assert_eq!(cpu.cycles, 2);
}

#[test]
fn nmi_interrupts_a_running_loop() {
    let mut cpu = Cpu6502::new(ArrayMemory::new());
    // loop: JMP loop ; handler at $9000: INX; RTI
    cpu.memory.load_program(0x8000, &[0x4C, 0x00, 0x80]);
    cpu.memory.write(0x9000, 0xE8);
    cpu.memory.write(0x9001, 0x40);
    cpu.memory.write(0xFFFA, 0x00);
    cpu.memory.write(0xFFFB, 0x90);
    cpu.reset();

    for _ in 0..3 {
        cpu.run_cycles(30).unwrap();
        assert_eq!(cpu.trigger_nmi(), 7);
        cpu.run_until(0x8000).unwrap();
    }
    assert_eq!(cpu.x(), 3);
    assert_eq!(cpu.sp(), 0xFF);
}

#[test]
fn irq_masked_until_cli() {
    let mut cpu = Cpu6502::new(ArrayMemory::new());
    // SEI; NOP; CLI; NOP
    cpu.memory.load_program(0x8000, &[0x78, 0xEA, 0x58, 0xEA]);
    cpu.memory.write(0xFFFE, 0x00);
    cpu.memory.write(0xFFFF, 0xA0);
    cpu.reset();
    cpu.step().unwrap();
    assert_eq!(cpu.trigger_irq(), 0);
    cpu.run_until(0x8003).unwrap();
    assert_eq!(cpu.trigger_irq(), 7);
    assert_eq!(cpu.pc(), 0xA000);
}

#[test]
fn breakpoints_stop_execution() {
    let mut cpu = Cpu6502::new(ArrayMemory::new());
    // LDX #0; loop: INX; CPX #5; BNE loop; BRK
    cpu.memory
        .load_program(0x8000, &[0xA2, 0x00, 0xE8, 0xE0, 0x05, 0xD0, 0xFB, 0x00]);
    cpu.reset();
    cpu.run_until_any(&[0x8007, 0x9000]).unwrap();
    assert_eq!(cpu.x(), 5);
    assert_eq!(cpu.pc(), 0x8007);
    assert_eq!(cpu.disassemble(0x8005), ("BNE $8002".to_string(), 2));
}

#[test]
fn decimal_mode_depends_on_variant() {
    // SED; CLC; LDA #$19; ADC #$28
    let program = [0xF8, 0x18, 0xA9, 0x19, 0x69, 0x28];

    let mut nmos = Cpu6502::new(ArrayMemory::new());
    nmos.memory.load_program(0x8000, &program);
    nmos.reset();
    nmos.run_until(0x8006).unwrap();
    assert_eq!(nmos.a(), 0x47);
    assert!(nmos.status() & DECIMAL != 0);

    let config = CpuConfig::from_json(r#"{ "variant": "ricoh2a03" }"#).unwrap();
    let mut nes = Cpu6502::with_config(ArrayMemory::new(), &config);
    nes.memory.load_program(0x8000, &program);
    nes.reset();
    nes.run_until(0x8006).unwrap();
    assert_eq!(nes.state.variant, Variant::Ricoh2A03);
    assert_eq!(nes.a(), 0x41);
}

#[test]
fn state_snapshots_round_trip_through_json() {
    let mut cpu = Cpu6502::new(ArrayMemory::new());
    cpu.memory.load_program(0x8000, &[0xA9, 0x80, 0xAA]);
    cpu.reset();
    cpu.run_until(0x8003).unwrap();

    let json = serde_json::to_string(&cpu.state).unwrap();
    let restored: CpuState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, cpu.state);
    assert_eq!(restored.x, 0x80);
}
