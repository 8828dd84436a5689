use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_6502::cpu_6502::{self, disassemble, Cpu6502, CpuState, Memory6502};

/// Flat RAM with a small loop at $8000
struct BenchMemory {
    ram: Vec<u8>,
}

impl BenchMemory {
    fn new() -> Self {
        let mut ram = vec![0; 0x10000];
        ram[0xFFFC] = 0x00;
        ram[0xFFFD] = 0x80;

        let program = [
            0xA9, 0x42, // LDA #$42
            0x8D, 0x00, 0x20, // STA $2000
            0xA2, 0x10, // LDX #$10
            0xA0, 0x20, // LDY #$20
            0xE8, // INX
            0xC8, // INY
            0xCA, // DEX
            0x88, // DEY
            0x69, 0x01, // ADC #$01
            0xBD, 0xF0, 0x20, // LDA $20F0,X (crosses a page)
            0xB1, 0x10, // LDA ($10),Y
            0x4C, 0x00, 0x80, // JMP $8000
        ];
        ram[0x8000..0x8000 + program.len()].copy_from_slice(&program);
        ram[0x0010] = 0xF0;
        ram[0x0011] = 0x30;

        Self { ram }
    }
}

impl Memory6502 for BenchMemory {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.ram[addr as usize] = val;
    }
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_step");

    group.bench_function("single_instruction", |b| {
        let mut cpu = Cpu6502::new(BenchMemory::new());
        cpu.reset();
        b.iter(|| {
            black_box(cpu.step().ok());
        });
    });

    group.bench_function("free_function", |b| {
        let mut mem = BenchMemory::new();
        let mut state = CpuState::init(&mem);
        b.iter(|| {
            black_box(cpu_6502::step(&mut state, &mut mem).ok());
        });
    });

    group.finish();
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_multiple_steps");

    for step_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let mut cpu = Cpu6502::new(BenchMemory::new());
                    cpu.reset();
                    for _ in 0..count {
                        let _ = cpu.step();
                    }
                    black_box(cpu.cycles);
                });
            },
        );
    }

    group.finish();
}

fn bench_cpu_frame(c: &mut Criterion) {
    c.bench_function("cpu_6502_ntsc_frame", |b| {
        let mut cpu = Cpu6502::new(BenchMemory::new());
        cpu.reset();
        b.iter(|| {
            black_box(cpu.run_frame().ok());
        });
    });
}

fn bench_disassemble(c: &mut Criterion) {
    let mem = BenchMemory::new();
    c.bench_function("cpu_6502_disassemble", |b| {
        b.iter(|| {
            let mut addr = 0x8000u16;
            while addr < 0x8018 {
                let (text, len) = disassemble(&mem, addr);
                black_box(text);
                addr += len as u16;
            }
        });
    });
}

criterion_group!(
    benches,
    bench_cpu_step,
    bench_cpu_multiple_steps,
    bench_cpu_frame,
    bench_disassemble
);
criterion_main!(benches);
