use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dotmatrix_core::{Emulator, EmulatorOptionsBuilder};

/// A busy-loop ROM: increments a counter in WRAM forever while the PPU and
/// APU run along.
fn busy_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x150..0x157].copy_from_slice(&[
        0x21, 0x00, 0xC0, // LD HL,0xC000
        0x34, // INC (HL)
        0x18, 0xFD, // JR -3
        0x00,
    ]);
    rom
}

fn emulate_frame_benchmark(c: &mut Criterion) {
    let mut emulator = Emulator::new(&busy_rom(), EmulatorOptionsBuilder::new().build()).unwrap();

    c.bench_function("emulate one frame", |b| {
        b.iter(|| {
            black_box(emulator.run(70224));
        })
    });
}

criterion_group!(benches, emulate_frame_benchmark);
criterion_main!(benches);
