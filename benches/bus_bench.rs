// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Hot-path benchmarks for the DSi bus
//!
//! Set `DSIRX_BENCH_PROFILE=ci` for a short run.

use criterion::{criterion_group, criterion_main, Criterion};
use dsirx::core::memory::Bus;
use dsirx::Cpu;
use std::hint::black_box;
use std::time::Duration;

fn criterion_config() -> Criterion {
    match std::env::var("DSIRX_BENCH_PROFILE").as_deref() {
        Ok("ci") => Criterion::default()
            .warm_up_time(Duration::from_millis(150))
            .measurement_time(Duration::from_millis(400))
            .sample_size(20),
        _ => Criterion::default()
            .warm_up_time(Duration::from_secs(1))
            .measurement_time(Duration::from_secs(2))
            .sample_size(50),
    }
}

/// Bus with every bank A segment mapped into a four-slot ARM9 window
fn mapped_bus() -> Bus {
    let mut bus = Bus::new();
    bus.write32(Cpu::Arm9, 0x0400_4054, 0x0040_3000);
    bus.write32(Cpu::Arm9, 0x0400_4040, 0x8C88_8480);
    bus
}

fn bench_nwram(c: &mut Criterion) {
    let mut bus = mapped_bus();

    c.bench_function("nwram_read32_mapped", |b| {
        let mut addr = 0x0300_0000u32;
        b.iter(|| {
            addr = 0x0300_0000 | (addr.wrapping_add(0x1004) & 0x3_FFFC);
            black_box(bus.read32(Cpu::Arm9, black_box(addr)))
        })
    });

    c.bench_function("nwram_write32_mapped", |b| {
        let mut addr = 0x0300_0000u32;
        b.iter(|| {
            addr = 0x0300_0000 | (addr.wrapping_add(0x1004) & 0x3_FFFC);
            bus.write32(Cpu::Arm9, black_box(addr), black_box(addr));
        })
    });

    c.bench_function("nwram_read8_window_miss", |b| {
        b.iter(|| black_box(bus.read8(Cpu::Arm7, black_box(0x0300_1234))))
    });
}

fn bench_io(c: &mut Criterion) {
    let mut bus = mapped_bus();

    c.bench_function("io_read32_mbk", |b| {
        b.iter(|| black_box(bus.read32(Cpu::Arm7, black_box(0x0400_4044))))
    });

    c.bench_function("io_write8_descriptor", |b| {
        let mut toggle = false;
        b.iter(|| {
            toggle = !toggle;
            let value = if toggle { 0x80 } else { 0x8C };
            bus.write8(Cpu::Arm9, black_box(0x0400_4040), value);
        })
    });

    c.bench_function("io_read16_console_id", |b| {
        b.iter(|| black_box(bus.read16(Cpu::Arm7, black_box(0x0400_4D02))))
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_nwram, bench_io
}
criterion_main!(benches);
