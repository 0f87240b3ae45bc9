// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! DSIRX probe entry point
//!
//! Builds a bus from a configuration file, applies the boot new-WRAM
//! settings and reports the resulting windows and mapping tables. Reads can
//! be issued on behalf of either CPU to check where an address lands.

use clap::Parser;
use dsirx::core::config::DsiConfig;
use dsirx::core::firmware::FirmwareImage;
use dsirx::core::memory::Bus;
use dsirx::core::nwram::Bank;
use dsirx::Cpu;
use serde::Serialize;
use std::path::PathBuf;

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "DSIRX_CONFIG";

/// Configuration file used when neither flag nor environment names one
const DEFAULT_CONFIG: &str = "dsirx.toml";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    #[value(name = "8")]
    Byte,
    #[value(name = "16")]
    Half,
    #[value(name = "32")]
    Word,
}

#[derive(Parser, Debug)]
#[command(
    name = "dsirx-probe",
    about = "Inspect DSi new-WRAM mappings and probe bus reads"
)]
struct Args {
    /// Configuration file (defaults to $DSIRX_CONFIG, then dsirx.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read an address as a CPU, e.g. arm9:0x03000000 (can repeat)
    #[arg(long, value_name = "CPU:ADDR", value_parser = parse_probe)]
    read: Vec<(Cpu, u32)>,

    /// Access width of --read probes
    #[arg(long, value_enum, default_value = "32")]
    width: Width,

    /// Write a save state of the configured bus to this file
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Emit the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct WindowReport {
    cpu: String,
    bank: char,
    start: u32,
    end: u32,
    mask: u32,
}

#[derive(Serialize)]
struct MappingReport {
    bank: char,
    owner: usize,
    slot: usize,
    segment: u8,
}

#[derive(Serialize)]
struct ReadReport {
    cpu: String,
    addr: u32,
    width: u8,
    value: u32,
}

#[derive(Serialize)]
struct Report {
    console_id: u64,
    write_protect: u32,
    windows: Vec<WindowReport>,
    mappings: Vec<MappingReport>,
    reads: Vec<ReadReport>,
}

/// Parse a `cpu:addr` probe; the address accepts hex (0x prefix) or decimal
fn parse_probe(s: &str) -> Result<(Cpu, u32), String> {
    let (cpu, addr) = s
        .split_once(':')
        .ok_or_else(|| format!("expected CPU:ADDR, got '{}'", s))?;

    let cpu = match cpu.to_ascii_lowercase().as_str() {
        "arm9" | "9" => Cpu::Arm9,
        "arm7" | "7" => Cpu::Arm7,
        other => return Err(format!("unknown CPU '{}'", other)),
    };

    let addr = match addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => addr.parse(),
    }
    .map_err(|e| format!("bad address '{}': {}", addr, e))?;

    Ok((cpu, addr))
}

fn build_bus(config: &DsiConfig) -> Bus {
    let mut bus = Bus::new();
    bus.base_mut()
        .set_firmware(Cpu::Arm9, FirmwareImage::load_or_trap(&config.firmware.arm9));
    bus.base_mut()
        .set_firmware(Cpu::Arm7, FirmwareImage::load_or_trap(&config.firmware.arm7));
    bus.set_console_id(config.console_id);

    match &config.nwram {
        Some(boot) => bus.nwram_mut().apply_boot_settings(&boot.mbk),
        None => log::info!("No boot new-WRAM settings; all windows disabled"),
    }
    bus
}

fn report(bus: &mut Bus, reads: &[(Cpu, u32)], width: Width) -> Report {
    let nwram = bus.nwram();

    let mut windows = Vec::new();
    for cpu in Cpu::ALL {
        for bank in Bank::ALL {
            let window = nwram.window(cpu, bank);
            windows.push(WindowReport {
                cpu: cpu.to_string(),
                bank: bank.letter(),
                start: window.start,
                end: window.end,
                mask: window.mask,
            });
        }
    }

    let mut mappings = Vec::new();
    for bank in Bank::ALL {
        for (owner, slots) in nwram.tables().bank(bank).iter().enumerate() {
            for (slot, segment) in slots.iter().enumerate() {
                if let Some(segment) = *segment {
                    mappings.push(MappingReport {
                        bank: bank.letter(),
                        owner,
                        slot,
                        segment,
                    });
                }
            }
        }
    }

    let console_id = bus.console_id();
    let write_protect = nwram.write_protect();

    let reads = reads
        .iter()
        .map(|&(cpu, addr)| {
            let (width, value) = match width {
                Width::Byte => (8, bus.read8(cpu, addr) as u32),
                Width::Half => (16, bus.read16(cpu, addr) as u32),
                Width::Word => (32, bus.read32(cpu, addr)),
            };
            ReadReport {
                cpu: cpu.to_string(),
                addr,
                width,
                value,
            }
        })
        .collect();

    Report {
        console_id,
        write_protect,
        windows,
        mappings,
        reads,
    }
}

fn print_report(report: &Report) {
    println!("Console ID:    {:016X}", report.console_id);
    println!("Write protect: {:08X}", report.write_protect);

    println!("Windows:");
    for w in &report.windows {
        if w.start >= w.end {
            println!("  {} NWRAM-{}: disabled", w.cpu, w.bank);
        } else {
            println!(
                "  {} NWRAM-{}: {:08X}-{:08X} mask {}",
                w.cpu, w.bank, w.start, w.end, w.mask
            );
        }
    }

    println!("Mappings:");
    if report.mappings.is_empty() {
        println!("  (none)");
    }
    for m in &report.mappings {
        println!(
            "  NWRAM-{} owner {} slot {} <- segment {}",
            m.bank, m.owner, m.slot, m.segment
        );
    }

    for r in &report.reads {
        let digits = (r.width / 4) as usize;
        println!(
            "{} read{} {:08X} = {:0digits$X}",
            r.cpu,
            r.width,
            r.addr,
            r.value,
            digits = digits
        );
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    log::info!("Config path: {}", config_path.display());

    let config = DsiConfig::load_or_default(&config_path);
    let mut bus = build_bus(&config);

    if let Some(path) = &args.save_state {
        std::fs::write(path, bus.save_state()?)?;
        log::info!("Save state written to {}", path.display());
    }

    let report = report(&mut bus, &args.read, args.width);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn main() {
    // Pick up DSIRX_CONFIG and RUST_LOG from a .env file, if present
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe() {
        assert_eq!(parse_probe("arm9:0x03000000"), Ok((Cpu::Arm9, 0x0300_0000)));
        assert_eq!(parse_probe("ARM7:0x0400_4D00"), Ok((Cpu::Arm7, 0x0400_4D00)));
        assert_eq!(parse_probe("7:16"), Ok((Cpu::Arm7, 16)));
        assert!(parse_probe("arm11:0").is_err());
        assert!(parse_probe("0x03000000").is_err());
        assert!(parse_probe("arm9:0xZZ").is_err());
    }

    #[test]
    fn test_report_after_boot_settings() {
        let mut mbk = [0u32; 12];
        mbk[0] = 0x0000_0080;
        mbk[5] = 0x0040_2000;
        let config = DsiConfig {
            nwram: Some(dsirx::core::config::BootNwram { mbk }),
            console_id: 5,
            ..DsiConfig::default()
        };

        let mut bus = build_bus(&config);
        bus.write32(Cpu::Arm9, 0x0300_0000, 0xAABB_CCDD);
        let report = report(&mut bus, &[(Cpu::Arm9, 0x0302_0000)], Width::Word);

        assert_eq!(report.console_id, 5);
        assert_eq!(report.mappings.len(), 1);
        assert_eq!(report.mappings[0].segment, 0);
        assert_eq!(report.reads[0].value, 0xAABB_CCDD);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["windows"][0]["mask"], 1);
    }
}
