//! Co-simulated RTC runner.
//!
//! This binary provides a single entry point for driving the peripheral
//! without a host emulator around it. It performs:
//! 1. **Run:** Build the system from JSON configuration, advance simulated
//!    time while polling the device, and dump the register file at the end.
//! 2. **Snapshot exercise:** Optionally restore device state before the run
//!    and save it afterwards.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::{fs, process};

use cosim_core::Config;
use cosim_core::snapshot::DeviceSnapshot;
use cosim_core::soc::System;
use cosim_core::time::ManualClock;

/// Virtual-time slice per poll iteration (1 ms).
const POLL_SLICE_NS: u64 = 1_000_000;

/// Register offsets dumped after a run, with display names.
const DUMP_REGS: [(&str, u64); 6] = [
    ("DATA", 0x00),
    ("MATCH", 0x04),
    ("CONTROL", 0x0C),
    ("INT_MASK", 0x10),
    ("RAW_STATUS", 0x14),
    ("MASKED_STATUS", 0x18),
];

#[derive(Parser, Debug)]
#[command(
    name = "cosim",
    version,
    about = "Co-simulated scriptable RTC peripheral runner",
    long_about = "Drive the RTC peripheral and its model script for a stretch of simulated time.\n\nConfiguration is JSON (see cosim_core::Config). Diagnostics go through the\ntracing subscriber; set RUST_LOG to adjust verbosity (e.g. RUST_LOG=script=debug).\n\nExamples:\n  cosim run --script demos/rtc_model.py --seconds 10\n  cosim run --config cosim.json --save-state rtc.snap\n  cosim run --load-state rtc.snap --seconds 5"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the peripheral for a stretch of simulated time.
    Run {
        /// JSON configuration file (defaults are used when omitted).
        #[arg(short, long)]
        config: Option<String>,

        /// Model script path (overrides the configured path).
        #[arg(short, long)]
        script: Option<String>,

        /// Simulated seconds to run.
        #[arg(long, default_value_t = 5)]
        seconds: u64,

        /// Restore device state from this snapshot before running.
        #[arg(long)]
        load_state: Option<String>,

        /// Save device state to this snapshot after running.
        #[arg(long)]
        save_state: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            script,
            seconds,
            load_state,
            save_state,
        } => cmd_run(config, script, seconds, load_state, save_state),
    }
}

/// Loads configuration, builds the system, and runs the poll loop.
///
/// Bring-up failures (missing script, broken initialization contract) abort
/// with exit code 1; steady-state script faults are diagnostics only.
fn cmd_run(
    config_path: Option<String>,
    script: Option<String>,
    seconds: u64,
    load_state: Option<String>,
    save_state: Option<String>,
) {
    let mut config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("Error reading config {path}: {e}");
                process::exit(1);
            });
            Config::from_json(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {path}: {e}");
                process::exit(1);
            })
        }
        None => Config::default(),
    };
    if let Some(path) = script {
        config.script.path = path;
    }

    let clock = ManualClock::seeded_from_host();
    let mut system = System::new(&config, clock.clone()).unwrap_or_else(|e| {
        eprintln!("Error bringing up the device: {e}");
        process::exit(1);
    });

    println!(
        "Configuration: script={} base={:#x} migrate_tick_offset={}",
        config.script.path, config.system.device_base, config.rtc.migrate_tick_offset
    );

    if let Some(path) = load_state {
        restore_state(&mut system, &path);
        println!("[*] Restored device state from {path}");
    }

    let total_ns = seconds * cosim_core::time::NANOS_PER_SEC;
    let mut elapsed_ns = 0u64;
    while elapsed_ns < total_ns {
        clock.advance(POLL_SLICE_NS);
        elapsed_ns += POLL_SLICE_NS;
        system.poll();
    }

    println!("\n[*] {seconds} simulated second(s) elapsed");
    for (name, offset) in DUMP_REGS {
        let value = system.bus.read_u32(config.system.device_base + offset);
        println!("  {name:<14}{value:#010x}");
    }

    if let Some(path) = save_state {
        let Some(snapshot) = system.rtc_snapshot_mut() else {
            eprintln!("Error: device exposes no snapshot state");
            process::exit(1);
        };
        let bytes = snapshot.save_state();
        fs::File::create(&path)
            .and_then(|mut f| f.write_all(&bytes))
            .unwrap_or_else(|e| {
                eprintln!("Error writing snapshot {path}: {e}");
                process::exit(1);
            });
        println!("[*] Saved device state to {path} ({} bytes)", bytes.len());
    }
}

/// Restores device state from a snapshot file, exiting on any failure.
fn restore_state(system: &mut System, path: &str) {
    let bytes = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error reading snapshot {path}: {e}");
        process::exit(1);
    });
    let Some(snapshot) = system.rtc_snapshot_mut() else {
        eprintln!("Error: device exposes no snapshot state");
        process::exit(1);
    };
    if let Err(e) = snapshot.load_state(&bytes) {
        eprintln!("Error restoring snapshot {path}: {e}");
        process::exit(1);
    }
}
