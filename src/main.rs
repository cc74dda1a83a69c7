use std::fs::File;
use std::num::ParseIntError;
use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::Local;
use clap::Parser;
use log::{debug, info};
use rvv_core_sim::config::SimulatorConfig;
use rvv_core_sim::extract_file::ExtractFile;
use rvv_core_sim::sim::memory::MemoryImage;
use rvv_core_sim::sim::register::RegisterView;
use rvv_core_sim::sim::{writes_vector_register, Simulator, DEMO_AVL, DEMO_BASE, DEMO_PROGRAM};
use simplelog::*;

/// Hex string to u64, `0x` prefix optional.
fn parse_hex(s: &str) -> Result<u64, ParseIntError> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(s, 16)
}

fn parse_number(s: &str) -> Result<u64, ParseIntError> {
    if s.starts_with("0x") || s.starts_with("0X") {
        parse_hex(s)
    } else {
        s.parse()
    }
}

/// `xN=VALUE`, value decimal or `0x` hex.
fn parse_scalar(s: &str) -> anyhow::Result<(u8, u64)> {
    let (reg, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected xN=VALUE, got {s:?}"))?;
    let index: u8 = reg
        .trim()
        .strip_prefix('x')
        .ok_or_else(|| anyhow!("register {reg:?} must be written as xN"))?
        .parse()
        .with_context(|| format!("bad register number in {s:?}"))?;
    if index >= 32 {
        return Err(anyhow!("register x{index} out of range"));
    }
    let value = parse_number(value.trim()).with_context(|| format!("bad value in {s:?}"))?;
    Ok((index, value))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Program to run: RISC-V ELF or hex text, one word per line
    #[arg(short, long, required_unless_present = "demo")]
    input: Option<String>,

    /// Path to configuration file (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Start address of the ELF region to simulate (hex)
    #[arg(short, long, value_parser = parse_hex)]
    start_addr: Option<u64>,

    /// End address of the ELF region to simulate (hex)
    #[arg(short, long, value_parser = parse_hex)]
    end_addr: Option<u64>,

    /// Binary file preloaded at address 0 of the memory image
    #[arg(short, long)]
    memory: Option<String>,

    /// Scalar register preset, e.g. x1=8 or x4=0x100 (repeatable)
    #[arg(long = "scalar", value_parser = parse_scalar)]
    scalars: Vec<(u8, u64)>,

    /// Run the built-in configure / vadd.vi / vse16 / vle8 sequence
    #[arg(long)]
    demo: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(program_path: &str, verbose: bool) -> anyhow::Result<()> {
    let program_name = Path::new(program_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    // YYYYMMDD_HHMMSS
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let log_dir = Path::new("log");
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let log_filename = format!("log/sim_{}_{}.log", program_name, timestamp);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(&log_filename)?),
    ])?;

    println!("Log file created: {}", log_filename);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let program_name = if args.demo { "demo" } else { args.input.as_deref().unwrap_or("unknown") };
    init_logger(program_name, args.verbose)?;

    let config = match &args.config {
        Some(path) => SimulatorConfig::load_from_file(path)?,
        None => SimulatorConfig::default(),
    };
    debug!("Simulator config: {:?}", config);

    let memory = match &args.memory {
        Some(path) => {
            let contents = ExtractFile::load_memory_image(path)?;
            MemoryImage::with_contents(config.memory.size_bytes, &contents)
                .with_context(|| format!("Failed to preload memory from {path}"))?
        }
        None => MemoryImage::new(config.memory.size_bytes),
    };

    let program = match (&args.input, args.demo) {
        (_, true) => DEMO_PROGRAM.to_vec(),
        (Some(path), false) => {
            debug!("the start_addr is {:x?}, end_addr is {:x?}", args.start_addr, args.end_addr);
            ExtractFile::load_program(path, args.start_addr, args.end_addr)?
        }
        (None, false) => return Err(anyhow!("either --input or --demo is required")),
    };
    info!("{} instruction words loaded", program.len());

    let mut sim = Simulator::with_memory(config, memory);
    sim.power_on_reset()?;

    if args.demo {
        sim.core_mut().write_scalar(1, DEMO_AVL);
        sim.core_mut().write_scalar(4, DEMO_BASE);
    }
    for (reg, value) in &args.scalars {
        debug!("x{reg} <- 0x{value:x}");
        sim.core_mut().write_scalar(*reg, *value);
    }

    sim.load_instructions(program);

    let completions = sim.main_sim_loop(|completion, core| {
        println!("{completion}");
        if writes_vector_register(completion) {
            println!("  result: {}", RegisterView(core.result_view()));
        }
    })?;

    let failed = completions.iter().filter(|c| !c.is_ok()).count();
    let core = sim.core();
    println!(
        "{} instructions, {} failed, {} cycles, vl={} sew={}",
        completions.len(),
        failed,
        core.cycle(),
        core.vector_config().vl(),
        core.vector_config().sew()
    );

    Ok(())
}
