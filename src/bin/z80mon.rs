use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use z80mon::parser::parse_unsigned;
use z80mon::{CodecConfig, LinearMemory, Monitor};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Line-oriented Z80 monitor with asm and dasm commands"
)]
struct Opts {
    /// Raw binary to load into the 64 KiB address space
    #[arg(short, long, value_name = "BINFILE")]
    load: Option<String>,
    /// Load address ($hex, &octal, %binary or decimal)
    #[arg(long, default_value = "0", value_parser = parse_addr)]
    base: u16,
    /// Codec configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,
    /// Documented opcodes only; overrides --config
    #[arg(long)]
    strict: bool,
}

fn parse_addr(s: &str) -> Result<u16, String> {
    parse_unsigned(s.trim()).ok_or_else(|| format!("not an address: {s}"))
}

fn load_config(opts: &Opts) -> Result<CodecConfig> {
    if opts.strict {
        return Ok(CodecConfig::strict());
    }
    match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            Ok(serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?)
        }
        None => Ok(CodecConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    let cfg = load_config(&opts)?;

    let mut mem = LinearMemory::new();
    if let Some(path) = &opts.load {
        let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
        mem.load_image(opts.base, &bytes)
            .with_context(|| format!("loading {path}"))?;
        info!(path = %path, base = opts.base, len = bytes.len(), "image loaded");
    }
    let mut mon = Monitor::new(mem, cfg);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    // Pre-filled next command; typed text completes it, an empty line accepts it
    let mut prompt = String::new();
    loop {
        write!(stdout, "{}> ", prompt.trim_end())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if matches!(line, "quit" | "exit") {
            break;
        }
        let cmd = if line.is_empty() {
            prompt.clone()
        } else {
            Monitor::<LinearMemory>::continue_line(&prompt, line)
        };
        if cmd.trim().is_empty() {
            continue;
        }

        let mut out = String::new();
        if let Some(next) = mon.execute(&cmd, &mut out) {
            prompt = next;
        }
        write!(stdout, "{out}")?;
    }
    Ok(())
}
