use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use std::fmt::Write as _;
use std::path::Path;

use z80_disasm::{disassemble_range, load_raw_bin};
use z80mon::disasm::fmt_bytes;
use z80mon::parser::parse_unsigned;
use z80mon::{CodecConfig, Z80Decoder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Z80 disassembler CLI", long_about=None)]
struct Cli {
    /// Load address for the binary in target address space
    #[arg(long, default_value = "0", value_parser = parse_addr)]
    base: u16,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: String,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Documented opcodes only
    #[arg(long)]
    strict: bool,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded segments (single segment for a raw .bin)
    Sections,
    /// Disassemble a range [start, end) in bytes
    Range {
        /// Start address ($hex, &octal, %binary, 0x-hex or decimal)
        start: String,
        /// End address, exclusive; $10000 reaches the top of memory
        end: String,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Monitor-style literals, plus `0x` hex as the shell-friendly spelling.
fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return Ok(u32::from_str_radix(hex, 16)?);
    }
    if s.eq_ignore_ascii_case("$10000") {
        return Ok(0x1_0000);
    }
    parse_unsigned(s)
        .map(u32::from)
        .ok_or_else(|| anyhow::anyhow!("bad address: {s}"))
}

fn parse_addr(s: &str) -> Result<u16, String> {
    parse_u32(s)
        .ok()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| format!("bad address: {s}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut img = load_raw_bin(Path::new(&cli.input), cli.base, cli.skip, cli.len)?;
    let cfg = if cli.strict { CodecConfig::strict() } else { CodecConfig::default() };

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<6} {:<6} {:<6} {:<6}", "name", "start", "end", "perms", "kind");
            for s in &img.segments {
                println!("{:<10} ${:04X}  ${:04X}  {:<6} {:<6}", s.name, s.base, s.end(), s.perms, s.kind);
            }
        }
        Command::Range { start, end, show_bytes, format, out } => {
            let start = parse_u32(&start)?;
            let end = parse_u32(&end)?;
            anyhow::ensure!(start <= 0xFFFF, "start must be below $10000");
            anyhow::ensure!(end >= start && end <= 0x1_0000, "end must be in [start, $10000]");

            let lines = disassemble_range(&mut img, &Z80Decoder::new(cfg), start as u16, end);
            let buf = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&lines)? + "\n",
                OutputFormat::Text => {
                    let mut buf = String::new();
                    for line in &lines {
                        if show_bytes {
                            let _ = writeln!(buf, "{:04X}:  {:<12} {}", line.addr, fmt_bytes(&line.bytes), line.text);
                        } else {
                            let _ = writeln!(buf, "{:04X}:  {}", line.addr, line.text);
                        }
                    }
                    buf
                }
            };
            if let Some(path) = out { std::fs::write(path, buf)?; } else { print!("{}", buf); }
        }
    }
    Ok(())
}
