//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "spinor")]
#[command(author, version, about = "JEDEC SPI NOR flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Chip database directory or file (.ron), added to the built-in chips
    /// Defaults to ./chips/vendors/ when present
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    /// Driver configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flash device selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Flash image backing the emulated chip (created erased if missing)
    #[arg(short, long)]
    pub image: PathBuf,

    /// Chip name
    #[arg(short, long, default_value = "W25Q32")]
    pub chip: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show chip identification and geometry
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read flash contents to file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (default: up to the end of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short = 'f', long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Erase the covered sectors first
        #[arg(long)]
        erase: bool,

        /// Verify after writing
        #[arg(long)]
        verify: bool,
    },

    /// Erase the sectors covering a range
    Erase {
        #[command(flatten)]
        device: DeviceArgs,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Length of region to erase (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        length: u32,
    },

    /// Erase the whole chip
    MassErase {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Erase a range with the tick-driven erase
    EraseAsync {
        #[command(flatten)]
        device: DeviceArgs,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Last address to erase, inclusive
        #[arg(long, value_parser = parse_hex_u32)]
        end: u32,

        /// Tick period in milliseconds
        #[arg(long, default_value = "1")]
        tick_ms: u64,
    },

    /// Set all block protection bits
    Protect {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Clear all block protection bits
    Unprotect {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// List supported chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}
