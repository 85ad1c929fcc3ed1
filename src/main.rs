//! spinor - JEDEC SPI NOR flash tool
//!
//! Drives the `spinor-core` driver against an emulated chip whose contents
//! live in an image file. Every command loads the image, runs the driver
//! operation and writes the image back.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use spinor_core::chip::ChipDatabase;
use spinor_core::flash::DriverConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("Loaded {} chip definitions", db.len());

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { device } => {
            let mut session = Session::open(&device, &db, config)?;
            commands::run_info(&mut session, &db)
        }
        Commands::Read {
            device,
            output,
            start,
            length,
        } => {
            let mut session = Session::open(&device, &db, config)?;
            commands::run_read(&mut session.flash, &output, start, length)
        }
        Commands::Write {
            device,
            input,
            start,
            erase,
            verify,
        } => {
            let mut session = Session::open(&device, &db, config)?;
            let result = commands::run_write(&mut session.flash, &input, start, erase, verify);
            session.save()?;
            result
        }
        Commands::Erase {
            device,
            start,
            length,
        } => {
            let mut session = Session::open(&device, &db, config)?;
            let result = commands::run_erase(&mut session.flash, start, length);
            session.save()?;
            result
        }
        Commands::MassErase { device } => {
            let mut session = Session::open(&device, &db, config)?;
            let result = commands::run_mass_erase(&mut session.flash);
            session.save()?;
            result
        }
        Commands::EraseAsync {
            device,
            start,
            end,
            tick_ms,
        } => {
            let mut session = Session::open(&device, &db, config)?;
            let result = commands::run_erase_async(
                &mut session.flash,
                start,
                end,
                Duration::from_millis(tick_ms),
            );
            session.save()?;
            result
        }
        Commands::Protect { device } => {
            let mut session = Session::open(&device, &db, config)?;
            commands::run_protect(&mut session, true)
        }
        Commands::Unprotect { device } => {
            let mut session = Session::open(&device, &db, config)?;
            commands::run_protect(&mut session, false)
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(&db, vendor.as_deref());
            Ok(())
        }
    }
}

/// Built-in chips plus the database at `path` or the default location
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn std::error::Error>> {
    let mut db = ChipDatabase::with_builtin();

    if let Some(path) = path {
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        }
    } else {
        let dir = PathBuf::from("chips/vendors");
        if dir.is_dir() {
            match db.load_dir(&dir) {
                Ok(count) => log::debug!("Loaded {} chips from {}", count, dir.display()),
                Err(e) => log::warn!("Failed to load chips from {}: {}", dir.display(), e),
            }
        }
    }

    Ok(db)
}

/// Driver configuration from `path`, or the defaults
fn load_config(path: Option<&Path>) -> Result<DriverConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(DriverConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    let config = DriverConfig::from_toml(&text)
        .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
    log::debug!("Driver config: {:?}", config);
    Ok(config)
}
