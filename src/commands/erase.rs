//! Erase command implementation

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use spinor_core::flash::{EraseStatus, JedecSpiFlash, NvmDevice};
use spinor_core::transport::BusTransport;

fn spinner(msg: String) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Erase the sectors covering `[start, start + length]`
pub fn run_erase<D: NvmDevice>(
    device: &mut D,
    start: u32,
    length: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !device.is_valid_range(start, length as u64) {
        return Err(format!(
            "Erase range 0x{:08X}+0x{:X} is outside chip bounds (0x{:08X})",
            start,
            length,
            device.capacity()
        )
        .into());
    }

    let pb = spinner(format!("Erasing 0x{:08X}+0x{:X}...", start, length))?;
    device.erase(start, length)?;
    pb.finish_with_message(format!("Erased sectors covering 0x{:08X}+0x{:X}", start, length));
    Ok(())
}

/// Erase the whole chip
pub fn run_mass_erase<D: NvmDevice>(device: &mut D) -> Result<(), Box<dyn std::error::Error>> {
    let total = device.capacity();
    let pb = spinner(format!("Erasing {} bytes (this may take a while)...", total))?;
    device.mass_erase()?;
    pb.finish_with_message(format!("Erased {} bytes", total));
    Ok(())
}

/// Erase `[start, end]` one tick at a time
pub fn run_erase_async<B: BusTransport>(
    flash: &mut JedecSpiFlash<B>,
    start: u32,
    end: u32,
    tick: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if start > end || end as u64 >= flash.capacity() {
        return Err(format!(
            "Erase range 0x{:08X}..=0x{:08X} is outside chip bounds (0x{:08X})",
            start,
            end,
            flash.capacity()
        )
        .into());
    }

    flash.erase_begin(start, end)?;
    let first = flash.erase_cursor().map_or(start as u64, |c| c.current);
    let pb = ProgressBar::new(end as u64 + 1 - first);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ticks: {msg}")?
            .progress_chars("#>-"),
    );

    let mut ticks = 0u64;
    loop {
        ticks += 1;
        match flash.erase_tick()? {
            EraseStatus::Finished => break,
            EraseStatus::InProgress => {
                if let Some(cursor) = flash.erase_cursor() {
                    pb.set_position(cursor.current.min(end as u64 + 1) - first);
                }
                pb.set_message(ticks.to_string());
                std::thread::sleep(tick);
            }
        }
    }

    pb.finish_with_message(format!("{} (done)", ticks));
    log::info!("Async erase finished after {} ticks", ticks);
    Ok(())
}
