//! Read and write commands

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use spinor_core::flash::NvmDevice;

/// Transfer size per driver call
const CHUNK_SIZE: usize = 4096;

fn progress_bar(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Read `[start, start + len)` with a progress bar
pub fn read_with_progress<D: NvmDevice>(
    device: &mut D,
    start: u32,
    len: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; len];
    let pb = progress_bar(len as u64)?;

    let mut offset = 0usize;
    while offset < len {
        let chunk_size = std::cmp::min(CHUNK_SIZE, len - offset);
        device.read(start + offset as u32, &mut data[offset..offset + chunk_size])?;
        offset += chunk_size;
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}

/// Run the read command
pub fn run_read<D: NvmDevice>(
    device: &mut D,
    output: &Path,
    start: u32,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let len = match length {
        Some(len) => len as u64,
        None => device.capacity().saturating_sub(start as u64),
    };
    if !device.is_valid_range(start, len) {
        return Err(format!(
            "Read range 0x{:08X}+0x{:X} is outside chip bounds (0x{:08X})",
            start,
            len,
            device.capacity()
        )
        .into());
    }

    let data = read_with_progress(device, start, len as usize)?;
    fs::write(output, &data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Run the write command
pub fn run_write<D: NvmDevice>(
    device: &mut D,
    input: &Path,
    start: u32,
    erase: bool,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    if data.is_empty() {
        println!("{:?} is empty, nothing to write", input);
        return Ok(());
    }
    if !device.is_valid_range(start, data.len() as u64) {
        return Err(format!(
            "{} bytes at 0x{:08X} do not fit the chip (0x{:08X})",
            data.len(),
            start,
            device.capacity()
        )
        .into());
    }

    if erase {
        log::info!("Erasing sectors under 0x{:08X}+0x{:X}", start, data.len());
        device.erase(start, data.len() as u32)?;
    }

    let pb = progress_bar(data.len() as u64)?;
    for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
        device.write(start + (i * CHUNK_SIZE) as u32, chunk)?;
        pb.inc(chunk.len() as u64);
    }
    device.sync()?;
    pb.finish_with_message("Write complete");

    if verify {
        let readback = read_with_progress(device, start, data.len())?;
        if let Some(pos) = readback.iter().zip(&data).position(|(a, b)| a != b) {
            return Err(format!(
                "Verification failed at 0x{:08X}: expected 0x{:02X}, found 0x{:02X}",
                start as usize + pos,
                data[pos],
                readback[pos]
            )
            .into());
        }
        println!("Verified {} bytes", data.len());
    }

    println!("Wrote {} bytes at 0x{:08X}", data.len(), start);
    Ok(())
}
