//! Info and write protection commands

use spinor_core::chip::ChipDatabase;

use super::list::format_size;
use super::session::Session;

/// Run the info command
pub fn run_info(session: &mut Session, db: &ChipDatabase) -> Result<(), Box<dyn std::error::Error>> {
    let info = session.flash.get_info()?;
    let [mfr, hi, lo] = info.identification;
    let device = u16::from_be_bytes([hi, lo]);

    println!("Flash Chip Information");
    println!("======================");
    println!();
    println!("Image:           {}", session.image().display());
    println!("Configured:      {} {}", session.entry.vendor, session.entry.name);
    match db.find_by_jedec_id(mfr, device) {
        Some(found) => println!("Detected:        {} {}", found.vendor, found.name),
        None => println!("Detected:        unknown part"),
    }
    println!(
        "JEDEC ID:        {:02X} {:04X} (bank {})",
        mfr, device, info.manufacturer_bank
    );
    println!(
        "Size:            {} bytes ({})",
        info.capacity(),
        format_size(info.capacity())
    );
    println!(
        "Sectors:         {} x {}",
        info.sector_count,
        format_size(info.sector_size as u64)
    );

    let d = &session.entry.descriptor;
    println!("Page size:       {} bytes (alignment {})", d.page_size, d.page_alignment);
    println!("Address bytes:   {}", d.address_width.bytes());
    println!("Program opcode:  0x{:02X}", d.opcode_page_program);
    if d.has_sector_erase() {
        println!("Sector erase:    0x{:02X}", d.opcode_sector_erase);
    } else {
        println!("Sector erase:    emulated");
    }
    if d.has_block_erase() {
        println!(
            "Block erase:     0x{:02X} ({})",
            d.opcode_block_erase,
            format_size(d.block_size as u64)
        );
    }
    if d.has_chip_erase() {
        println!("Chip erase:      0x{:02X}", d.opcode_chip_erase);
    }
    Ok(())
}

/// Set or clear all block protection bits
pub fn run_protect(session: &mut Session, protect: bool) -> Result<(), Box<dyn std::error::Error>> {
    if protect {
        session.flash.write_protect()?;
    } else {
        session.flash.write_unprotect()?;
    }
    if let Some(status) = session.status() {
        println!("Status register: 0x{:02X} ({:?})", status.bits(), status);
    }
    Ok(())
}
