//! List commands implementation

use spinor_core::chip::ChipDatabase;

/// List all known chips
pub fn list_chips(db: &ChipDatabase, vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<10} {:<14} {:>8} {:>9} {:>9} {:>6}",
        "Vendor", "Name", "Size", "Sector", "JEDEC ID", "Addr"
    );
    println!("{}", "-".repeat(61));

    for chip in db.iter() {
        if let Some(vendor) = vendor_filter {
            if !chip.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        let d = &chip.descriptor;
        println!(
            "{:<10} {:<14} {:>8} {:>9} {:>9} {:>5}B",
            chip.vendor,
            chip.name,
            format_size(d.capacity()),
            format_size(d.sector_size as u64),
            format!("{:02X} {:04X}", chip.jedec_manufacturer, chip.jedec_device),
            d.address_width.bytes()
        );
    }
}

/// Human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
