//! Emulated flash session backed by an image file

use std::path::{Path, PathBuf};

use spinor_core::chip::{ChipDatabase, ChipEntry};
use spinor_core::flash::{DriverConfig, JedecSpiFlash};
use spinor_emu::{BusHandle, ChipModel, EmuError, EmulatedChip, SharedBus};

use crate::cli::DeviceArgs;

/// Errors opening or closing a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Chip name not in the database
    #[error("unknown chip {0} (see list-chips)")]
    UnknownChip(String),
    /// Image or bus setup failed
    #[error(transparent)]
    Emu(#[from] EmuError),
    /// Driver start failed
    #[error("flash: {0}")]
    Flash(#[from] spinor_core::Error),
}

/// Driver attached to an emulated chip loaded from an image
pub struct Session {
    bus: SharedBus,
    cs: usize,
    image: PathBuf,
    /// Database entry of the chip
    pub entry: ChipEntry,
    /// Started driver
    pub flash: JedecSpiFlash<BusHandle>,
}

impl Session {
    /// Load the image and start the driver
    pub fn open(
        args: &DeviceArgs,
        db: &ChipDatabase,
        config: DriverConfig,
    ) -> Result<Self, SessionError> {
        let entry = db
            .find_by_name(&args.chip)
            .cloned()
            .ok_or_else(|| SessionError::UnknownChip(args.chip.clone()))?;

        let [hi, lo] = entry.jedec_device.to_be_bytes();
        let model = ChipModel::new(entry.descriptor, &[entry.jedec_manufacturer, hi, lo]);
        let chip = EmulatedChip::from_image(model, &args.image)?;

        let bus = SharedBus::new();
        let cs = bus.attach(chip);
        let mut flash = JedecSpiFlash::new(bus.handle(cs)?, config);
        flash.start(entry.descriptor)?;
        log::debug!("{} {} on {}", entry.vendor, entry.name, args.image.display());

        Ok(Self {
            bus,
            cs,
            image: args.image.clone(),
            entry,
            flash,
        })
    }

    /// Path of the backing image
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Write the chip contents back to the image
    pub fn save(&self) -> Result<(), SessionError> {
        self.bus
            .with_chip(self.cs, |chip| chip.save_image(&self.image))
            .ok_or(EmuError::NoSuchChip(self.cs))??;
        for v in self.bus.violations() {
            log::warn!("bus violation: {}", v);
        }
        Ok(())
    }

    /// Status register of the emulated chip
    pub fn status(&self) -> Option<spinor_core::spi::Status> {
        self.bus.with_chip(self.cs, |chip| chip.status())
    }
}
