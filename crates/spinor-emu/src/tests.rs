//! Driver behaviour against emulated chips

use std::sync::{Arc, Barrier};
use std::thread;

use spinor_core::chip::{known, KnownChip};
use spinor_core::error::Error;
use spinor_core::flash::{DeviceState, DriverConfig, EraseStatus, JedecSpiFlash, NvmDevice};
use spinor_core::spi::opcodes;
use spinor_core::transport::BusTransport;

use super::*;

const SS: u32 = 4096;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (x >> 16) as u8
        })
        .collect()
}

fn flash_on(bus: &SharedBus, cs: usize, chip: &KnownChip) -> JedecSpiFlash<BusHandle> {
    flash_with_config(bus, cs, chip, DriverConfig::default())
}

fn flash_with_config(
    bus: &SharedBus,
    cs: usize,
    chip: &KnownChip,
    config: DriverConfig,
) -> JedecSpiFlash<BusHandle> {
    let mut flash = JedecSpiFlash::new(bus.handle(cs).unwrap(), config);
    flash.start(chip.descriptor).unwrap();
    flash
}

fn setup_model(chip: &KnownChip, model: ChipModel) -> (SharedBus, JedecSpiFlash<BusHandle>) {
    init_logger();
    let bus = SharedBus::new();
    let cs = bus.attach(EmulatedChip::new(model));
    let flash = flash_on(&bus, cs, chip);
    (bus, flash)
}

fn setup(chip: &KnownChip) -> (SharedBus, JedecSpiFlash<BusHandle>) {
    setup_model(chip, ChipModel::from_known(chip))
}

fn read_back(flash: &mut JedecSpiFlash<BusHandle>, addr: u32, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    flash.read(addr, &mut buf).unwrap();
    buf
}

fn all_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0xFF)
}

#[test]
fn test_round_trip() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let cap = flash.capacity() as u32;
    let cases = [(0u32, 1usize), (0x3F0, 0x40), (0xF_FFF9, 600), (cap - 256, 256)];

    for (i, &(addr, len)) in cases.iter().enumerate() {
        let data = pattern(len, i as u32);
        flash.write(addr, &data).unwrap();
        assert_eq!(read_back(&mut flash, addr, len), data, "at 0x{:X}", addr);
    }
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
    assert_eq!(bus.lock_holder(), None);
}

#[test]
fn test_write_leaves_chip_idle() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0x40, &pattern(700, 3)).unwrap();
    assert_eq!(flash.state(), DeviceState::Ready);
    assert_eq!(bus.with_chip(0, |c| c.status().is_busy()), Some(false));
}

#[test]
fn test_erase_clears_to_ff() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0x2000, &pattern(0x4000, 7)).unwrap();
    flash.erase(0x2000, 0x4000).unwrap();
    assert!(all_erased(&read_back(&mut flash, 0x2000, 0x4000)));
    assert!(bus.violations().is_empty());
}

#[test]
fn test_over_erase_rounding() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0, &vec![0u8; 4 * SS as usize]).unwrap();

    flash.erase(SS + 1, 1).unwrap();

    let data = bus.chip_data(0).unwrap();
    assert_eq!(data[SS as usize - 1], 0x00);
    assert!(all_erased(&data[SS as usize..2 * SS as usize]));
    assert_eq!(data[2 * SS as usize], 0x00);
}

#[test]
fn test_aligned_erase_reaches_next_sector() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0, &vec![0u8; 4 * SS as usize]).unwrap();

    flash.erase(0, SS).unwrap();

    let data = bus.chip_data(0).unwrap();
    assert!(all_erased(&data[..2 * SS as usize]));
    assert_eq!(data[2 * SS as usize], 0x00);
}

#[test]
fn test_page_boundary_write() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    bus.with_chip(0, |c| {
        c.data_mut()[246..251].fill(0x5A);
        c.data_mut()[261..266].fill(0x5A);
    });

    let data: Vec<u8> = (0..10).collect();
    flash.write(256 - 5, &data).unwrap();

    let got = read_back(&mut flash, 246, 20);
    assert_eq!(&got[..5], &[0x5A; 5]);
    assert_eq!(&got[5..15], &data[..]);
    assert_eq!(&got[15..], &[0x5A; 5]);
}

#[test]
fn test_zero_length_write_touches_nothing() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let before = bus.transfer_count();
    flash.write(0x1234, &[]).unwrap();
    assert_eq!(bus.transfer_count(), before);
    assert!(bus.commands().is_empty());
}

#[test]
fn test_busy_serialization_same_chip() {
    init_logger();
    let bus = SharedBus::new();
    let model = ChipModel::from_known(&known::GENERIC_25Q32).with_busy(2, 40, 80);
    let cs = bus.attach(EmulatedChip::new(model));
    let mut writer = flash_on(&bus, cs, &known::GENERIC_25Q32);
    let mut reader = flash_on(&bus, cs, &known::GENERIC_25Q32);

    writer.write(0, &vec![0u8; 32 * SS as usize]).unwrap();

    let writer_id = writer.bus().id();
    let reader_id = reader.bus().id();
    let erase_from = bus.commands().len();

    let barrier = Arc::new(Barrier::new(2));
    let b = barrier.clone();
    let eraser = thread::spawn(move || {
        b.wait();
        writer.erase(0, 31 * SS)
    });

    barrier.wait();
    // only start reading once the erase owns the bus (or is already done)
    while bus.lock_holder() != Some(writer_id) && !eraser.is_finished() {
        thread::yield_now();
    }

    let mut ok = 0;
    let mut busy = 0;
    for _ in 0..50 {
        let mut buf = [0u8; 64];
        match reader.read(0x100, &mut buf) {
            Ok(()) => {
                assert!(all_erased(&buf));
                ok += 1;
            }
            Err(Error::BusBusy) => busy += 1,
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert_eq!(eraser.join().unwrap(), Ok(()));
    assert!(ok > 0 || busy > 0);

    // the erase is one uninterrupted run of windows, every read comes after it
    let log = &bus.commands()[erase_from..];
    let erase_windows: Vec<_> = log
        .iter()
        .enumerate()
        .filter(|(_, (id, _))| *id == writer_id)
        .map(|(i, _)| i)
        .collect();
    let first = erase_windows[0];
    let last = erase_windows[erase_windows.len() - 1];
    assert_eq!(erase_windows.len(), last - first + 1);
    assert!(log[..first].iter().all(|(id, _)| *id != reader_id));
    let reads_after = log[last + 1..]
        .iter()
        .filter(|&&(id, op)| id == reader_id && op == opcodes::FAST_READ)
        .count();
    assert_eq!(reads_after, ok);

    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
    assert!(all_erased(&bus.chip_data(cs).unwrap()[..32 * SS as usize]));
}

#[test]
fn test_busy_serialization_two_chips() {
    init_logger();
    let bus = SharedBus::new();
    let cs0 = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::GENERIC_25Q32)));
    let cs1 = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::M25P64)));
    let flash0 = flash_on(&bus, cs0, &known::GENERIC_25Q32);
    let flash1 = flash_on(&bus, cs1, &known::M25P64);

    let handles: Vec<_> = [(flash0, 1u32), (flash1, 2u32)]
        .into_iter()
        .map(|(mut flash, seed)| {
            thread::spawn(move || {
                let data = pattern(4096, seed);
                for i in 0..8u32 {
                    loop {
                        match flash.write(i * 4096, &data) {
                            Err(Error::BusBusy) => thread::yield_now(),
                            other => break other.unwrap(),
                        }
                    }
                }
                data
            })
        })
        .collect();
    let written: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
    for (cs, data) in [cs0, cs1].into_iter().zip(written) {
        let image = bus.chip_data(cs).unwrap();
        for i in 0..8 {
            assert_eq!(&image[i * 4096..(i + 1) * 4096], &data[..]);
        }
    }
}

#[test]
fn test_lock_timeout_reports_busy() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let mut other = bus.handle(0).unwrap();
    assert!(other.lock(std::time::Duration::from_millis(10)));

    let mut buf = [0u8; 4];
    assert_eq!(flash.read(0, &mut buf), Err(Error::BusBusy));
    assert_eq!(flash.erase(0, 1), Err(Error::BusBusy));
    assert_eq!(flash.state(), DeviceState::Ready);
    assert!(bus.commands().is_empty());

    other.unlock();
    flash.read(0, &mut buf).unwrap();
}

#[test]
fn test_async_erase_resumable() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let block = 64 * 1024;
    flash.write(0, &vec![0u8; 3 * SS as usize]).unwrap();
    flash.write(3 * block, &[0u8; 16]).unwrap();

    let mut waiter = flash_with_config(
        &bus,
        0,
        &known::GENERIC_25Q32,
        DriverConfig {
            lock_timeout_ms: 1,
            ..DriverConfig::default()
        },
    );

    flash.erase_begin(0, 3 * block).unwrap();
    let mut in_progress = 0;
    let mut finished = false;
    for _ in 0..1000 {
        match flash.erase_tick().unwrap() {
            EraseStatus::InProgress => {
                in_progress += 1;
                let mut buf = [0u8; 1];
                assert_eq!(waiter.read(0, &mut buf), Err(Error::BusBusy));
            }
            EraseStatus::Finished => {
                finished = true;
                break;
            }
        }
    }
    assert!(finished);

    let erases = bus
        .commands()
        .iter()
        .filter(|&&(_, op)| op == opcodes::BE_D8)
        .count();
    assert_eq!(erases, 4);
    assert!(in_progress >= erases);

    assert!(all_erased(&read_back(&mut waiter, 0, 3 * SS as usize)));
    assert!(all_erased(&read_back(&mut waiter, 3 * block, 16)));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_async_erase_begin_busy() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let mut other = bus.handle(0).unwrap();
    assert!(other.lock(std::time::Duration::from_millis(1)));
    assert_eq!(flash.erase_begin(0, SS), Err(Error::BusBusy));
    assert!(flash.erase_cursor().is_none());
    other.unlock();
    flash.erase_begin(0, SS).unwrap();
    flash.sync().unwrap();
    assert_eq!(bus.lock_holder(), None);
}

#[test]
fn test_transfer_failure_recovery() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let data = pattern(600, 11);

    // RDSR, status, WREN, PP frame, PP data, then the next chunk's RDSR
    bus.fail_transfer_in(5);
    assert_eq!(flash.write(0, &data), Err(Error::SpiTransferFailed));
    assert_eq!(flash.state(), DeviceState::Ready);
    assert_eq!(bus.lock_holder(), None);

    let image = bus.chip_data(0).unwrap();
    assert_eq!(&image[..256], &data[..256]);
    assert!(all_erased(&image[256..600]));

    flash.write(256, &data[256..]).unwrap();
    assert_eq!(read_back(&mut flash, 0, 600), data);
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

fn assert_recovered(bus: &SharedBus, flash: &JedecSpiFlash<BusHandle>) {
    assert_eq!(flash.state(), DeviceState::Ready);
    assert_eq!(bus.lock_holder(), None);
    assert!(flash.erase_cursor().is_none());
}

#[test]
fn test_read_transfer_failure() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0, b"abcd").unwrap();

    // the fast read frame
    bus.fail_transfer_in(0);
    let mut buf = [0u8; 4];
    assert_eq!(flash.read(0, &mut buf), Err(Error::SpiTransferFailed));
    assert_recovered(&bus, &flash);

    assert_eq!(read_back(&mut flash, 0, 4), b"abcd");
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_erase_transfer_failure() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0, &vec![0u8; 2 * SS as usize]).unwrap();
    flash.sync().unwrap();

    // RDSR, status, WREN, then the sector erase frame
    bus.fail_transfer_in(3);
    assert_eq!(flash.erase(0, 1), Err(Error::SpiTransferFailed));
    assert_recovered(&bus, &flash);
    assert_eq!(bus.chip_data(0).unwrap()[0], 0x00);

    flash.erase(0, 1).unwrap();
    assert!(all_erased(&read_back(&mut flash, 0, SS as usize)));
    assert_eq!(read_back(&mut flash, SS, 1), [0x00]);
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_emulated_erase_transfer_failure() {
    let (bus, mut flash) = setup(&known::M45PE40);
    let sector = known::M45PE40.descriptor.sector_size as usize;
    flash.write(0, &vec![0u8; 1024]).unwrap();

    // RDSR, status, WREN, PP frame, then a fill chunk of the first page
    bus.fail_transfer_in(5);
    assert_eq!(flash.erase(0, 1), Err(Error::SpiTransferFailed));
    assert_recovered(&bus, &flash);
    assert_eq!(&bus.chip_data(0).unwrap()[256..1024], &[0u8; 768][..]);

    flash.erase(0, 1).unwrap();
    assert!(all_erased(&read_back(&mut flash, 0, sector)));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_mass_erase_transfer_failure() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0x1000, &[0x00]).unwrap();
    flash.sync().unwrap();

    // RDSR, status, then the WREN before chip erase
    bus.fail_transfer_in(2);
    assert_eq!(flash.mass_erase(), Err(Error::SpiTransferFailed));
    assert_recovered(&bus, &flash);
    assert_eq!(bus.chip_data(0).unwrap()[0x1000], 0x00);

    flash.mass_erase().unwrap();
    assert_eq!(read_back(&mut flash, 0x1000, 1), [0xFF]);
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_write_protect_transfer_failure() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);

    // RDSR, status, WREN, then the WRSR window
    bus.fail_transfer_in(3);
    assert_eq!(flash.write_protect(), Err(Error::SpiTransferFailed));
    assert_recovered(&bus, &flash);
    assert_eq!(bus.with_chip(0, |c| c.status().is_protected()), Some(false));

    flash.write_protect().unwrap();
    assert_eq!(bus.with_chip(0, |c| c.status().is_protected()), Some(true));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_cancelled_async_erase_frees_bus() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let mut other = flash_with_config(
        &bus,
        0,
        &known::GENERIC_25Q32,
        DriverConfig {
            lock_timeout_ms: 1,
            ..DriverConfig::default()
        },
    );

    flash.erase_begin(0, 0x2_FFFF).unwrap();
    assert_eq!(flash.erase_tick(), Ok(EraseStatus::InProgress));
    let mut buf = [0u8; 1];
    assert_eq!(other.read(0, &mut buf), Err(Error::BusBusy));

    assert_eq!(flash.erase_cancel(), Ok(true));
    assert_recovered(&bus, &flash);
    assert!(!bus.with_chip(0, |c| c.status().is_busy()).unwrap());
    drop(flash);
    other.read(0, &mut buf).unwrap();
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_handle_for_missing_chip() {
    let bus = SharedBus::new();
    assert!(matches!(bus.handle(0), Err(EmuError::NoSuchChip(0))));
    let cs = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::M25P64)));
    assert_eq!(bus.handle(cs).map(|h| h.cs()).ok(), Some(cs));
    assert!(matches!(bus.handle(cs + 1), Err(EmuError::NoSuchChip(1))));
}

#[test]
fn test_write_protect() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write_protect().unwrap();
    assert_eq!(bus.with_chip(0, |c| c.status().is_protected()), Some(true));

    flash.write(0, &[0x00]).unwrap();
    flash.erase(0, 1).unwrap();
    assert_eq!(read_back(&mut flash, 0, 1), [0xFF]);

    flash.write_unprotect().unwrap();
    assert_eq!(bus.with_chip(0, |c| c.status().is_protected()), Some(false));
    flash.write(0, &[0x00]).unwrap();
    assert_eq!(read_back(&mut flash, 0, 1), [0x00]);
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_aai_part() {
    let (bus, mut flash) = setup(&known::SST25VF016B);
    let data = pattern(600, 5);
    flash.write(0x101, &data).unwrap();
    assert_eq!(read_back(&mut flash, 0x101, 600), data);
    assert_eq!(bus.with_chip(0, |c| c.aai_active()), Some(false));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());

    flash.erase(0, 1).unwrap();
    assert!(all_erased(&read_back(&mut flash, 0x101, 600)));
}

#[test]
fn test_start_closes_open_aai() {
    init_logger();
    let bus = SharedBus::new();
    let cs = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::SST25VF016B)));

    // leave an AAI sequence open, as after a reset mid-write
    let mut raw = bus.handle(cs).unwrap();
    assert!(raw.lock(std::time::Duration::from_millis(1)));
    let commands: [&[u8]; 2] = [&[opcodes::WREN], &[opcodes::AAI_WP, 0, 0, 0, 0xAB, 0xCD]];
    for cmd in commands {
        raw.select().unwrap();
        raw.transmit(cmd).unwrap();
        raw.deselect().unwrap();
    }
    raw.unlock();
    assert_eq!(bus.with_chip(cs, |c| c.aai_active()), Some(true));

    let mut flash = flash_on(&bus, cs, &known::SST25VF016B);
    assert_eq!(bus.with_chip(cs, |c| c.aai_active()), Some(false));
    flash.write(0x10, &[1, 2]).unwrap();
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_emulated_erase() {
    let (bus, mut flash) = setup(&known::M45PE40);
    let sector = known::M45PE40.descriptor.sector_size;
    flash.write(0, &vec![0u8; 1000]).unwrap();
    flash.write(sector, &[0x42; 8]).unwrap();

    flash.erase(0, 1).unwrap();

    assert!(all_erased(&read_back(&mut flash, 0, sector as usize)));
    assert_eq!(read_back(&mut flash, sector, 8), [0x42; 8]);
    assert!(!bus
        .commands()
        .iter()
        .any(|&(_, op)| op == opcodes::SE_20 || op == opcodes::BE_D8));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_mass_erase() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    let cap = flash.capacity() as u32;
    flash.write(0, &[0u8; 16]).unwrap();
    flash.write(cap - 16, &[0u8; 16]).unwrap();
    flash.mass_erase().unwrap();
    assert!(all_erased(&bus.chip_data(0).unwrap()));
    assert!(bus.commands().iter().any(|&(_, op)| op == opcodes::CE_C7));
}

#[test]
fn test_mass_erase_emulated() {
    let (bus, mut flash) = setup(&known::M45PE40);
    let cap = flash.capacity() as u32;
    flash.write(0, &[0u8; 16]).unwrap();
    flash.write(cap - 16, &[0u8; 16]).unwrap();
    flash.mass_erase().unwrap();
    assert!(all_erased(&bus.chip_data(0).unwrap()));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_erase_block() {
    let (bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0x1_0000, &[0u8; 4]).unwrap();
    flash.write(0x2_0000, &[0u8; 4]).unwrap();
    flash.erase_block(0x1_8000).unwrap();
    assert!(all_erased(&read_back(&mut flash, 0x1_0000, 4)));
    assert_eq!(read_back(&mut flash, 0x2_0000, 4), [0u8; 4]);
    assert!(bus.commands().iter().any(|&(_, op)| op == opcodes::BE_D8));
}

#[test]
fn test_four_byte_addressing() {
    let (bus, mut flash) = setup(&known::MX25L256);
    let addr = 0x1FF_FE80;
    let data = pattern(256, 9);
    flash.write(addr, &data).unwrap();
    assert_eq!(read_back(&mut flash, addr, 256), data);
    assert_eq!(&bus.chip_data(0).unwrap()[addr as usize..addr as usize + 256], &data[..]);

    flash.erase(addr, 1).unwrap();
    assert!(all_erased(&read_back(&mut flash, addr, 256)));
    assert!(bus.violations().is_empty(), "{:?}", bus.violations());
}

#[test]
fn test_alignment_padding_preserves_erased_neighbours() {
    let (bus, mut flash) = setup(&known::AT25SF041);
    bus.with_chip(0, |c| c.data_mut()[0x204] = 0x12);
    flash.write(0x205, &[0x11, 0x22]).unwrap();
    assert_eq!(read_back(&mut flash, 0x204, 4), [0x12, 0x11, 0x22, 0xFF]);
}

#[test]
fn test_alignment_padding_on_page_write_part() {
    // page-write parts replace the padded window with 0xFF
    let mut model = ChipModel::from_known(&known::AT25SF041);
    model.program_mode = ProgramMode::Overwrite;
    let (bus, mut flash) = setup_model(&known::AT25SF041, model);
    bus.with_chip(0, |c| c.data_mut()[0x204] = 0x12);
    flash.write(0x205, &[0x11, 0x22]).unwrap();
    assert_eq!(read_back(&mut flash, 0x204, 4), [0xFF, 0x11, 0x22, 0xFF]);
}

#[test]
fn test_get_info() {
    let model =
        ChipModel::from_known(&known::GENERIC_25Q32).with_jedec_id(&[0x7F, 0x7F, 0xC8, 0x40, 0x16]);
    let (_bus, mut flash) = setup_model(&known::GENERIC_25Q32, model);
    let info = flash.get_info().unwrap();
    assert_eq!(info.identification, [0xC8, 0x40, 0x16]);
    assert_eq!(info.manufacturer_bank, 2);
    assert_eq!(info.sector_count, 1024);
    assert_eq!(info.sector_size, SS);
}

#[test]
fn test_get_info_no_chip() {
    let model = ChipModel::from_known(&known::GENERIC_25Q32).with_jedec_id(&[]);
    let (bus, mut flash) = setup_model(&known::GENERIC_25Q32, model);
    assert_eq!(flash.get_info(), Err(Error::ChipNotFound));
    assert_eq!(bus.lock_holder(), None);
}

#[test]
fn test_restart() {
    let (_bus, mut flash) = setup(&known::GENERIC_25Q32);
    flash.write(0, &[0xAB]).unwrap();
    flash.stop();
    assert_eq!(flash.state(), DeviceState::Stopped);
    flash.start(known::GENERIC_25Q32.descriptor).unwrap();
    assert_eq!(read_back(&mut flash, 0, 1), [0xAB]);
}

#[test]
fn test_violation_detection() {
    init_logger();
    let bus = SharedBus::new();
    let cs = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::GENERIC_25Q32)));
    let mut raw = bus.handle(cs).unwrap();

    raw.select().unwrap();
    raw.transmit(&[opcodes::PP, 0, 0, 0, 0]).unwrap();
    raw.deselect().unwrap();
    raw.unlock();

    let violations = bus.violations();
    assert!(violations.contains(&Violation::NotLockHolder { handle: raw.id() }));
    assert!(violations.contains(&Violation::WriteNotEnabled {
        cs,
        opcode: opcodes::PP
    }));
    assert!(violations.contains(&Violation::UnlockWithoutLock { handle: raw.id() }));
    assert_eq!(bus.chip_data(cs).unwrap()[0], 0xFF);
}

#[test]
fn test_image_round_trip() {
    let model = ChipModel::from_known(&known::M45PE40);
    let path = std::env::temp_dir().join(format!("spinor-emu-image-{}.bin", std::process::id()));

    let fresh = EmulatedChip::from_image(model.clone(), &path).unwrap();
    assert!(all_erased(fresh.data()));

    let mut chip = EmulatedChip::new(model.clone());
    chip.data_mut()[..4].copy_from_slice(b"NOR!");
    chip.save_image(&path).unwrap();

    let loaded = EmulatedChip::from_image(model.clone(), &path).unwrap();
    assert_eq!(&loaded.data()[..4], b"NOR!");

    std::fs::write(&path, [0u8; 16]).unwrap();
    let err = EmulatedChip::from_image(model, &path).unwrap_err();
    assert!(matches!(err, EmuError::ImageSize { actual: 16, .. }));
    let _ = std::fs::remove_file(&path);
}
