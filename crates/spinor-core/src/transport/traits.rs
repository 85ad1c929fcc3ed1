//! Bus transport trait definitions

use core::time::Duration;

use crate::error::Result;

/// Chip-select based serial bus carrying one flash device
///
/// The transport owns chip-select timing and the bus lock. The driver only
/// decides which bytes go out between `select` and `deselect`.
///
/// ## Locking
///
/// `lock` is a mutual exclusion primitive with a bounded wait. It is not
/// reentrant: a holder that calls `lock` again must observe `false` once
/// the timeout expires. Only the holder may select the device.
///
/// ## Example
///
/// ```ignore
/// impl BusTransport for MyBus {
///     fn select(&mut self) -> Result<()> { self.cs.set_low(); Ok(()) }
///     fn deselect(&mut self) -> Result<()> { self.cs.set_high(); Ok(()) }
///     fn transmit(&mut self, bytes: &[u8]) -> Result<()> { self.spi.write(bytes) }
///     fn receive(&mut self, buf: &mut [u8]) -> Result<()> { self.spi.read(buf) }
///     fn lock(&mut self, timeout: Duration) -> bool { self.mutex.try_lock_for(timeout) }
///     fn unlock(&mut self) { self.mutex.unlock() }
/// }
/// ```
pub trait BusTransport {
    /// Assert chip select
    fn select(&mut self) -> Result<()>;

    /// Release chip select
    fn deselect(&mut self) -> Result<()>;

    /// Clock out `bytes`
    fn transmit(&mut self, bytes: &[u8]) -> Result<()>;

    /// Clock in `buf.len()` bytes
    fn receive(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Try to take the bus lock, waiting at most `timeout`
    fn lock(&mut self, timeout: Duration) -> bool;

    /// Release the bus lock
    fn unlock(&mut self);

    /// Delay for the specified number of microseconds
    ///
    /// Used between status samples. Implementations may yield to the
    /// scheduler instead of spinning.
    fn delay_us(&mut self, _us: u32) {}
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn select(&mut self) -> Result<()> {
        (**self).select()
    }

    fn deselect(&mut self) -> Result<()> {
        (**self).deselect()
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).transmit(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).receive(buf)
    }

    fn lock(&mut self, timeout: Duration) -> bool {
        (**self).lock(timeout)
    }

    fn unlock(&mut self) {
        (**self).unlock()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Run `f` inside one chip-select window
///
/// The device is deselected afterwards even when `f` fails. A deselect
/// failure is reported only if `f` itself succeeded.
pub fn transaction<B, T, F>(bus: &mut B, f: F) -> Result<T>
where
    B: BusTransport + ?Sized,
    F: FnOnce(&mut B) -> Result<T>,
{
    bus.select()?;
    let result = f(bus);
    let released = bus.deselect();
    let value = result?;
    released?;
    Ok(value)
}
