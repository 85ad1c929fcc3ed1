//! CLI command implementations
//!
//! Commands that only need storage access are generic over
//! [`NvmDevice`](spinor_core::flash::NvmDevice); the tick-driven erase and
//! the status register commands work on the JEDEC driver directly.

mod erase;
mod info;
mod io;
mod list;
mod session;

pub use erase::{run_erase, run_erase_async, run_mass_erase};
pub use info::{run_info, run_protect};
pub use io::{run_read, run_write};
pub use list::list_chips;
pub use session::Session;
