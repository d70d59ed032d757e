//! Cached, sync-driven pin IO over I2C port-expanders.
//!
//! Every backend implements [`IoAbstraction`]: reads and writes go to a local cache, and
//! [`sync()`][IoAbstraction::sync] is the single point where the cache meets the hardware.
//!
//! ```
//! use io_abstraction::{IoAbstraction, MockIo, PinMode};
//!
//! let mut io: MockIo = MockIo::new();
//! io.set_direction(3, PinMode::Output);
//! io.write_value(3, true);
//! io.sync();
//! assert_eq!(io.written_value(0), 0x0008);
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod bus;
mod common;
pub mod dev;
mod logging;
mod mock;
mod mutex;
mod pin;

pub use bus::I2cBus;
pub use common::mode;
pub use common::{InterruptMode, InterruptRegistration, IoAbstraction, PinMode, RawIntHandler};
pub use logging::{LoggingIo, MAX_LOGGED_PORTS};
pub use mock::{MockIo, MockIoError, MOCK_PINS};
pub use mutex::{sync_shared, PortMutex};
pub use pin::Pin;

pub(crate) use bus::I2cExt;

pub use dev::mcp23017::{Mcp23017, Mcp23xInterruptMode};
pub use dev::pcf8574::Pcf8574;
pub use dev::{io_from_mcp23017, io_from_mcp23017_int_per_port, io_from_pcf8574};
