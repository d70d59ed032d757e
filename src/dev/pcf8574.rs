//! Support for the `PCF8574` & `PCF8574A` "Remote 8-bit I/O expander for I2C-bus with interrupt"
//!
//! The chip has a single quasi-bidirectional register and no direction register.  A pin is used
//! as an input by writing it HIGH, which leaves it held up by the weak internal pull-up.  That is
//! why every input configured here ends up as [`PinMode::InputPullUp`]; a floating input is not
//! possible.
//!
//! The `INT` line fires on any change on any pin.  It cannot be scoped to a subset of pins or to
//! a particular edge.
use crate::{I2cExt, InterruptMode, InterruptRegistration, IoAbstraction, PinMode, RawIntHandler};

/// Bus address of a `PCF8574` with the given address pin levels.
pub const fn address(a0: bool, a1: bool, a2: bool) -> u8 {
    0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}

/// Bus address of a `PCF8574A` with the given address pin levels.
pub const fn address_a(a0: bool, a1: bool, a2: bool) -> u8 {
    0x38 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}

/// `PCF8574` "Remote 8-bit I/O expander for I2C-bus with interrupt"
pub struct Pcf8574<I2C: crate::I2cBus> {
    i2c: I2C,
    addr: u8,
    to_write: u8,
    last_read: u8,
    needs_write: bool,
    interrupt_pin: Option<u8>,
    interrupt: Option<InterruptRegistration>,
    bus_error: Option<I2C::BusError>,
}

impl<I2C: crate::I2cBus> Pcf8574<I2C> {
    /// `interrupt_pin` is the host pin wired to the chip's `INT` output, `None` if not wired.
    pub fn new(i2c: I2C, addr: u8, interrupt_pin: Option<u8>) -> Self {
        Self {
            i2c,
            addr,
            to_write: 0x00,
            last_read: 0x00,
            needs_write: false,
            interrupt_pin,
            interrupt: None,
            bus_error: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Output byte that the next flush will write.
    pub fn pending_output(&self) -> u8 {
        self.to_write
    }

    /// Pin states read by the last successful `sync()`.
    pub fn last_read(&self) -> u8 {
        self.last_read
    }

    /// Whether the next `sync()` writes the output byte.
    pub fn is_dirty(&self) -> bool {
        self.needs_write
    }

    pub fn interrupt_registration(&self) -> Option<&InterruptRegistration> {
        self.interrupt.as_ref()
    }

    /// Take the last bus error absorbed by `sync()`, if any.
    pub fn take_bus_error(&mut self) -> Option<I2C::BusError> {
        self.bus_error.take()
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn absorb(&mut self, what: &str, e: I2C::BusError) {
        use embedded_hal::i2c::Error;
        log::warn!("pcf8574@{:#04x}: {} failed: {:?}", self.addr, what, e.kind());
        self.bus_error = Some(e);
    }
}

impl<I2C: crate::I2cBus> IoAbstraction for Pcf8574<I2C> {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        if mode.is_input() {
            self.write_value(pin, true);
        }
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        let Some(mask) = 1u8.checked_shl(pin as u32) else {
            return;
        };
        if value {
            self.to_write |= mask;
        } else {
            self.to_write &= !mask;
        }
        self.needs_write = true;
    }

    fn read_value(&mut self, pin: u8) -> bool {
        1u8.checked_shl(pin as u32)
            .is_some_and(|mask| self.last_read & mask != 0)
    }

    fn write_port(&mut self, _pin: u8, value: u8) {
        self.to_write = value;
        self.needs_write = true;
    }

    fn read_port(&mut self, _pin: u8) -> u8 {
        self.last_read
    }

    fn attach_interrupt(&mut self, _pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        let Some(host_pin) = self.interrupt_pin else {
            log::debug!("pcf8574@{:#04x}: no interrupt pin wired", self.addr);
            return;
        };
        if mode != InterruptMode::Change {
            log::debug!(
                "pcf8574@{:#04x}: only CHANGE interrupts, ignoring {:?}",
                self.addr,
                mode
            );
        }
        self.interrupt = Some(InterruptRegistration::new(
            host_pin,
            InterruptMode::Change,
            handler,
        ));
    }

    fn sync(&mut self) {
        if self.needs_write {
            log::trace!("pcf8574@{:#04x}: write {:#04x}", self.addr, self.to_write);
            match self.i2c.write_byte(self.addr, self.to_write) {
                Ok(()) => self.needs_write = false,
                Err(e) => self.absorb("write", e),
            }
        }
        match self.i2c.read_byte(self.addr) {
            Ok(value) => {
                log::trace!("pcf8574@{:#04x}: read {:#04x}", self.addr, value);
                self.last_read = value;
            }
            Err(e) => self.absorb("read", e),
        }
    }
}
