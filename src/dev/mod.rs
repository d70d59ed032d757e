//! The device module contains the internals for each of the supported port expanders.
//!
//! In most cases you will not need anything from here explicitly, the exposed types and factory
//! functions at the root of the crate should be enough.

pub mod mcp23017;
pub mod pcf8574;

use mcp23017::{Mcp23017, Mcp23xInterruptMode};
use pcf8574::Pcf8574;

/// Backend for a `PCF8574` at `addr`, its `INT` output wired to host pin `interrupt_pin`.
pub fn io_from_pcf8574<I2C: crate::I2cBus>(
    i2c: I2C,
    addr: u8,
    interrupt_pin: Option<u8>,
) -> Pcf8574<I2C> {
    Pcf8574::new(i2c, addr, interrupt_pin)
}

/// Backend for an `MCP23017` at `addr` with both interrupt outputs mirrored onto one host pin.
pub fn io_from_mcp23017<I2C: crate::I2cBus>(
    i2c: I2C,
    addr: u8,
    int_mode: Mcp23xInterruptMode,
    interrupt_pin: Option<u8>,
) -> Mcp23017<I2C> {
    Mcp23017::new(i2c, addr, int_mode, interrupt_pin)
}

/// Backend for an `MCP23017` at `addr` with `INTA` wired to host pin `pin_a` and `INTB` to
/// `pin_b`.
pub fn io_from_mcp23017_int_per_port<I2C: crate::I2cBus>(
    i2c: I2C,
    addr: u8,
    int_mode: Mcp23xInterruptMode,
    pin_a: Option<u8>,
    pin_b: Option<u8>,
) -> Mcp23017<I2C> {
    Mcp23017::with_pin_per_port(i2c, addr, int_mode, pin_a, pin_b)
}

#[cfg(test)]
mod tests {
    use crate::{IoAbstraction, PinMode};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn backends_as_trait_objects() {
        let expectations = [
            mock_i2c::Transaction::write(0x38, vec![0x02]),
            mock_i2c::Transaction::read(0x38, vec![0x02]),
            mock_i2c::Transaction::write_read(0x20, vec![0x0a], vec![0x00, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x0a, 0x40, 0x40]),
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x00, 0x01]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut backends: Vec<Box<dyn IoAbstraction>> = vec![
            Box::new(super::io_from_pcf8574(
                bus.clone(),
                super::pcf8574::address_a(false, false, false),
                None,
            )),
            Box::new(super::io_from_mcp23017(
                bus.clone(),
                0x20,
                super::Mcp23xInterruptMode::ActiveLow,
                Some(3),
            )),
        ];

        backends[0].set_direction(1, PinMode::InputPullUp);
        for io in backends.iter_mut() {
            io.sync();
        }
        assert!(backends[0].read_value(1));
        assert_eq!(backends[1].read_port(8), 0x01);

        bus.done();
    }

    #[test]
    fn per_port_factory() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let mcp = super::io_from_mcp23017_int_per_port(
            bus.clone(),
            0x21,
            super::Mcp23xInterruptMode::ActiveHighOpen,
            Some(4),
            None,
        );
        assert_eq!(
            mcp.interrupt_wiring(),
            super::mcp23017::InterruptWiring::PerPort {
                a: Some(4),
                b: None
            }
        );
        bus.done();
    }
}
