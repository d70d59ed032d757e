//! Support for the `MCP23017` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: <https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf>
//!
//! The MCP23017 offers two eight-bit GPIO ports.  It has three address pins, so eight devices
//! can coexist on an I2C bus.
//!
//! Each port has an interrupt, which can be wired to the host as one shared line (the chip
//! mirrors both ports onto it) or as one line per port.
//!
//! When passing 16-bit values to this driver, the upper byte corresponds to port B (pins 7..0)
//! and the lower byte corresponds to port A (pins 7..0).  Pins 0..=7 are `GPA0..=GPA7`, pins
//! 8..=15 are `GPB0..=GPB7`.
//!
//! Every register access is a 16-bit transaction at the port-A register address; with the
//! register bank in its reset (paired) layout, the port-B register follows at the next byte.
//! The driver establishes that layout once, on the first `sync()`.
use crate::{I2cExt, InterruptMode, InterruptRegistration, IoAbstraction, PinMode, RawIntHandler};

/// Bus address of an `MCP23017` with the given address pin levels.
pub const fn address(a0: bool, a1: bool, a2: bool) -> u8 {
    0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// N.B.: These values are for BANK=0, which is the reset state of the chip and which the driver
/// enforces during initialization.  Only the port-A addresses are listed; port B is always at
/// the next byte.
///
/// For all registers, the reset value is 0x00, except for IODIR which is 0xFF (making all pins
/// inputs) at reset.
pub(crate) enum Regs {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIR = 0x00,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOL = 0x02,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTEN = 0x04,
    /// DEFVAL: default values for interrupt-on-change
    DEFVAL = 0x06,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCON = 0x08,
    /// IOCON: configuration register, see [`iocon`]
    IOCON = 0x0a,
    /// GPPU: GPIO pull-ups: enables weak internal pull-ups on each pin (when configured
    ///   as an input)
    GPPU = 0x0c,
    /// INTF: interrupt flags: 0=no interrupt pending; 1=corresponding pin caused interrupt
    INTF = 0x0e,
    /// INTCAP: interrupt captured value: reflects value of each pin at the time that they
    ///   caused an interrupt
    INTCAP = 0x10,
    /// GPIO: reflects logic level on pins
    GPIO = 0x12,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

/// Bit positions in IOCON.
pub mod iocon {
    /// ODR: interrupt pins are 0=active-driver outputs (INTPOL sets polarity) or 1=open-drain
    pub const ODR_BIT: u8 = 2;
    /// INTPOL: interrupt pin is 0=active-low or 1=active-high
    pub const INTPOL_BIT: u8 = 1;
    /// HAEN: no effect on MCP23017
    pub const HAEN_BIT: u8 = 3;
    /// SEQOP: 1 disables the address pointer increment the 16-bit transactions rely on
    pub const SEQOP_BIT: u8 = 5;
    /// MIRROR: INTA and INTB are ORed, an interrupt on either port activates both
    pub const MIRROR_BIT: u8 = 6;
    /// BANK: 0 keeps the A/B registers paired at adjacent addresses
    pub const BANK_BIT: u8 = 7;

    pub(crate) const INT_MODE_MASK: u8 = (1 << ODR_BIT) | (1 << INTPOL_BIT);
}

/// How the `INTA`/`INTB` outputs signal an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mcp23xInterruptMode {
    NotEnabled,
    ActiveHighOpen,
    ActiveLowOpen,
    ActiveHigh,
    ActiveLow,
}

impl Mcp23xInterruptMode {
    /// Value of the ODR and INTPOL bits in IOCON.
    ///
    /// `NotEnabled` and `ActiveLow` share `0b000`; what tells them apart is whether the driver
    /// enables any interrupt at all.
    pub fn iocon_bits(self) -> u8 {
        match self {
            Mcp23xInterruptMode::NotEnabled => 0b000,
            Mcp23xInterruptMode::ActiveHighOpen => 0b110,
            Mcp23xInterruptMode::ActiveLowOpen => 0b100,
            Mcp23xInterruptMode::ActiveHigh => 0b010,
            Mcp23xInterruptMode::ActiveLow => 0b000,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Mcp23xInterruptMode::NotEnabled
    }

    pub fn is_open_drain(self) -> bool {
        self.iocon_bits() & (1 << iocon::ODR_BIT) != 0
    }

    pub fn is_active_high(self) -> bool {
        self.iocon_bits() & (1 << iocon::INTPOL_BIT) != 0
    }

    /// Edge the host has to watch for on the interrupt line.
    pub fn host_trigger(self) -> InterruptMode {
        if self.is_active_high() {
            InterruptMode::Rising
        } else {
            InterruptMode::Falling
        }
    }

    /// Mode the host has to put its interrupt pin into.
    ///
    /// Open-drain outputs only ever pull low and need a pull-up on the host side.
    pub fn host_pin_mode(self) -> PinMode {
        if self.is_open_drain() {
            PinMode::InputPullUp
        } else {
            PinMode::Input
        }
    }
}

/// How the interrupt outputs are wired to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptWiring {
    /// No interrupt line is connected (or interrupts are not enabled).
    Disabled,
    /// One host pin for both ports, IOCON.MIRROR set.
    Shared(u8),
    /// One host pin per port, IOCON.MIRROR clear.
    PerPort { a: Option<u8>, b: Option<u8> },
}

impl InterruptWiring {
    fn from_pins(mode: Mcp23xInterruptMode, pin_a: Option<u8>, pin_b: Option<u8>) -> Self {
        match (pin_a, pin_b) {
            _ if !mode.is_enabled() => InterruptWiring::Disabled,
            (None, None) => InterruptWiring::Disabled,
            (Some(a), Some(b)) if a == b => InterruptWiring::Shared(a),
            (a, b) => InterruptWiring::PerPort { a, b },
        }
    }

    fn host_pins(self) -> [Option<u8>; 2] {
        match self {
            InterruptWiring::Disabled => [None, None],
            InterruptWiring::Shared(pin) => [Some(pin), None],
            InterruptWiring::PerPort { a, b } => [a, b],
        }
    }

    fn is_mirrored(self) -> bool {
        matches!(self, InterruptWiring::Shared(_))
    }
}

/// Registers that are configured bit by bit and applied on `sync()`, in this order.
const STAGED_REGS: [Regs; 6] = [
    Regs::IODIR,
    Regs::GPPU,
    Regs::IPOL,
    Regs::INTCON,
    Regs::DEFVAL,
    Regs::GPINTEN,
];

/// Bits to set and clear in one register on the next `sync()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StagedBits {
    set: u16,
    clear: u16,
}

impl StagedBits {
    fn stage(&mut self, mask: u16, value: bool) {
        if value {
            self.set |= mask;
            self.clear &= !mask;
        } else {
            self.clear |= mask;
            self.set &= !mask;
        }
    }

    fn is_empty(&self) -> bool {
        self.set == 0 && self.clear == 0
    }
}

/// `MCP23017` "16-Bit I/O Expander with Serial Interface"
pub struct Mcp23017<I2C: crate::I2cBus> {
    i2c: I2C,
    addr: u8,
    int_mode: Mcp23xInterruptMode,
    wiring: InterruptWiring,
    port_cache: u16,
    needs_write: bool,
    needs_init: bool,
    staged: [StagedBits; STAGED_REGS.len()],
    interrupts: [Option<InterruptRegistration>; 2],
    bus_error: Option<I2C::BusError>,
}

impl<I2C: crate::I2cBus> Mcp23017<I2C> {
    /// Both ports share the host interrupt pin `interrupt_pin` (if any).
    pub fn new(
        i2c: I2C,
        addr: u8,
        int_mode: Mcp23xInterruptMode,
        interrupt_pin: Option<u8>,
    ) -> Self {
        Self::with_pin_per_port(i2c, addr, int_mode, interrupt_pin, interrupt_pin)
    }

    /// Port A signals on host pin `pin_a`, port B on `pin_b`.
    ///
    /// Passing the same pin twice is the same as [`Mcp23017::new()`].
    pub fn with_pin_per_port(
        i2c: I2C,
        addr: u8,
        int_mode: Mcp23xInterruptMode,
        pin_a: Option<u8>,
        pin_b: Option<u8>,
    ) -> Self {
        Self {
            i2c,
            addr,
            int_mode,
            wiring: InterruptWiring::from_pins(int_mode, pin_a, pin_b),
            port_cache: 0x0000,
            needs_write: false,
            needs_init: true,
            staged: [StagedBits::default(); STAGED_REGS.len()],
            interrupts: [None; 2],
            bus_error: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn interrupt_wiring(&self) -> InterruptWiring {
        self.wiring
    }

    pub fn interrupt_mode(&self) -> Mcp23xInterruptMode {
        self.int_mode
    }

    /// Combined cache of both ports: pending writes until the next `sync()`, the values read
    /// back afterwards.
    pub fn port_cache(&self) -> u16 {
        self.port_cache
    }

    pub fn is_dirty(&self) -> bool {
        self.needs_write
    }

    /// Host-side registrations made by `attach_interrupt()`: one per wired interrupt line.
    pub fn interrupt_registrations(&self) -> impl Iterator<Item = &InterruptRegistration> {
        self.interrupts.iter().flatten()
    }

    /// Invert (or stop inverting) the value read from `pin`.  Applied on the next `sync()`.
    pub fn set_polarity(&mut self, pin: u8, inverted: bool) {
        self.stage(Regs::IPOL, pin, inverted);
    }

    /// Read and clear the interrupt state of the chip.
    ///
    /// Returns `(flags, captured)`: the pins that caused the pending interrupt and the pin
    /// levels captured when it fired.  Reading the capture register releases the interrupt
    /// line.  Unlike everything else, this goes to the bus immediately; it is meant for the
    /// deferred half of an interrupt dispatcher, not for the interrupt handler itself.
    pub fn fetch_interrupt_state(&mut self) -> Result<(u16, u16), I2C::BusError> {
        let flags = self.i2c.read_reg16(self.addr, Regs::INTF)?;
        let captured = self.i2c.read_reg16(self.addr, Regs::INTCAP)?;
        Ok((flags, captured))
    }

    /// Take the last bus error absorbed by `sync()`, if any.
    pub fn take_bus_error(&mut self) -> Option<I2C::BusError> {
        self.bus_error.take()
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn stage(&mut self, reg: Regs, pin: u8, value: bool) {
        let Some(mask) = 1u16.checked_shl(pin as u32) else {
            return;
        };
        if let Some(idx) = STAGED_REGS.iter().position(|r| *r == reg) {
            self.staged[idx].stage(mask, value);
        }
    }

    fn absorb(&mut self, what: &str, e: I2C::BusError) {
        use embedded_hal::i2c::Error;
        log::warn!("mcp23017@{:#04x}: {} failed: {:?}", self.addr, what, e.kind());
        self.bus_error = Some(e);
    }

    /// IOCON value to program, given the value currently in the chip.
    fn iocon_value(&self, current: u8) -> u8 {
        let mut value = current;
        value &= !(1 << iocon::BANK_BIT);
        value &= !(1 << iocon::SEQOP_BIT);
        if self.wiring.is_mirrored() {
            value |= 1 << iocon::MIRROR_BIT;
        } else {
            value &= !(1 << iocon::MIRROR_BIT);
        }
        value &= !iocon::INT_MODE_MASK;
        if self.wiring != InterruptWiring::Disabled {
            value |= self.int_mode.iocon_bits();
        }
        value
    }

    fn init_device(&mut self) -> Result<(), I2C::BusError> {
        // IOCONA and IOCONB are the same register; write the same value through both.
        let current = self.i2c.read_reg16(self.addr, Regs::IOCON)?;
        let value = self.iocon_value(current as u8);
        log::debug!(
            "mcp23017@{:#04x}: init, wiring {:?}, IOCON {:#04x}",
            self.addr,
            self.wiring,
            value
        );
        self.i2c
            .write_reg16(self.addr, Regs::IOCON, u16::from_le_bytes([value, value]))
    }

    fn apply_staged(&mut self) -> Result<(), I2C::BusError> {
        for (idx, reg) in STAGED_REGS.iter().enumerate() {
            let bits = self.staged[idx];
            if bits.is_empty() {
                continue;
            }
            log::trace!(
                "mcp23017@{:#04x}: {:?} set {:#06x} clear {:#06x}",
                self.addr,
                reg,
                bits.set,
                bits.clear
            );
            self.i2c
                .update_reg16(self.addr, *reg, bits.set, bits.clear)?;
            self.staged[idx] = StagedBits::default();
        }
        Ok(())
    }
}

impl<I2C: crate::I2cBus> IoAbstraction for Mcp23017<I2C> {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        self.stage(Regs::IODIR, pin, mode.is_input());
        self.stage(Regs::GPPU, pin, mode == PinMode::InputPullUp);
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        let Some(mask) = 1u16.checked_shl(pin as u32) else {
            return;
        };
        if value {
            self.port_cache |= mask;
        } else {
            self.port_cache &= !mask;
        }
        self.needs_write = true;
    }

    fn read_value(&mut self, pin: u8) -> bool {
        1u16.checked_shl(pin as u32)
            .is_some_and(|mask| self.port_cache & mask != 0)
    }

    fn write_port(&mut self, pin: u8, value: u8) {
        if pin < 8 {
            self.port_cache = (self.port_cache & 0xff00) | value as u16;
        } else {
            self.port_cache = (self.port_cache & 0x00ff) | ((value as u16) << 8);
        }
        self.needs_write = true;
    }

    fn read_port(&mut self, pin: u8) -> u8 {
        let [a, b] = self.port_cache.to_le_bytes();
        if pin < 8 {
            a
        } else {
            b
        }
    }

    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        if self.wiring == InterruptWiring::Disabled {
            log::debug!("mcp23017@{:#04x}: interrupts not wired", self.addr);
            return;
        }

        let trigger = self.int_mode.host_trigger();
        for (slot, host_pin) in self.interrupts.iter_mut().zip(self.wiring.host_pins()) {
            *slot = host_pin.map(|host_pin| InterruptRegistration::new(host_pin, trigger, handler));
        }
        log::debug!(
            "mcp23017@{:#04x}: interrupt on pin {} ({:?}), host trigger {:?}",
            self.addr,
            pin,
            mode,
            trigger
        );

        match mode {
            InterruptMode::Change => self.stage(Regs::INTCON, pin, false),
            InterruptMode::Rising | InterruptMode::High => {
                self.stage(Regs::INTCON, pin, true);
                self.stage(Regs::DEFVAL, pin, false);
            }
            InterruptMode::Falling | InterruptMode::Low => {
                self.stage(Regs::INTCON, pin, true);
                self.stage(Regs::DEFVAL, pin, true);
            }
        }
        self.stage(Regs::GPINTEN, pin, true);
    }

    fn sync(&mut self) {
        // Register addresses below are only valid once BANK=0 is established.
        if self.needs_init {
            match self.init_device() {
                Ok(()) => self.needs_init = false,
                Err(e) => {
                    self.absorb("init", e);
                    return;
                }
            }
        }

        if let Err(e) = self.apply_staged() {
            self.absorb("configure", e);
        }

        if self.needs_write {
            log::trace!("mcp23017@{:#04x}: write {:#06x}", self.addr, self.port_cache);
            match self.i2c.write_reg16(self.addr, Regs::GPIO, self.port_cache) {
                Ok(()) => self.needs_write = false,
                Err(e) => {
                    // The cache still holds the pending output; a refresh would overwrite it.
                    self.absorb("write", e);
                    return;
                }
            }
        }

        match self.i2c.read_reg16(self.addr, Regs::GPIO) {
            Ok(value) => {
                log::trace!("mcp23017@{:#04x}: read {:#06x}", self.addr, value);
                self.port_cache = value;
            }
            Err(e) => self.absorb("read", e),
        }
    }
}
