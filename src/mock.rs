//! Deterministic test double for [`IoAbstraction`] consumers.
//!
//! [`MockIo`] keeps `N` write/read snapshot slots and moves to the next slot on every `sync()`.
//! Read values are scripted up front per slot, written values can be inspected per slot
//! afterwards.  Outputs are latched: the write value of the current slot is carried into the
//! next one on every `sync()`, reads are never carried over.
//!
//! Usage errors are recorded instead of raised, and only the last one is kept.  Check
//! [`MockIo::error()`] right after the operation under test.
use crate::{InterruptMode, InterruptRegistration, IoAbstraction, PinMode, RawIntHandler};

/// Number of pins the mock covers.
pub const MOCK_PINS: usize = 16;

/// Last usage error recorded by a [`MockIo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockIoError {
    #[default]
    NoError,
    /// A pin index of 16 or above was passed.
    PinTooHigh,
    /// A read was performed on a pin not configured as (pull-up) input.
    ReadNotInput,
    /// A write was performed on a pin not configured as output.
    WriteNotOutput,
}

/// Cyclic-buffer [`IoAbstraction`] with `N` snapshot slots (6 by default).
pub struct MockIo<const N: usize = 6> {
    pin_modes: [Option<PinMode>; MOCK_PINS],
    read_values: [u16; N],
    write_values: [u16; N],
    current: usize,
    error: MockIoError,
    interrupt: Option<InterruptRegistration>,
}

impl<const N: usize> MockIo<N> {
    const NONZERO_SLOTS: () = assert!(N > 0, "MockIo needs at least one slot");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONZERO_SLOTS;
        Self {
            pin_modes: [None; MOCK_PINS],
            read_values: [0; N],
            write_values: [0; N],
            current: 0,
            error: MockIoError::NoError,
            interrupt: None,
        }
    }

    /// Clear all read and write slots and go back to slot 0.
    ///
    /// Pin modes, the last error and the interrupt registration are kept.
    pub fn reset_io(&mut self) {
        self.read_values = [0; N];
        self.write_values = [0; N];
        self.current = 0;
    }

    /// Number of slots in the ring.
    pub fn cycles(&self) -> usize {
        N
    }

    /// Index of the slot reads and writes currently go to.
    pub fn current_cycle(&self) -> usize {
        self.current
    }

    /// Script the value reads return while `cycle` is the current slot.
    ///
    /// `cycle` wraps around the ring like the slot index does: on a 6-slot mock, cycle 6 is
    /// slot 0.
    pub fn set_value_for_reading(&mut self, cycle: usize, value: u16) {
        self.read_values[cycle % N] = value;
    }

    /// Value written during `cycle` (including what was latched from the previous slot).
    ///
    /// `cycle` wraps around the ring, see [`MockIo::set_value_for_reading()`].
    pub fn written_value(&self, cycle: usize) -> u16 {
        self.write_values[cycle % N]
    }

    pub fn error(&self) -> MockIoError {
        self.error
    }

    pub fn reset_error(&mut self) {
        self.error = MockIoError::NoError;
    }

    /// Direction last set for `pin`, `None` if it was never configured.
    pub fn pin_mode(&self, pin: u8) -> Option<PinMode> {
        self.pin_modes.get(pin as usize).copied().flatten()
    }

    pub fn interrupt(&self) -> Option<&InterruptRegistration> {
        self.interrupt.as_ref()
    }

    pub fn interrupt_handler(&self) -> Option<RawIntHandler> {
        self.interrupt.as_ref().map(InterruptRegistration::handler)
    }

    pub fn is_interrupt_registered_as(&self, pin: u8, mode: InterruptMode) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|reg| reg.is_registered_as(pin, mode))
    }

    /// Returns `false` (and records the error) if `pin` is outside the mock's range.
    fn check_pin_in_range(&mut self, pin: u8) -> bool {
        if pin as usize >= MOCK_PINS {
            self.error = MockIoError::PinTooHigh;
            false
        } else {
            true
        }
    }

    fn check_output(&mut self, pin: u8) {
        if self.pin_modes[pin as usize] != Some(PinMode::Output) {
            self.error = MockIoError::WriteNotOutput;
        }
    }

    fn check_input(&mut self, pin: u8) {
        if !self.pin_modes[pin as usize].is_some_and(PinMode::is_input) {
            self.error = MockIoError::ReadNotInput;
        }
    }

    fn port_pins(pin: u8) -> core::ops::RangeInclusive<u8> {
        if pin < 8 {
            0..=7
        } else {
            8..=15
        }
    }
}

impl<const N: usize> Default for MockIo<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> IoAbstraction for MockIo<N> {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        if self.check_pin_in_range(pin) {
            self.pin_modes[pin as usize] = Some(mode);
        }
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        if !self.check_pin_in_range(pin) {
            return;
        }
        self.check_output(pin);
        let slot = &mut self.write_values[self.current];
        if value {
            *slot |= 1 << pin;
        } else {
            *slot &= !(1 << pin);
        }
    }

    fn read_value(&mut self, pin: u8) -> bool {
        if !self.check_pin_in_range(pin) {
            return false;
        }
        self.check_input(pin);
        self.read_values[self.current] & (1 << pin) != 0
    }

    fn write_port(&mut self, pin: u8, value: u8) {
        if !self.check_pin_in_range(pin) {
            return;
        }
        for p in Self::port_pins(pin) {
            self.check_output(p);
        }
        let slot = &mut self.write_values[self.current];
        if pin < 8 {
            *slot = (*slot & 0xff00) | value as u16;
        } else {
            *slot = (*slot & 0x00ff) | ((value as u16) << 8);
        }
    }

    fn read_port(&mut self, pin: u8) -> u8 {
        if !self.check_pin_in_range(pin) {
            return 0;
        }
        for p in Self::port_pins(pin) {
            self.check_input(p);
        }
        let [lo, hi] = self.read_values[self.current].to_le_bytes();
        if pin < 8 {
            lo
        } else {
            hi
        }
    }

    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        self.check_pin_in_range(pin);
        self.interrupt = Some(InterruptRegistration::new(pin, mode, handler));
    }

    fn sync(&mut self) {
        let latched = self.write_values[self.current];
        self.current = (self.current + 1) % N;
        self.write_values[self.current] = latched;
    }
}

#[cfg(test)]
mod tests {
    use super::{MockIo, MockIoError};
    use crate::{InterruptMode, IoAbstraction, PinMode};

    fn handler() {}

    #[test]
    fn cycle_index_wraps() {
        let mut io: MockIo = MockIo::new();
        assert_eq!(io.cycles(), 6);
        for k in 1..=6 {
            io.sync();
            assert_eq!(io.current_cycle(), k % 6);
        }
        assert_eq!(io.current_cycle(), 0);

        let mut io = MockIo::<3>::new();
        for k in 1..=10 {
            io.sync();
            assert_eq!(io.current_cycle(), k % 3);
        }

        let mut io = MockIo::<1>::new();
        io.sync();
        assert_eq!(io.current_cycle(), 0);
    }

    #[test]
    fn writes_are_latched_across_cycles() {
        let mut io: MockIo = MockIo::new();
        for pin in 0..16 {
            io.set_direction(pin, PinMode::Output);
        }

        io.write_port(0, 0xab);
        io.sync();
        assert_eq!(io.written_value(0), 0x00ab);
        assert_eq!(io.written_value(1), 0x00ab);

        io.write_port(8, 0xcd);
        io.sync();
        io.sync();
        assert_eq!(io.written_value(1), 0xcdab);
        assert_eq!(io.written_value(2), 0xcdab);
        assert_eq!(io.written_value(3), 0xcdab);
        assert_eq!(io.error(), MockIoError::NoError);

        // wrapping around carries the value into slot 0 as well
        io.write_value(0, false);
        for _ in 0..3 {
            io.sync();
        }
        assert_eq!(io.current_cycle(), 0);
        assert_eq!(io.written_value(0), 0xcdaa);
    }

    #[test]
    fn reads_are_not_carried_over() {
        let mut io: MockIo = MockIo::new();
        io.set_direction(2, PinMode::Input);
        io.set_direction(3, PinMode::InputPullUp);
        io.set_value_for_reading(0, 0b1100);

        assert!(io.read_value(2));
        assert!(io.read_value(3));
        io.sync();
        assert!(!io.read_value(2));
        assert!(!io.read_value(3));
        assert_eq!(io.error(), MockIoError::NoError);
    }

    #[test]
    fn read_port_selects_by_pin() {
        let mut io: MockIo = MockIo::new();
        for pin in 0..16 {
            io.set_direction(pin, PinMode::Input);
        }
        io.set_value_for_reading(0, 0xcdab);

        assert_eq!(io.read_port(0), 0xab);
        assert_eq!(io.read_port(7), 0xab);
        assert_eq!(io.read_port(8), 0xcd);
        assert_eq!(io.read_port(15), 0xcd);
        assert_eq!(io.error(), MockIoError::NoError);
    }

    #[test]
    fn write_to_input_is_flagged_and_sticks() {
        let mut io: MockIo = MockIo::new();
        io.set_direction(3, PinMode::Input);
        io.set_direction(4, PinMode::Output);

        io.write_value(3, true);
        assert_eq!(io.error(), MockIoError::WriteNotOutput);
        // the write still lands in the slot
        assert_eq!(io.written_value(0), 0b1000);

        io.write_value(4, true);
        assert_eq!(io.error(), MockIoError::WriteNotOutput);

        io.reset_error();
        assert_eq!(io.error(), MockIoError::NoError);
    }

    #[test]
    fn read_from_output_is_flagged() {
        let mut io: MockIo = MockIo::new();
        io.set_direction(1, PinMode::Output);
        io.read_value(1);
        assert_eq!(io.error(), MockIoError::ReadNotInput);

        io.reset_error();
        io.read_value(2);
        assert_eq!(io.error(), MockIoError::ReadNotInput);
    }

    #[test]
    fn port_checks_cover_every_pin() {
        let mut io: MockIo = MockIo::new();
        for pin in 8..15 {
            io.set_direction(pin, PinMode::Output);
        }
        io.write_port(8, 0xff);
        assert_eq!(io.error(), MockIoError::WriteNotOutput);

        io.reset_error();
        io.set_direction(15, PinMode::Output);
        io.write_port(8, 0xff);
        assert_eq!(io.error(), MockIoError::NoError);

        io.read_port(12);
        assert_eq!(io.error(), MockIoError::ReadNotInput);
    }

    #[test]
    fn out_of_range_pins() {
        let mut io: MockIo = MockIo::new();

        io.set_direction(16, PinMode::Output);
        assert_eq!(io.error(), MockIoError::PinTooHigh);
        assert_eq!(io.pin_mode(16), None);

        io.reset_error();
        io.write_value(16, true);
        assert_eq!(io.error(), MockIoError::PinTooHigh);
        assert_eq!(io.written_value(0), 0);

        io.reset_error();
        assert!(!io.read_value(200));
        assert_eq!(io.error(), MockIoError::PinTooHigh);

        io.reset_error();
        io.write_port(16, 0xff);
        assert_eq!(io.error(), MockIoError::PinTooHigh);

        io.reset_error();
        assert_eq!(io.read_port(16), 0);
        assert_eq!(io.error(), MockIoError::PinTooHigh);

        io.reset_error();
        io.attach_interrupt(16, handler, InterruptMode::Change);
        assert_eq!(io.error(), MockIoError::PinTooHigh);
    }

    #[test]
    fn interrupt_registration_is_recorded() {
        let mut io: MockIo = MockIo::new();
        assert!(io.interrupt().is_none());
        assert!(io.interrupt_handler().is_none());

        io.attach_interrupt(5, handler, InterruptMode::Change);

        assert!(io.is_interrupt_registered_as(5, InterruptMode::Change));
        assert!(!io.is_interrupt_registered_as(5, InterruptMode::Falling));
        assert!(io.interrupt_handler().is_some());
        assert_eq!(io.error(), MockIoError::NoError);
    }

    #[test]
    fn slot_indices_wrap_around_the_ring() {
        let mut io = MockIo::<6>::new();
        io.set_direction(1, PinMode::Input);
        io.set_direction(2, PinMode::Output);

        io.set_value_for_reading(6, 0x0002);
        assert!(io.read_value(1));
        io.set_value_for_reading(0, 0x0000);
        assert!(!io.read_value(1));

        io.write_value(2, true);
        assert_eq!(io.written_value(6), 0x0004);
        assert_eq!(io.written_value(12), io.written_value(0));
        assert_eq!(io.error(), MockIoError::NoError);
    }

    #[test]
    fn reset_io_clears_slots() {
        let mut io: MockIo = MockIo::new();
        io.set_direction(0, PinMode::Output);
        io.write_value(0, true);
        io.set_value_for_reading(2, 0xffff);
        io.sync();

        io.reset_io();
        assert_eq!(io.current_cycle(), 0);
        assert_eq!(io.written_value(0), 0);
        assert_eq!(io.written_value(1), 0);
        io.sync();
        io.sync();
        io.set_direction(0, PinMode::Input);
        assert!(!io.read_value(0));
        assert_eq!(io.pin_mode(0), Some(PinMode::Input));
    }
}
