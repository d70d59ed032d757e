//! Diagnostic decorator that reports port traffic on every `sync()`.
//!
//! Not meant for production use: it formats and logs a line on every single sync.
use core::fmt::Write;

use crate::{InterruptMode, IoAbstraction, PinMode, RawIntHandler};

/// Most ports a [`LoggingIo`] can report on (its write bitmap is 32 bits wide).
pub const MAX_LOGGED_PORTS: usize = 4;

/// Capacity of a single report line.
const REPORT_LEN: usize = 48;

/// Wraps another backend and logs the accumulated write bitmap and the freshly read ports on
/// every `sync()`.
///
/// All operations are forwarded unchanged.  Writes are additionally tracked in a combined
/// bitmap, one byte per port, purely for reporting.  Reads are reported through the delegate's
/// `read_port()`, so wrapping a [`MockIo`][crate::MockIo] whose ports are not inputs will record
/// read errors on it.
///
/// ```
/// use io_abstraction::{IoAbstraction, LoggingIo, MockIo, PinMode};
///
/// let mut io = LoggingIo::new(MockIo::<6>::new(), 1);
/// io.set_direction(0, PinMode::Output);
/// io.write_value(0, true);
/// io.sync();
/// assert_eq!(io.last_report(), "Port write 01 read 00");
/// ```
pub struct LoggingIo<IO> {
    delegate: IO,
    write_vals: u32,
    ports: usize,
    report: heapless::String<REPORT_LEN>,
}

impl<IO: IoAbstraction> LoggingIo<IO> {
    /// Wrap `delegate`, reporting on its first `ports` 8-bit ports (clamped to 1..=4).
    pub fn new(delegate: IO, ports: usize) -> Self {
        Self {
            delegate,
            write_vals: 0,
            ports: ports.clamp(1, MAX_LOGGED_PORTS),
            report: heapless::String::new(),
        }
    }

    pub fn inner(&self) -> &IO {
        &self.delegate
    }

    pub fn inner_mut(&mut self) -> &mut IO {
        &mut self.delegate
    }

    pub fn into_inner(self) -> IO {
        self.delegate
    }

    /// Combined write bitmap accumulated so far.
    pub fn written(&self) -> u32 {
        self.write_vals
    }

    /// The line produced by the last `sync()`, empty before the first one.
    pub fn last_report(&self) -> &str {
        &self.report
    }

    fn report_writes(&mut self) -> core::fmt::Result {
        self.report.clear();
        self.report.write_str("Port write")?;
        for byte in self.write_vals.to_le_bytes().iter().take(self.ports) {
            write!(self.report, " {:02X}", byte)?;
        }
        Ok(())
    }

    fn report_reads(&mut self) -> core::fmt::Result {
        self.report.write_str(" read")?;
        for port in 0..self.ports {
            let value = self.delegate.read_port((port * 8) as u8);
            write!(self.report, " {:02X}", value)?;
        }
        Ok(())
    }
}

impl<IO: IoAbstraction> IoAbstraction for LoggingIo<IO> {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        self.delegate.set_direction(pin, mode)
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        if let Some(mask) = 1u32.checked_shl(pin as u32) {
            if value {
                self.write_vals |= mask;
            } else {
                self.write_vals &= !mask;
            }
        }
        self.delegate.write_value(pin, value)
    }

    fn read_value(&mut self, pin: u8) -> bool {
        self.delegate.read_value(pin)
    }

    fn write_port(&mut self, pin: u8, value: u8) {
        let shift = 8 * (pin as u32 / 8).min(MAX_LOGGED_PORTS as u32 - 1);
        self.write_vals &= !(0xff << shift);
        self.write_vals |= (value as u32) << shift;
        self.delegate.write_port(pin, value)
    }

    fn read_port(&mut self, pin: u8) -> u8 {
        self.delegate.read_port(pin)
    }

    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        self.delegate.attach_interrupt(pin, handler, mode)
    }

    fn sync(&mut self) {
        let written = self.report_writes();
        self.delegate.sync();
        if written.and_then(|_| self.report_reads()).is_err() {
            log::warn!("io report truncated");
        }
        log::info!("{}", self.report.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::LoggingIo;
    use crate::{InterruptMode, IoAbstraction, MockIo, MockIoError, PinMode};

    fn handler() {}

    #[test]
    fn reports_writes_and_reads() {
        let mut mock: MockIo = MockIo::new();
        for pin in 0..16 {
            mock.set_direction(pin, PinMode::Input);
        }
        mock.set_value_for_reading(1, 0x3412);

        let mut io = LoggingIo::new(mock, 2);
        assert_eq!(io.last_report(), "");

        io.write_port(0, 0xab);
        io.write_port(9, 0xcd);
        io.sync();

        assert_eq!(io.last_report(), "Port write AB CD read 12 34");
        assert_eq!(io.written(), 0xcdab);
        // delegate got the same writes (flagged, since the mock's pins are inputs)
        assert_eq!(io.inner().written_value(0), 0xcdab);
        assert_eq!(io.inner().error(), MockIoError::WriteNotOutput);
    }

    #[test]
    fn single_bits_are_accumulated() {
        let mut mock: MockIo = MockIo::new();
        for pin in 0..8 {
            mock.set_direction(pin, PinMode::Output);
        }
        let mut io = LoggingIo::new(mock, 1);

        io.write_value(0, true);
        io.write_value(7, true);
        io.sync();
        assert_eq!(io.last_report(), "Port write 81 read 00");

        io.write_value(0, false);
        io.sync();
        assert_eq!(io.last_report(), "Port write 80 read 00");
        assert_eq!(io.inner().current_cycle(), 2);
    }

    #[test]
    fn upper_ports_and_clamping() {
        let mut io = LoggingIo::new(MockIo::<2>::new(), 10);
        io.write_port(16, 0x01);
        io.write_port(31, 0x02);
        io.write_port(200, 0x03);
        assert_eq!(io.written(), 0x0301_0000);

        io.write_value(40, true);
        assert_eq!(io.written(), 0x0301_0000);

        io.sync();
        assert_eq!(
            io.last_report(),
            "Port write 00 00 01 03 read 00 00 00 00"
        );
    }

    #[test]
    fn operations_are_forwarded() {
        let mut io = LoggingIo::new(MockIo::<6>::new(), 1);
        io.set_direction(4, PinMode::InputPullUp);
        io.attach_interrupt(4, handler, InterruptMode::Falling);
        io.inner_mut().set_value_for_reading(0, 0x0010);

        assert!(io.read_value(4));
        assert_eq!(io.inner().pin_mode(4), Some(PinMode::InputPullUp));
        assert!(io.inner().is_interrupt_registered_as(4, InterruptMode::Falling));

        let mock = io.into_inner();
        assert_eq!(mock.error(), MockIoError::NoError);
    }
}
