use core::convert::Infallible;
use core::marker::PhantomData;
use embedded_hal::digital as hal_digital;

use crate::IoAbstraction;

/// Handle for a single pin of a shared [`IoAbstraction`][crate::IoAbstraction] backend.
///
/// Like every other non-`sync()` operation, reads and writes through a `Pin` only touch the
/// backend's cache.  They become visible on the bus (and input changes become visible here) on
/// the next [`sync_shared()`][crate::sync_shared].
pub struct Pin<'a, MODE, M> {
    pin: u8,
    port: &'a M,
    _m: PhantomData<MODE>,
}

impl<'a, M, IO> Pin<'a, crate::mode::Unconfigured, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    pub fn new(pin: u8, port: &'a M) -> Self {
        Self {
            pin,
            port,
            _m: PhantomData,
        }
    }
}

impl<'a, MODE, M, IO> Pin<'a, MODE, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    pub fn pin(&self) -> u8 {
        self.pin
    }

    fn into_mode<NEW>(self, mode: crate::PinMode) -> Pin<'a, NEW, M> {
        self.port.lock(|io| io.set_direction(self.pin, mode));
        Pin {
            pin: self.pin,
            port: self.port,
            _m: PhantomData,
        }
    }

    pub fn into_input(self) -> Pin<'a, crate::mode::Input, M> {
        self.into_mode(crate::PinMode::Input)
    }

    pub fn into_pull_up_input(self) -> Pin<'a, crate::mode::PullUpInput, M> {
        self.into_mode(crate::PinMode::InputPullUp)
    }

    pub fn into_output(self) -> Pin<'a, crate::mode::Output, M> {
        self.into_mode(crate::PinMode::Output)
    }
}

impl<'a, MODE: crate::mode::HasInput, M, IO> Pin<'a, MODE, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    pub fn is_high(&self) -> bool {
        self.port.lock(|io| io.read_value(self.pin))
    }

    pub fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl<'a, MODE: crate::mode::HasOutput, M, IO> Pin<'a, MODE, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    pub fn set_state(&mut self, high: bool) {
        self.port.lock(|io| io.write_value(self.pin, high))
    }

    pub fn set_high(&mut self) {
        self.set_state(true)
    }

    pub fn set_low(&mut self) {
        self.set_state(false)
    }
}

impl<'a, MODE, M> hal_digital::ErrorType for Pin<'a, MODE, M> {
    type Error = Infallible;
}

impl<'a, MODE: crate::mode::HasInput, M, IO> hal_digital::InputPin for Pin<'a, MODE, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self))
    }
}

impl<'a, MODE: crate::mode::HasOutput, M, IO> hal_digital::OutputPin for Pin<'a, MODE, M>
where
    IO: crate::IoAbstraction,
    M: crate::PortMutex<Port = IO>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{MockIo, MockIoError, PinMode, PortMutex};
    use core::cell::RefCell;
    use embedded_hal::digital::{InputPin, OutputPin};

    #[test]
    fn pins_follow_the_cache() {
        let port: RefCell<MockIo> = RefCell::new(MockIo::new());

        let mut led = super::Pin::new(0, &port).into_output();
        let mut button = super::Pin::new(9, &port).into_pull_up_input();
        assert_eq!(button.pin(), 9);

        port.lock(|io| {
            assert_eq!(io.pin_mode(0), Some(PinMode::Output));
            assert_eq!(io.pin_mode(9), Some(PinMode::InputPullUp));
            io.set_value_for_reading(0, 0x0200);
            io.set_value_for_reading(1, 0x0000);
        });

        led.set_high();
        assert!(button.is_high());
        assert!(!InputPin::is_low(&mut button).unwrap());

        crate::sync_shared(&port);

        OutputPin::set_low(&mut led).unwrap();
        assert!(button.is_low());

        port.lock(|io| {
            assert_eq!(io.written_value(0), 0x0001);
            assert_eq!(io.written_value(1), 0x0000);
            assert_eq!(io.error(), MockIoError::NoError);
        });
    }

    #[test]
    fn pins_through_std_mutex() {
        let port = std::sync::Mutex::create(MockIo::<2>::new());

        let mut out = super::Pin::new(3, &port).into_output();
        out.set_high();
        crate::sync_shared(&port);
        crate::sync_shared(&port);

        PortMutex::lock(&port, |io| {
            assert_eq!(io.current_cycle(), 0);
            assert_eq!(io.written_value(0), 0x0008);
        });
    }
}
