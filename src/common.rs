/// Capability contract shared by every backend.
///
/// Pin and port arguments are zero-based indices whose valid range is defined by the backend.
/// Everything except [`sync()`][IoAbstraction::sync] only touches locally cached state; `sync()`
/// is the single point where bus traffic happens:  pending output state is flushed if it is
/// dirty and the cached input state is always refreshed.
///
/// The trait is object-safe, so backends can be handled as `&mut dyn IoAbstraction` or (with the
/// `std` feature) `Box<dyn IoAbstraction>`.
///
/// **Interrupts**: registered handlers are invoked by an external dispatch mechanism, possibly
/// while the main loop is in the middle of mutating the same cache.  Nothing in here guards
/// against that.  Callers must serialize interrupt-side access against `sync()` and the write
/// calls themselves, for example by sharing the backend through a
/// [`PortMutex`][crate::PortMutex] built on a critical section.
pub trait IoAbstraction {
    /// Configure `pin` as an input, a pulled-up input or an output.
    ///
    /// Takes effect on the next `sync()`.
    fn set_direction(&mut self, pin: u8, mode: PinMode);

    /// Set a single bit of the pending output state.
    fn write_value(&mut self, pin: u8, value: bool);

    /// Get a single bit of the input state cached by the last `sync()`.
    fn read_value(&mut self, pin: u8) -> bool;

    /// Set the whole 8-bit port containing `pin`.
    ///
    /// `pin` selects the port (0..=7 is the first one, 8..=15 the second, ...), it does not
    /// address a pin within it.
    fn write_port(&mut self, pin: u8, value: u8);

    /// Get the whole 8-bit port containing `pin` from the cached input state.
    fn read_port(&mut self, pin: u8) -> u8;

    /// Record that `handler` should run when `pin` signals `mode`.
    ///
    /// This only records intent (plus whatever device-side configuration the backend needs).
    /// The handler is never invoked from here.
    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode);

    /// Flush pending output state if dirty and refresh the cached input state.
    fn sync(&mut self);
}

impl<T: IoAbstraction + ?Sized> IoAbstraction for &mut T {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        (**self).set_direction(pin, mode)
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        (**self).write_value(pin, value)
    }

    fn read_value(&mut self, pin: u8) -> bool {
        (**self).read_value(pin)
    }

    fn write_port(&mut self, pin: u8, value: u8) {
        (**self).write_port(pin, value)
    }

    fn read_port(&mut self, pin: u8) -> u8 {
        (**self).read_port(pin)
    }

    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        (**self).attach_interrupt(pin, handler, mode)
    }

    fn sync(&mut self) {
        (**self).sync()
    }
}

#[cfg(any(test, feature = "std"))]
impl<T: IoAbstraction + ?Sized> IoAbstraction for std::boxed::Box<T> {
    fn set_direction(&mut self, pin: u8, mode: PinMode) {
        (**self).set_direction(pin, mode)
    }

    fn write_value(&mut self, pin: u8, value: bool) {
        (**self).write_value(pin, value)
    }

    fn read_value(&mut self, pin: u8) -> bool {
        (**self).read_value(pin)
    }

    fn write_port(&mut self, pin: u8, value: u8) {
        (**self).write_port(pin, value)
    }

    fn read_port(&mut self, pin: u8) -> u8 {
        (**self).read_port(pin)
    }

    fn attach_interrupt(&mut self, pin: u8, handler: RawIntHandler, mode: InterruptMode) {
        (**self).attach_interrupt(pin, handler, mode)
    }

    fn sync(&mut self) {
        (**self).sync()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

impl PinMode {
    pub fn is_input(self) -> bool {
        matches!(self, PinMode::Input | PinMode::InputPullUp)
    }
}

/// Trigger condition for an interrupt registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    Low,
    High,
    Change,
    Rising,
    Falling,
}

/// Interrupt callback.  Non-capturing closures coerce to this.
pub type RawIntHandler = fn();

/// What `attach_interrupt()` recorded: a handler plus the pin and trigger it was registered for.
#[derive(Debug, Clone, Copy)]
pub struct InterruptRegistration {
    pub pin: u8,
    pub mode: InterruptMode,
    handler: RawIntHandler,
}

impl InterruptRegistration {
    pub fn new(pin: u8, mode: InterruptMode, handler: RawIntHandler) -> Self {
        Self { pin, mode, handler }
    }

    /// The recorded callback, for the external dispatcher to invoke.
    pub fn handler(&self) -> RawIntHandler {
        self.handler
    }

    pub fn is_registered_as(&self, pin: u8, mode: InterruptMode) -> bool {
        self.pin == pin && self.mode == mode
    }
}

/// Pin Modes
pub mod mode {
    /// Trait for pin-modes which can be used to set a logic level.
    pub trait HasOutput {}
    /// Trait for pin-modes which can be used to read a logic level.
    pub trait HasInput {}

    /// Pin whose direction has not been set through this handle yet.
    pub struct Unconfigured;

    /// Pin configured as an input.
    pub struct Input;
    impl HasInput for Input {}

    /// Pin configured as an input with pull-up.
    pub struct PullUpInput;
    impl HasInput for PullUpInput {}

    /// Pin configured as an output.
    pub struct Output;
    impl HasOutput for Output {}
}
