use embedded_hal::i2c as hal_i2c;

/// Blanket trait for types implementing `i2c::I2c`
pub trait I2cBus: hal_i2c::I2c {
    type BusError: hal_i2c::Error + From<<Self as hal_i2c::ErrorType>::Error>;
}

impl<T, E> I2cBus for T
where
    T: hal_i2c::I2c<Error = E>,
    E: hal_i2c::Error,
{
    type BusError = E;
}

/// Transactions used by the expander drivers.
///
/// 16-bit register accesses address the port-A register; the port-B register sits at the next
/// byte offset and travels as the high byte of the same transaction.
pub(crate) trait I2cExt {
    type Error;

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;
    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error>;

    fn write_reg16<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u16)
        -> Result<(), Self::Error>;
    fn read_reg16<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u16, Self::Error>;
    fn update_reg16<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        mask_set: u16,
        mask_clear: u16,
    ) -> Result<(), Self::Error>;
}

impl<I2C: I2cBus> I2cExt for I2C {
    type Error = I2C::BusError;

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[value])?;
        Ok(())
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg16<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        value: u16,
    ) -> Result<(), Self::Error> {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, &[reg.into(), lo, hi])?;
        Ok(())
    }

    fn read_reg16<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u16, Self::Error> {
        let mut buf = [0x00; 2];
        self.write_read(addr, &[reg.into()], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn update_reg16<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        mask_set: u16,
        mask_clear: u16,
    ) -> Result<(), Self::Error> {
        let reg = reg.into();
        let mut value = self.read_reg16(addr, reg)?;
        value |= mask_set;
        value &= !mask_clear;
        self.write_reg16(addr, reg, value)
    }
}
