//! Peripheral access shim between the chip driver and the SPI/GPIO HAL
//!
//! The chip driver only ever sees [`ChipBus`]: chip-select, single-byte
//! transfers and (optionally) burst transfers. Bus failures are not
//! observable at this layer; the primitives have no error returns.
//!
//! Multi-byte register sequences must run under [`ChipBus::transaction`],
//! which holds the critical section and keeps chip-select asserted for the
//! whole closure. Both are released when the closure returns, whichever
//! path it returns through.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Dummy byte clocked out while reading
const DUMMY: u8 = 0xFF;

/// Byte-level access to the Ethernet controller
pub trait ChipBus {
    /// Assert chip-select (drive low)
    fn select(&mut self);

    /// Deassert chip-select (drive high)
    fn deselect(&mut self);

    /// Clock in one byte
    fn read_byte(&mut self) -> u8;

    /// Clock out one byte
    fn write_byte(&mut self, byte: u8);

    /// Read `buf.len()` bytes in one burst
    ///
    /// Defaults to one byte at a time.
    fn read_burst(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.read_byte();
        }
    }

    /// Write all of `buf` in one burst
    ///
    /// Defaults to one byte at a time.
    fn write_burst(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.write_byte(byte);
        }
    }

    /// Whether burst calls are serviced by a bulk transfer
    fn supports_burst(&self) -> bool {
        false
    }

    /// Run `f` inside the bus critical section
    ///
    /// Nesting is allowed; the outermost call restores the interrupt state.
    fn locked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        critical_section::with(|_| f(self))
    }

    /// Run `f` with the critical section held and chip-select asserted
    fn transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        self.locked(|bus| {
            bus.select();
            let result = f(bus);
            bus.deselect();
            result
        })
    }
}

/// [`ChipBus`] over an embedded-hal SPI bus and a chip-select pin
pub struct SpiChipBus<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiChipBus<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    /// Wrap the bus; chip-select is driven high immediately
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        // Errors are not observable on this layer
        let _ = cs.set_high();
        Self { spi, cs }
    }

    /// Give the SPI bus and chip-select pin back
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> ChipBus for SpiChipBus<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    fn select(&mut self) {
        let _ = self.cs.set_low();
    }

    fn deselect(&mut self) {
        // Last byte must be off the wire before chip-select rises
        let _ = self.spi.flush();
        let _ = self.cs.set_high();
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = [DUMMY];
        let _ = self.spi.transfer_in_place(&mut byte);
        byte[0]
    }

    fn write_byte(&mut self, byte: u8) {
        let _ = self.spi.write(&[byte]);
    }

    #[cfg(feature = "spi-burst")]
    fn read_burst(&mut self, buf: &mut [u8]) {
        buf.fill(DUMMY);
        let _ = self.spi.transfer_in_place(buf);
    }

    #[cfg(feature = "spi-burst")]
    fn write_burst(&mut self, buf: &[u8]) {
        let _ = self.spi.write(buf);
    }

    fn supports_burst(&self) -> bool {
        cfg!(feature = "spi-burst")
    }
}
