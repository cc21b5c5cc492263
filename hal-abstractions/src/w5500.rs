//! W5500 common and socket register access over [`ChipBus`]
//!
//! Only the registers bring-up needs: socket buffer sizes, PHY status and
//! the version register. Frame format is variable-length data mode:
//! 16-bit address, control byte, then data.

use crate::bus::ChipBus;
use crate::chip::{ChipControl, ChipError, MemoryLayout, PhyLink};

/// Common register block
const BSB_COMMON: u8 = 0x00;

const PHYCFGR: u16 = 0x002E;
const VERSIONR: u16 = 0x0039;
const SN_RXBUF_SIZE: u16 = 0x001E;
const SN_TXBUF_SIZE: u16 = 0x001F;

/// PHYCFGR link status bit
const PHYCFGR_LNK: u8 = 0x01;

const SOCKETS: usize = 8;
/// Buffer memory per direction, KiB
const BUFFER_KB: u32 = 16;

const RWB_WRITE: u8 = 1 << 2;

/// Register block of socket `n`
const fn socket_bsb(n: usize) -> u8 {
    ((n as u8) << 2) | 0x01
}

const fn control(bsb: u8, write: bool) -> u8 {
    (bsb << 3) | if write { RWB_WRITE } else { 0 }
}

/// W5500 register driver
pub struct W5500<B> {
    bus: Option<B>,
}

impl<B: ChipBus> W5500<B> {
    pub const fn new() -> Self {
        Self { bus: None }
    }

    /// Take the bus back, e.g. to hand it to the packet driver
    pub fn release(&mut self) -> Option<B> {
        self.bus.take()
    }

    fn read(&mut self, bsb: u8, addr: u16, buf: &mut [u8]) -> Result<(), ChipError> {
        let bus = self.bus.as_mut().ok_or(ChipError::NotRegistered)?;
        let [hi, lo] = addr.to_be_bytes();
        bus.transaction(|bus| {
            bus.write_burst(&[hi, lo, control(bsb, false)]);
            bus.read_burst(buf);
        });
        Ok(())
    }

    fn write(&mut self, bsb: u8, addr: u16, data: &[u8]) -> Result<(), ChipError> {
        let bus = self.bus.as_mut().ok_or(ChipError::NotRegistered)?;
        let [hi, lo] = addr.to_be_bytes();
        bus.transaction(|bus| {
            bus.write_burst(&[hi, lo, control(bsb, true)]);
            bus.write_burst(data);
        });
        Ok(())
    }

    fn read_u8(&mut self, bsb: u8, addr: u16) -> Result<u8, ChipError> {
        let mut byte = [0u8];
        self.read(bsb, addr, &mut byte)?;
        Ok(byte[0])
    }
}

impl<B: ChipBus> Default for W5500<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ChipBus> ChipControl for W5500<B> {
    type Bus = B;

    fn register(&mut self, bus: B) {
        self.bus = Some(bus);
    }

    fn init_memory(&mut self, layout: &MemoryLayout) -> Result<(), ChipError> {
        if self.bus.is_none() {
            return Err(ChipError::NotRegistered);
        }
        layout.validate(SOCKETS, BUFFER_KB)?;
        for n in 0..SOCKETS {
            let tx = layout.tx.get(n).copied().unwrap_or(0);
            let rx = layout.rx.get(n).copied().unwrap_or(0);
            self.write(socket_bsb(n), SN_TXBUF_SIZE, &[tx])?;
            self.write(socket_bsb(n), SN_RXBUF_SIZE, &[rx])?;
        }
        // Bus faults are otherwise invisible; verify by read-back
        for n in 0..SOCKETS {
            let tx = self.read_u8(socket_bsb(n), SN_TXBUF_SIZE)?;
            let rx = self.read_u8(socket_bsb(n), SN_RXBUF_SIZE)?;
            if tx != layout.tx.get(n).copied().unwrap_or(0)
                || rx != layout.rx.get(n).copied().unwrap_or(0)
            {
                return Err(ChipError::InvalidLayout);
            }
        }
        Ok(())
    }

    fn phy_link(&mut self) -> Result<PhyLink, ChipError> {
        let phycfgr = self.read_u8(BSB_COMMON, PHYCFGR)?;
        Ok(if phycfgr & PHYCFGR_LNK != 0 {
            PhyLink::Up
        } else {
            PhyLink::Down
        })
    }

    fn version(&mut self) -> Result<u8, ChipError> {
        self.read_u8(BSB_COMMON, VERSIONR)
    }

    fn chip_id(&self) -> &str {
        "W5500"
    }
}
