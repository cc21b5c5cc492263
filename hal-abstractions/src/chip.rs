//! Ethernet controller control registers

use crate::bus::ChipBus;

/// Chip control operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipError {
    /// No bus has been registered with the driver yet
    NotRegistered,
    /// Socket buffer allocation not accepted by the chip
    InvalidLayout,
    /// Register access failed
    Bus,
}

impl core::fmt::Display for ChipError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "No bus registered"),
            Self::InvalidLayout => write!(f, "Invalid socket memory layout"),
            Self::Bus => write!(f, "Register access failed"),
        }
    }
}

impl core::error::Error for ChipError {}

/// Physical-layer link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyLink {
    Down,
    Up,
}

/// Per-socket transmit/receive buffer allocation in KiB
///
/// Index `n` of each slice is socket `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub tx: &'static [u8],
    pub rx: &'static [u8],
}

impl MemoryLayout {
    /// W5100S: four sockets, 2 KiB each way
    pub const W5100S_DEFAULT: Self = Self {
        tx: &[2, 2, 2, 2],
        rx: &[2, 2, 2, 2],
    };

    /// Total transmit allocation in KiB
    pub fn tx_total(&self) -> u32 {
        self.tx.iter().map(|&kb| u32::from(kb)).sum()
    }

    /// Total receive allocation in KiB
    pub fn rx_total(&self) -> u32 {
        self.rx.iter().map(|&kb| u32::from(kb)).sum()
    }

    /// Check the layout against a chip's socket count and buffer memory
    ///
    /// Every entry must be a power of two (or zero) and neither direction may
    /// exceed `budget_kb`.
    pub fn validate(&self, sockets: usize, budget_kb: u32) -> Result<(), ChipError> {
        let sizes_ok = self
            .tx
            .iter()
            .chain(self.rx)
            .all(|&kb| kb == 0 || kb.is_power_of_two());
        if self.tx.len() > sockets
            || self.rx.len() > sockets
            || !sizes_ok
            || self.tx_total() > budget_kb
            || self.rx_total() > budget_kb
        {
            return Err(ChipError::InvalidLayout);
        }
        Ok(())
    }
}

/// Register-level chip driver seen by bring-up
///
/// The driver performs no bus access until [`ChipControl::register`] has
/// handed it a bus; every fallible call before that returns
/// [`ChipError::NotRegistered`].
pub trait ChipControl {
    /// Bus the driver talks through
    type Bus: ChipBus;

    /// Register the chip-select, byte/burst and critical-section primitives
    fn register(&mut self, bus: Self::Bus);

    /// Apply the socket buffer allocation
    fn init_memory(&mut self, layout: &MemoryLayout) -> Result<(), ChipError>;

    /// Query the PHY link state
    fn phy_link(&mut self) -> Result<PhyLink, ChipError>;

    /// Read the version/identity register
    fn version(&mut self) -> Result<u8, ChipError>;

    /// Chip model name, e.g. `"W5100S"`
    fn chip_id(&self) -> &str;
}
