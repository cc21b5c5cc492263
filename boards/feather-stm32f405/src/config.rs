//! Board configuration: W5500 FeatherWing on SPI2

use wizlink_core::{BringUpConfig, SessionConfig};
use wizlink_hal::MemoryLayout;

/// W5500 version register value
pub const W5500_VERSION: u8 = 0x04;

/// Eight sockets, 2 KiB each way (the full 16 KiB per direction)
pub const W5500_LAYOUT: MemoryLayout = MemoryLayout {
    tx: &[2; 8],
    rx: &[2; 8],
};

pub const SPI_FREQUENCY_HZ: u32 = 10_000_000;

/// Random seed for the network stack
pub const STACK_SEED: u64 = 0x1234_5678_u64;

pub fn bring_up() -> BringUpConfig {
    BringUpConfig {
        memory: W5500_LAYOUT,
        expected_version: W5500_VERSION,
        ..BringUpConfig::default()
    }
}

pub fn session() -> SessionConfig {
    SessionConfig::default()
}
