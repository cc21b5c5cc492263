//! Fatal conditions that stop all network activity

use wizlink_hal::ChipError;

/// Conditions after which the session makes no further progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalError {
    /// Reset line could not be driven
    ResetLine,
    /// Socket memory configuration was rejected
    ChipInit(ChipError),
    /// PHY link status could not be queried
    PhyLink(ChipError),
    /// Version register could not be read
    ChipAccess(ChipError),
    /// Version register does not match the configured chip model
    ChipIdentityMismatch { expected: u8, found: u8 },
    /// DHCP server offered an address already in use
    AddressConflict,
    /// Initial DHCP acquisition failed `attempts` times in a row
    DhcpExhausted { attempts: u8 },
}

impl core::fmt::Display for FatalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ResetLine => write!(f, "Reset line error"),
            Self::ChipInit(e) => write!(f, "Chip initialization failed: {}", e),
            Self::PhyLink(e) => write!(f, "Unknown PHY link status: {}", e),
            Self::ChipAccess(e) => write!(f, "Chip access error: {}", e),
            Self::ChipIdentityMismatch { expected, found } => write!(
                f,
                "Version register mismatch: expected 0x{:02x}, read 0x{:02x}",
                expected, found
            ),
            Self::AddressConflict => write!(f, "Conflict IP from DHCP"),
            Self::DhcpExhausted { attempts } => {
                write!(f, "DHCP failed after {} attempts", attempts)
            }
        }
    }
}

impl core::error::Error for FatalError {}
