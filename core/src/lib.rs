//! Platform-agnostic orchestration for WIZnet W5x00 network bring-up
//!
//! - [`bringup`]: reset, bus registration, memory sizing, PHY link and version check
//! - [`manager`]: pushes the network identity to the chip and prints it
//! - [`dhcp`]: the lease state machine
//! - [`request`]: the one-shot HTTPS GET
//! - [`session`]: owns all of the above after bring-up and runs the idle loop
//!
//! Everything here is written against the traits in `wizlink-hal` and runs
//! on the host under test.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible in every module
#[macro_use]
mod fmt;

pub mod bringup;
pub mod config;
pub mod dhcp;
pub mod error;
pub mod identity;
pub mod manager;
pub mod request;
pub mod session;

#[cfg(test)]
mod testing;

pub use bringup::{bring_up, ChipReady};
pub use config::{BringUpConfig, DhcpFallback, SessionConfig};
pub use dhcp::{AddressAcquisition, LeaseState, Step};
pub use error::FatalError;
pub use identity::NetworkIdentity;
pub use manager::{write_configuration_block, ConfigurationManager};
pub use request::{RequestOutcome, SecureRequest};
pub use session::{NetworkSession, SessionBuffers, SessionParts, SessionPhase};
