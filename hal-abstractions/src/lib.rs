//! Collaborator interfaces for WIZnet W5x00 network bring-up
//!
//! This crate defines the seams between the platform-agnostic orchestration
//! logic in `wizlink-core` and the pieces a board provides:
//! - **`bus`**: chip-select and byte/burst SPI access plus the bus critical section
//! - **`chip`**: chip control registers (memory sizing, PHY link, version)
//! - **`netinfo`**: the network-info register set (MAC/IP/subnet/gateway/DNS/mode)
//! - **`dhcp`**: the DHCP client collaborator polled by the lease state machine
//! - **`https`**: the blocking HTTPS GET collaborator and its TLS context
//! - **`url`**, **`socket`**: shared value types
//! - **`w5500`**: register driver for the W5500 over any `ChipBus`
//!
//! BSPs implement these traits; tests implement them with fakes.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod chip;
pub mod dhcp;
pub mod https;
pub mod netinfo;
pub mod socket;
pub mod url;
pub mod w5500;

pub use bus::{ChipBus, SpiChipBus};
pub use chip::{ChipControl, ChipError, MemoryLayout, PhyLink};
pub use dhcp::{DhcpClient, DhcpStatus, Lease, LeaseTime};
pub use https::{
    CertificateMaterial, HttpResponse, HttpsClient, RequestError, RequestLimits, RootCaPolicy,
    TlsRequestContext,
};
pub use netinfo::{AddressingMode, MacAddress, NetInfo, NetInfoRegisters};
pub use socket::SocketHandle;
pub use url::{Scheme, Url, UrlError};
pub use w5500::W5500;
