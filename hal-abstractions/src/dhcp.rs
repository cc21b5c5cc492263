//! DHCP client collaborator
//!
//! The client does not run on its own. The owner calls [`DhcpClient::poll`]
//! repeatedly; each call advances the exchange and reports a status code.
//! Assignment and conflict are reported through the status instead of
//! callbacks.

use core::future::Future;
use core::net::Ipv4Addr;

use crate::netinfo::MacAddress;
use crate::socket::SocketHandle;

/// Result of one DHCP poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DhcpStatus {
    /// Exchange timed out or was rejected
    Failed,
    /// Exchange in progress
    Running,
    /// A lease was granted on this poll
    Assigned,
    /// A renewal changed the leased address on this poll
    Changed,
    /// Lease is bound
    Leased,
    /// Client was stopped
    Stopped,
    /// The offered address is already in use on the segment
    Conflict,
}

impl core::fmt::Display for DhcpStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Running => write!(f, "running"),
            Self::Assigned => write!(f, "assigned"),
            Self::Changed => write!(f, "changed"),
            Self::Leased => write!(f, "leased"),
            Self::Stopped => write!(f, "stopped"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Duration of a granted lease
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeaseTime {
    Seconds(u32),
    Infinite,
    /// The client does not expose the lease duration
    Unreported,
}

impl core::fmt::Display for LeaseTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{} seconds", secs),
            Self::Infinite => write!(f, "infinite"),
            Self::Unreported => write!(f, "not reported"),
        }
    }
}

/// Parameters granted by the DHCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub lease_time: LeaseTime,
}

/// Poll-driven DHCP client
pub trait DhcpClient {
    /// Bind the exchange to its dedicated socket
    fn init(&mut self, socket: SocketHandle, mac: MacAddress);

    /// Advance the exchange by one step
    ///
    /// `scratch` is the process-lifetime protocol buffer; it is handed in on
    /// every poll rather than retained by the client.
    fn poll(&mut self, scratch: &mut [u8]) -> impl Future<Output = DhcpStatus>;

    /// Most recently granted lease
    fn lease(&self) -> Option<Lease>;
}
