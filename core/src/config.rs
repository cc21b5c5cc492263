//! Compile-time configuration surface
//!
//! Defaults target a W5100S with the WIZnet demo identity; boards override
//! what differs for their chip.

use core::net::Ipv4Addr;

use wizlink_hal::{
    AddressingMode, MacAddress, MemoryLayout, RequestLimits, SocketHandle, TlsRequestContext,
};

use crate::identity::NetworkIdentity;

/// Protocol scratch buffer size handed to the DHCP client
pub const ETHERNET_BUF_MAX_SIZE: usize = 1024 * 2;

/// HTTP response buffer size
pub const HTTP_BUF_SIZE: usize = 1024 * 2;

/// Socket slot reserved for the DHCP exchange
pub const SOCKET_DHCP: SocketHandle = match SocketHandle::new(1) {
    Some(s) => s,
    None => panic!("invalid DHCP socket"),
};

/// Socket slot reserved for the application request
pub const SOCKET_HTTP: SocketHandle = match SocketHandle::new(0) {
    Some(s) => s,
    None => panic!("invalid HTTP socket"),
};

/// Default request target
pub const HTTP_GET_URL: &str = "https://www.wiznet.io/";

/// Identity used for static addressing (and as the DHCP fallback)
pub const DEFAULT_IDENTITY: NetworkIdentity = NetworkIdentity::new(
    MacAddress([0x00, 0x08, 0xDC, 0x12, 0x34, 0x56]),
    Ipv4Addr::new(192, 168, 1, 15),
    Ipv4Addr::new(255, 255, 255, 0),
    Ipv4Addr::new(192, 168, 1, 1),
    Ipv4Addr::new(8, 8, 8, 8),
    AddressingMode::Dhcp,
);

/// Chip bring-up timing and expectations
#[derive(Debug, Clone, Copy)]
pub struct BringUpConfig {
    /// Reset held low, in milliseconds
    pub reset_low_ms: u32,
    /// Time after reset release before the first bus access
    pub reset_settle_ms: u32,
    /// Socket buffer allocation
    pub memory: MemoryLayout,
    /// Expected version register value (0x51 = W5100S, 0x04 = W5500)
    pub expected_version: u8,
    /// Delay between PHY link queries
    pub link_poll_interval_ms: u32,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            reset_low_ms: 100,
            reset_settle_ms: 100,
            memory: MemoryLayout::W5100S_DEFAULT,
            expected_version: 0x51,
            link_poll_interval_ms: 10,
        }
    }
}

/// What to do when initial DHCP acquisition exhausts its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DhcpFallback {
    /// Apply the configured static identity and stop DHCP
    Static,
    /// Halt with `FatalError::DhcpExhausted`
    Halt,
}

/// Network session configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Identity record; its mode selects static or DHCP addressing
    pub identity: NetworkIdentity,
    pub dhcp_socket: SocketHandle,
    pub http_socket: SocketHandle,
    /// Consecutive failed polls tolerated during initial acquisition (0 = no bound)
    pub dhcp_retry_count: u8,
    pub dhcp_fallback: DhcpFallback,
    /// Delay between polls while acquiring
    pub dhcp_poll_interval_ms: u32,
    /// Delay at the end of every idle iteration
    pub idle_poll_interval_ms: u32,
    pub target_url: &'static str,
    pub tls: TlsRequestContext<'static>,
    pub limits: RequestLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY,
            dhcp_socket: SOCKET_DHCP,
            http_socket: SOCKET_HTTP,
            dhcp_retry_count: 10,
            dhcp_fallback: DhcpFallback::Static,
            dhcp_poll_interval_ms: 1000,
            idle_poll_interval_ms: 1000,
            target_url: HTTP_GET_URL,
            tls: TlsRequestContext::INSECURE,
            limits: RequestLimits::default(),
        }
    }
}
