//! Identity registers and DHCP client on top of `embassy-net`
//!
//! With the chip in MACRAW mode the IPv4 configuration lives in the
//! software stack, so "pushing the network info" means setting the stack's
//! IPv4 config, and the DHCP client is the stack's own DHCPv4 socket.

use core::net::Ipv4Addr;

use defmt::{info, warn};
use embassy_net::{ConfigV4, DhcpConfig, Ipv4Cidr, Stack, StaticConfigV4};
use wizlink_hal::netinfo::{mask_to_prefix, prefix_to_mask};
use wizlink_hal::{
    AddressingMode, DhcpClient, DhcpStatus, Lease, LeaseTime, MacAddress, NetInfo,
    NetInfoRegisters, SocketHandle,
};

/// Network-info register set backed by the stack configuration
pub struct StackRegisters {
    stack: Stack<'static>,
    current: NetInfo,
}

impl StackRegisters {
    pub fn new(stack: Stack<'static>, initial: NetInfo) -> Self {
        Self {
            stack,
            current: initial,
        }
    }
}

impl NetInfoRegisters for StackRegisters {
    fn set_net_info(&mut self, info: &NetInfo) {
        self.current = *info;
        if info.mode == AddressingMode::Dhcp {
            // The DHCP socket has already installed the leased values
            return;
        }

        let Some(prefix) = mask_to_prefix(info.subnet) else {
            warn!("Subnet mask {} is not contiguous", info.subnet.octets());
            return;
        };
        let mut dns_servers = heapless::Vec::new();
        if !info.dns.is_unspecified() {
            let _ = dns_servers.push(info.dns);
        }
        self.stack.set_config_v4(ConfigV4::Static(StaticConfigV4 {
            address: Ipv4Cidr::new(info.ip, prefix),
            gateway: (!info.gateway.is_unspecified()).then_some(info.gateway),
            dns_servers,
        }));
        info!("Static IPv4 configuration applied");
    }

    fn net_info(&self) -> NetInfo {
        self.current
    }
}

/// DHCP client reporting lease changes seen in the stack configuration
pub struct StackDhcp {
    stack: Stack<'static>,
    last: Option<Lease>,
}

impl StackDhcp {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack, last: None }
    }
}

impl DhcpClient for StackDhcp {
    fn init(&mut self, socket: SocketHandle, mac: MacAddress) {
        info!("Starting DHCPv4 for {} on {}", mac.octets(), socket);
        self.last = None;
        self.stack
            .set_config_v4(ConfigV4::Dhcp(DhcpConfig::default()));
    }

    async fn poll(&mut self, _scratch: &mut [u8]) -> DhcpStatus {
        // Let the stack runner process pending frames first
        embassy_futures::yield_now().await;

        let current = self.stack.config_v4().map(|config| lease_from(&config));
        let status = match (self.last, current) {
            (None, None) => DhcpStatus::Running,
            (Some(_), None) => DhcpStatus::Failed,
            (None, Some(_)) => DhcpStatus::Assigned,
            (Some(last), Some(now)) if last != now => DhcpStatus::Changed,
            (Some(_), Some(_)) => DhcpStatus::Leased,
        };
        self.last = current;
        status
    }

    fn lease(&self) -> Option<Lease> {
        self.last
    }
}

fn lease_from(config: &StaticConfigV4) -> Lease {
    Lease {
        ip: config.address.address(),
        subnet: prefix_to_mask(config.address.prefix_len()),
        gateway: config.gateway.unwrap_or(Ipv4Addr::UNSPECIFIED),
        dns: config
            .dns_servers
            .first()
            .copied()
            .unwrap_or(Ipv4Addr::UNSPECIFIED),
        // embassy-net keeps the lease duration internal
        lease_time: LeaseTime::Unreported,
    }
}
