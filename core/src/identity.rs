//! Process-wide network identity record

use core::net::Ipv4Addr;

use wizlink_hal::{AddressingMode, Lease, MacAddress, NetInfo};

/// MAC, IPv4 parameters and addressing mode of this node
///
/// The MAC is fixed at construction; there is no way to change it
/// afterwards. The IPv4 fields are meaningful once a static configuration
/// has been applied or a lease is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    mac: MacAddress,
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub mode: AddressingMode,
}

impl NetworkIdentity {
    pub const fn new(
        mac: MacAddress,
        ip: Ipv4Addr,
        subnet: Ipv4Addr,
        gateway: Ipv4Addr,
        dns: Ipv4Addr,
        mode: AddressingMode,
    ) -> Self {
        Self {
            mac,
            ip,
            subnet,
            gateway,
            dns,
            mode,
        }
    }

    pub const fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Overwrite the IPv4 parameters from a DHCP lease
    pub fn apply_lease(&mut self, lease: &Lease) {
        self.ip = lease.ip;
        self.gateway = lease.gateway;
        self.subnet = lease.subnet;
        self.dns = lease.dns;
        self.mode = AddressingMode::Dhcp;
    }

    /// Register-set view for the driver
    pub fn net_info(&self) -> NetInfo {
        NetInfo {
            mac: self.mac,
            ip: self.ip,
            subnet: self.subnet,
            gateway: self.gateway,
            dns: self.dns,
            mode: self.mode,
        }
    }
}
