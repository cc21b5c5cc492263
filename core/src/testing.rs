//! Hand-written collaborator fakes for host tests

use core::convert::Infallible;
use std::collections::VecDeque;
use std::format;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use wizlink_hal::{
    ChipBus, ChipControl, ChipError, DhcpClient, DhcpStatus, HttpResponse, HttpsClient, Lease,
    MacAddress, MemoryLayout, NetInfo, NetInfoRegisters, PhyLink, RequestError, RequestLimits,
    SocketHandle, TlsRequestContext, Url,
};

/// Counts transactions; reads return zero
#[derive(Debug, Default)]
pub struct FakeBus {
    pub selected: bool,
    pub bytes: usize,
}

impl ChipBus for FakeBus {
    fn select(&mut self) {
        self.selected = true;
    }

    fn deselect(&mut self) {
        self.selected = false;
    }

    fn read_byte(&mut self) -> u8 {
        self.bytes += 1;
        0
    }

    fn write_byte(&mut self, _byte: u8) {
        self.bytes += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipCall {
    Register,
    InitMemory,
    PhyLink,
    Version,
}

/// Chip driver fake; refuses every call before registration
pub struct FakeChip {
    pub calls: Vec<ChipCall>,
    pub bus: Option<FakeBus>,
    pub bus_transactions: usize,
    pub init_result: Result<(), ChipError>,
    pub link_result: Result<(), ChipError>,
    pub link_down_polls: usize,
    pub version: u8,
    pub id: &'static str,
}

impl FakeChip {
    pub fn w5100s() -> Self {
        Self {
            calls: Vec::new(),
            bus: None,
            bus_transactions: 0,
            init_result: Ok(()),
            link_result: Ok(()),
            link_down_polls: 0,
            version: 0x51,
            id: "W5100S",
        }
    }

    fn bus(&mut self) -> Result<&mut FakeBus, ChipError> {
        let bus = self.bus.as_mut().ok_or(ChipError::NotRegistered)?;
        self.bus_transactions += 1;
        bus.transaction(|bus| bus.write_burst(&[0x00, 0x00, 0x00]));
        Ok(bus)
    }
}

impl ChipControl for FakeChip {
    type Bus = FakeBus;

    fn register(&mut self, bus: FakeBus) {
        self.calls.push(ChipCall::Register);
        self.bus = Some(bus);
    }

    fn init_memory(&mut self, _layout: &MemoryLayout) -> Result<(), ChipError> {
        self.calls.push(ChipCall::InitMemory);
        self.bus()?;
        self.init_result
    }

    fn phy_link(&mut self) -> Result<PhyLink, ChipError> {
        self.calls.push(ChipCall::PhyLink);
        self.bus()?;
        self.link_result?;
        if self.link_down_polls > 0 {
            self.link_down_polls -= 1;
            return Ok(PhyLink::Down);
        }
        Ok(PhyLink::Up)
    }

    fn version(&mut self) -> Result<u8, ChipError> {
        self.calls.push(ChipCall::Version);
        self.bus()?;
        Ok(self.version)
    }

    fn chip_id(&self) -> &str {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

#[derive(Debug, Default)]
pub struct FakeResetPin {
    pub levels: Vec<PinLevel>,
}

impl ErrorType for FakeResetPin {
    type Error = Infallible;
}

impl OutputPin for FakeResetPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.push(PinLevel::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.push(PinLevel::High);
        Ok(())
    }
}

/// Records requested delays in milliseconds; returns immediately
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub calls_ms: Vec<u32>,
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls_ms.push(ms);
    }
}

#[derive(Debug, Default)]
pub struct FakeRegs {
    pub pushes: Vec<NetInfo>,
}

impl NetInfoRegisters for FakeRegs {
    fn set_net_info(&mut self, info: &NetInfo) {
        self.pushes.push(*info);
    }

    fn net_info(&self) -> NetInfo {
        self.pushes
            .last()
            .copied()
            .unwrap_or(crate::config::DEFAULT_IDENTITY.net_info())
    }
}

/// Replays a script of statuses; each entry may replace the current lease
pub struct FakeDhcp {
    pub script: VecDeque<(DhcpStatus, Option<Lease>)>,
    /// Status reported once the script runs out
    pub then: DhcpStatus,
    pub lease: Option<Lease>,
    pub polls: usize,
    pub inits: Vec<(SocketHandle, MacAddress)>,
    pub scratch_len: usize,
}

impl FakeDhcp {
    pub fn new(then: DhcpStatus) -> Self {
        Self {
            script: VecDeque::new(),
            then,
            lease: None,
            polls: 0,
            inits: Vec::new(),
            scratch_len: 0,
        }
    }

    /// `running` polls of `Running`, one `Assigned` carrying `lease`, then `Leased`
    pub fn binding_after(running: usize, lease: Lease) -> Self {
        let mut dhcp = Self::new(DhcpStatus::Leased);
        dhcp.push_n(DhcpStatus::Running, running);
        dhcp.push(DhcpStatus::Assigned, Some(lease));
        dhcp
    }

    pub fn push(&mut self, status: DhcpStatus, lease: Option<Lease>) {
        self.script.push_back((status, lease));
    }

    pub fn push_n(&mut self, status: DhcpStatus, n: usize) {
        for _ in 0..n {
            self.push(status, None);
        }
    }
}

impl DhcpClient for FakeDhcp {
    fn init(&mut self, socket: SocketHandle, mac: MacAddress) {
        self.inits.push((socket, mac));
    }

    async fn poll(&mut self, scratch: &mut [u8]) -> DhcpStatus {
        self.polls += 1;
        self.scratch_len = scratch.len();
        match self.script.pop_front() {
            Some((status, lease)) => {
                if lease.is_some() {
                    self.lease = lease;
                }
                status
            }
            None => self.then,
        }
    }

    fn lease(&self) -> Option<Lease> {
        self.lease
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsCall {
    pub socket: SocketHandle,
    /// `host:port` followed by the path
    pub url: String,
    pub limits: RequestLimits,
    pub use_client_certificate: bool,
}

/// Writes a canned response, cutting it at the buffer size
pub struct FakeHttps {
    pub response: Result<&'static [u8], RequestError>,
    pub calls: Vec<HttpsCall>,
}

impl FakeHttps {
    pub fn responding(body: &'static [u8]) -> Self {
        Self {
            response: Ok(body),
            calls: Vec::new(),
        }
    }

    pub fn failing(error: RequestError) -> Self {
        Self {
            response: Err(error),
            calls: Vec::new(),
        }
    }
}

impl HttpsClient for FakeHttps {
    async fn get(
        &mut self,
        socket: SocketHandle,
        buf: &mut [u8],
        url: &Url<'_>,
        tls: &TlsRequestContext<'_>,
        limits: &RequestLimits,
    ) -> Result<HttpResponse, RequestError> {
        self.calls.push(HttpsCall {
            socket,
            url: format!("{}:{}{}", url.host, url.port, url.path),
            limits: *limits,
            use_client_certificate: tls.use_client_certificate,
        });
        let response = self.response?;
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        Ok(HttpResponse {
            len,
            truncated: response.len() > buf.len(),
        })
    }
}
