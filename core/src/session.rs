//! Network session
//!
//! [`NetworkSession`] owns every piece of state the program needs after
//! bring-up: the identity record, the lease state machine, the scratch and
//! response buffers, and the collaborators. Nothing is global; the board
//! builds one session and drives it with [`NetworkSession::run`].
//!
//! Fatal conditions move the session into [`SessionPhase::Halted`]. A halted
//! session keeps returning the same error and makes no further calls into
//! its collaborators.

use core::convert::Infallible;
use core::fmt::Write;

use embedded_hal_async::delay::DelayNs;
use wizlink_hal::{
    AddressingMode, DhcpClient, DhcpStatus, HttpsClient, Lease, NetInfoRegisters, RequestError,
};

use crate::bringup::ChipReady;
use crate::config::{DhcpFallback, SessionConfig};
use crate::dhcp::{AddressAcquisition, Step};
use crate::error::FatalError;
use crate::identity::NetworkIdentity;
use crate::manager::{write_configuration_block, ConfigurationManager};
use crate::request::{RequestOutcome, SecureRequest};

/// Collaborators a session drives
pub struct SessionParts<N, D, H, Y, W> {
    /// Network-info register set
    pub regs: N,
    pub dhcp: D,
    pub https: H,
    pub delay: Y,
    /// Operator console for the diagnostic lines
    pub console: W,
}

/// Buffers allocated once for the lifetime of the program
pub struct SessionBuffers<'a> {
    /// Handed to the DHCP client on every poll
    pub scratch: &'a mut [u8],
    /// HTTPS response destination
    pub response: &'a mut [u8],
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionPhase {
    /// Addressing has not completed yet
    Unconfigured,
    /// Addressing is done; the request may be issued
    Ready,
    /// Terminal; no further network activity
    Halted(FatalError),
}

pub struct NetworkSession<'a, N, D, H, Y, W> {
    chip: ChipReady,
    config: SessionConfig,
    identity: NetworkIdentity,
    manager: ConfigurationManager,
    acquisition: AddressAcquisition,
    applied_lease: Option<Lease>,
    parts: SessionParts<N, D, H, Y, W>,
    buffers: SessionBuffers<'a>,
    phase: SessionPhase,
    request_issued: bool,
}

impl<'a, N, D, H, Y, W> NetworkSession<'a, N, D, H, Y, W>
where
    N: NetInfoRegisters,
    D: DhcpClient,
    H: HttpsClient,
    Y: DelayNs,
    W: Write,
{
    pub fn new(
        chip: ChipReady,
        config: &SessionConfig,
        parts: SessionParts<N, D, H, Y, W>,
        buffers: SessionBuffers<'a>,
    ) -> Self {
        Self {
            chip,
            config: *config,
            identity: config.identity,
            manager: ConfigurationManager::new(),
            acquisition: AddressAcquisition::new(config.dhcp_retry_count),
            applied_lease: None,
            parts,
            buffers,
            phase: SessionPhase::Unconfigured,
            request_issued: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn identity(&self) -> &NetworkIdentity {
        &self.identity
    }

    pub fn chip(&self) -> &ChipReady {
        &self.chip
    }

    pub fn acquisition(&self) -> &AddressAcquisition {
        &self.acquisition
    }

    pub fn parts(&self) -> &SessionParts<N, D, H, Y, W> {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut SessionParts<N, D, H, Y, W> {
        &mut self.parts
    }

    pub fn into_parts(self) -> SessionParts<N, D, H, Y, W> {
        self.parts
    }

    /// Configure addressing, then report the resulting configuration
    ///
    /// Static mode pushes the identity once. DHCP mode polls the client,
    /// one interval apart, until the lease is bound.
    pub async fn configure(&mut self) -> Result<(), FatalError> {
        match self.phase {
            SessionPhase::Halted(e) => return Err(e),
            SessionPhase::Ready => return Ok(()),
            SessionPhase::Unconfigured => {}
        }

        match self.identity.mode {
            AddressingMode::Static => self.apply_static(),
            AddressingMode::Dhcp => self.acquire().await?,
        }
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Issue the one HTTPS GET to the configured target
    ///
    /// Blocks all other network activity until it returns. The outcome is
    /// reported on the console either way.
    pub async fn request(&mut self) -> Result<RequestOutcome, RequestError> {
        if self.phase != SessionPhase::Ready {
            return Err(RequestError::NotConfigured);
        }
        if self.request_issued {
            return Err(RequestError::AlreadyIssued);
        }
        self.request_issued = true;

        let url = self.config.target_url;
        let result = SecureRequest::new(&self.config.tls, &self.config.limits)
            .get(
                &mut self.parts.https,
                self.config.http_socket,
                self.buffers.response,
                url,
            )
            .await;

        let console = &mut self.parts.console;
        let _ = match &result {
            Ok(RequestOutcome {
                status: Some(code),
                len,
                ..
            }) => writeln!(console, " HTTPS GET {} : HTTP {} ({} bytes)", url, code, len),
            Ok(outcome) => writeln!(
                console,
                " HTTPS GET {} : no status line ({} bytes)",
                url, outcome.len
            ),
            Err(e) => writeln!(console, " HTTPS GET {} failed : {}", url, e),
        };
        if let Ok(outcome) = &result {
            if outcome.truncated {
                let _ = writeln!(console, " HTTPS response truncated at {} bytes", outcome.len);
            }
        }
        result
    }

    /// One iteration of the idle loop
    ///
    /// In DHCP mode the client is polled exactly once so the lease keeps
    /// renewing; the loop interval follows in every mode.
    pub async fn idle_step(&mut self) -> Result<(), FatalError> {
        if let SessionPhase::Halted(e) = self.phase {
            return Err(e);
        }

        if self.identity.mode == AddressingMode::Dhcp && self.acquisition.is_active() {
            let status = self.parts.dhcp.poll(self.buffers.scratch).await;
            trace!("DHCP idle poll: {:?}", status);
            let status = self.settled(status);
            let step = self.acquisition.step(status);
            self.on_step(step)?;
        }

        self.parts
            .delay
            .delay_ms(self.config.idle_poll_interval_ms)
            .await;
        Ok(())
    }

    /// Configure, issue the request once, then idle forever
    ///
    /// Returns only when the session halts. A failed request is reported
    /// and does not stop the idle loop.
    pub async fn run(&mut self) -> Result<Infallible, FatalError> {
        self.configure().await?;
        if let Err(e) = self.request().await {
            warn!("Continuing without a response: {:?}", e);
        }
        loop {
            self.idle_step().await?;
        }
    }

    async fn acquire(&mut self) -> Result<(), FatalError> {
        self.parts
            .dhcp
            .init(self.config.dhcp_socket, self.identity.mac());
        self.acquisition.start();
        info!("DHCP client running on {:?}", self.config.dhcp_socket);

        loop {
            let status = self.parts.dhcp.poll(self.buffers.scratch).await;
            let _ = writeln!(self.parts.console, " DHCP poll : {}", status);
            let status = self.settled(status);
            let step = self.acquisition.step(status);
            if self.on_step(step)? {
                return Ok(());
            }
            self.parts
                .delay
                .delay_ms(self.config.dhcp_poll_interval_ms)
                .await;
        }
    }

    /// A binding counts only once there is a lease to apply
    fn settled(&self, status: DhcpStatus) -> DhcpStatus {
        if status == DhcpStatus::Leased
            && self.applied_lease.is_none()
            && self.parts.dhcp.lease().is_none()
        {
            warn!("DHCP reported a binding without lease data");
            return DhcpStatus::Running;
        }
        status
    }

    /// React to a state machine step; `Ok(true)` once addressing is settled
    fn on_step(&mut self, step: Step) -> Result<bool, FatalError> {
        match step {
            Step::Idle | Step::Pending => Ok(false),
            Step::Assign => {
                self.on_assign();
                Ok(false)
            }
            Step::Bound => {
                // Some clients report the binding without a separate assignment
                let lease = self.parts.dhcp.lease();
                if lease.is_some() && lease != self.applied_lease {
                    self.on_assign();
                }
                Ok(true)
            }
            Step::Conflict => Err(self.halt(FatalError::AddressConflict)),
            Step::Exhausted => match self.config.dhcp_fallback {
                DhcpFallback::Static => {
                    warn!(
                        "DHCP failed {} times, falling back to static addressing",
                        self.acquisition.failures()
                    );
                    let _ = writeln!(
                        self.parts.console,
                        " DHCP failed, using static configuration"
                    );
                    self.identity.mode = AddressingMode::Static;
                    self.apply_static();
                    Ok(true)
                }
                DhcpFallback::Halt => Err(self.halt(FatalError::DhcpExhausted {
                    attempts: self.acquisition.failures(),
                })),
            },
        }
    }

    fn on_assign(&mut self) {
        let Some(lease) = self.parts.dhcp.lease() else {
            warn!("DHCP reported an assignment without lease data");
            return;
        };
        self.identity.apply_lease(&lease);
        self.manager.apply(&mut self.parts.regs, &self.identity);
        self.applied_lease = Some(lease);
        let _ = write_configuration_block(
            &mut self.parts.console,
            self.chip.chip_id(),
            &self.identity,
        );
        let _ = writeln!(
            self.parts.console,
            " DHCP leased time : {}",
            lease.lease_time
        );
    }

    fn apply_static(&mut self) {
        self.manager.apply(&mut self.parts.regs, &self.identity);
        let _ = write_configuration_block(
            &mut self.parts.console,
            self.chip.chip_id(),
            &self.identity,
        );
    }

    fn halt(&mut self, e: FatalError) -> FatalError {
        error!("Network session halted: {:?}", e);
        let _ = writeln!(self.parts.console, " {}", e);
        self.phase = SessionPhase::Halted(e);
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bringup::bring_up;
    use crate::config::{BringUpConfig, DEFAULT_IDENTITY};
    use crate::testing::{
        FakeBus, FakeChip, FakeDelay, FakeDhcp, FakeHttps, FakeRegs, FakeResetPin,
    };
    use core::net::Ipv4Addr;
    use embassy_futures::block_on;
    use std::string::String;
    use wizlink_hal::{DhcpStatus, LeaseTime, MacAddress};

    type TestSession<'a> = NetworkSession<'a, FakeRegs, FakeDhcp, FakeHttps, FakeDelay, String>;
    type TestParts = SessionParts<FakeRegs, FakeDhcp, FakeHttps, FakeDelay, String>;

    const MAC: MacAddress = MacAddress([0x00, 0x08, 0xDC, 0x12, 0x34, 0x56]);
    const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";

    const LEASE: Lease = Lease {
        ip: Ipv4Addr::new(192, 168, 0, 100),
        subnet: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 0, 1),
        dns: Ipv4Addr::new(192, 168, 0, 1),
        lease_time: LeaseTime::Seconds(7200),
    };

    const RENEWED: Lease = Lease {
        ip: Ipv4Addr::new(192, 168, 0, 101),
        subnet: Ipv4Addr::new(255, 255, 0, 0),
        gateway: Ipv4Addr::new(192, 168, 0, 254),
        dns: Ipv4Addr::new(1, 1, 1, 1),
        lease_time: LeaseTime::Infinite,
    };

    fn static_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.identity.mode = AddressingMode::Static;
        config
    }

    fn session<'a>(
        config: &SessionConfig,
        dhcp: FakeDhcp,
        https: FakeHttps,
        buffers: SessionBuffers<'a>,
    ) -> TestSession<'a> {
        NetworkSession::new(
            ChipReady::new("W5100S", 0x51),
            config,
            SessionParts {
                regs: FakeRegs::default(),
                dhcp,
                https,
                delay: FakeDelay::default(),
                console: String::new(),
            },
            buffers,
        )
    }

    #[test]
    fn test_mac_survives_dhcp_events() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &SessionConfig::default(),
            FakeDhcp::binding_after(2, LEASE),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        block_on(s.configure()).unwrap();
        assert_eq!(s.identity().mac(), MAC);
        assert_eq!(s.identity().ip, LEASE.ip);

        s.parts_mut().dhcp.push(DhcpStatus::Changed, Some(RENEWED));
        for _ in 0..5 {
            block_on(s.idle_step()).unwrap();
        }
        assert_eq!(s.identity().ip, RENEWED.ip);
        assert_eq!(s.identity().dns, RENEWED.dns);
        assert_eq!(s.identity().mac(), MAC);
        assert_eq!(s.parts().regs.pushes.len(), 2);
        assert!(s.parts().regs.pushes.iter().all(|p| p.mac == MAC));
        assert_eq!(s.parts().dhcp.inits[0].1, MAC);
    }

    #[test]
    fn test_static_pushes_exactly_once() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &static_config(),
            FakeDhcp::new(DhcpStatus::Leased),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        block_on(s.configure()).unwrap();
        assert_eq!(s.parts().regs.pushes.len(), 1);
        block_on(s.request()).unwrap();
        for _ in 0..100 {
            block_on(s.idle_step()).unwrap();
        }

        assert_eq!(s.parts().regs.pushes.len(), 1);
        assert_eq!(s.parts().dhcp.polls, 0);
        assert!(s.parts().dhcp.inits.is_empty());
        assert_eq!(s.parts().delay.calls_ms.len(), 100);
    }

    #[test]
    fn test_dhcp_polled_every_idle_iteration() {
        for iterations in [0usize, 1, 7, 50] {
            let mut scratch = [0u8; 32];
            let mut response = [0u8; 128];
            let mut s = session(
                &SessionConfig::default(),
                FakeDhcp::binding_after(0, LEASE),
                FakeHttps::responding(OK_RESPONSE),
                SessionBuffers {
                    scratch: &mut scratch,
                    response: &mut response,
                },
            );
            block_on(s.configure()).unwrap();
            block_on(s.request()).unwrap();

            let before = s.parts().dhcp.polls;
            for _ in 0..iterations {
                block_on(s.idle_step()).unwrap();
            }
            assert_eq!(s.parts().dhcp.polls - before, iterations);
            assert_eq!(s.parts().dhcp.scratch_len, 32);
        }
    }

    #[test]
    fn test_lost_lease_keeps_polling() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &SessionConfig::default(),
            FakeDhcp::binding_after(0, LEASE),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );
        block_on(s.configure()).unwrap();

        let dhcp = &mut s.parts_mut().dhcp;
        dhcp.push_n(DhcpStatus::Failed, 20);
        dhcp.push(DhcpStatus::Assigned, Some(RENEWED));
        for _ in 0..22 {
            block_on(s.idle_step()).unwrap();
        }
        assert!(s.acquisition().is_bound());
        assert_eq!(s.identity().ip, RENEWED.ip);
    }

    #[test]
    fn test_binds_on_nth_poll() {
        for n in [1usize, 5, 10] {
            let mut scratch = [0u8; 32];
            let mut response = [0u8; 128];
            let mut dhcp = FakeDhcp::new(DhcpStatus::Leased);
            dhcp.push_n(DhcpStatus::Running, n - 1);
            dhcp.lease = Some(LEASE);
            let config = SessionConfig::default();
            let mut s = session(
                &config,
                dhcp,
                FakeHttps::responding(OK_RESPONSE),
                SessionBuffers {
                    scratch: &mut scratch,
                    response: &mut response,
                },
            );

            block_on(s.configure()).unwrap();

            assert_eq!(s.parts().dhcp.polls, n);
            assert_eq!(s.parts().delay.calls_ms.len(), n - 1);
            assert!(s
                .parts()
                .delay
                .calls_ms
                .iter()
                .all(|&ms| ms == config.dhcp_poll_interval_ms));
            assert!(s.parts().https.calls.is_empty());
            assert_eq!(s.phase(), SessionPhase::Ready);
            assert_eq!(s.identity().ip, LEASE.ip);
        }
    }

    #[test]
    fn test_binding_without_lease_data_keeps_polling() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut dhcp = FakeDhcp::new(DhcpStatus::Leased);
        dhcp.push_n(DhcpStatus::Leased, 3);
        dhcp.push(DhcpStatus::Assigned, Some(LEASE));
        let mut s = session(
            &SessionConfig::default(),
            dhcp,
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        assert_eq!(
            block_on(s.request()),
            Err(RequestError::NotConfigured)
        );
        block_on(s.configure()).unwrap();

        assert_eq!(s.parts().dhcp.polls, 5);
        assert_eq!(s.parts().regs.pushes.len(), 1);
        assert_eq!(s.parts().regs.pushes[0].ip, LEASE.ip);
        assert_eq!(s.identity().ip, LEASE.ip);
        assert!(s.parts().console.contains(" DHCP leased time : "));
        assert!(s.parts().https.calls.is_empty());

        block_on(s.request()).unwrap();
        assert_eq!(s.parts().https.calls.len(), 1);
    }

    #[test]
    fn test_poll_results_and_lease_time_are_reported() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &SessionConfig::default(),
            FakeDhcp::binding_after(1, LEASE),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );
        block_on(s.configure()).unwrap();

        let out = &s.parts().console;
        assert!(out.contains(" DHCP poll : running\n"));
        assert!(out.contains(" DHCP poll : assigned\n"));
        assert!(out.contains(" DHCP poll : leased\n"));
        assert!(out.contains(" W5100S network configuration : DHCP\n"));
        assert!(out.contains(" IP          : 192.168.0.100\n"));
        assert!(out.contains(" DHCP leased time : 7200 seconds\n"));
        // Bound after an explicit assignment does not push twice
        assert_eq!(s.parts().regs.pushes.len(), 1);
    }

    #[test]
    fn test_conflict_during_acquisition_halts() {
        for polls_before in [0usize, 3] {
            let mut scratch = [0u8; 32];
            let mut response = [0u8; 128];
            let mut dhcp = FakeDhcp::new(DhcpStatus::Leased);
            dhcp.push_n(DhcpStatus::Running, polls_before);
            dhcp.push(DhcpStatus::Conflict, None);
            let mut s = session(
                &SessionConfig::default(),
                dhcp,
                FakeHttps::responding(OK_RESPONSE),
                SessionBuffers {
                    scratch: &mut scratch,
                    response: &mut response,
                },
            );

            assert_eq!(block_on(s.run()), Err(FatalError::AddressConflict));
            let polls = s.parts().dhcp.polls;
            assert_eq!(polls, polls_before + 1);

            assert_eq!(block_on(s.idle_step()), Err(FatalError::AddressConflict));
            assert_eq!(block_on(s.request()), Err(RequestError::NotConfigured));
            assert_eq!(block_on(s.configure()), Err(FatalError::AddressConflict));
            assert_eq!(s.parts().dhcp.polls, polls);
            assert!(s.parts().https.calls.is_empty());
            assert_eq!(
                s.phase(),
                SessionPhase::Halted(FatalError::AddressConflict)
            );
            assert!(s.parts().console.contains(" Conflict IP from DHCP\n"));
        }
    }

    #[test]
    fn test_conflict_after_binding_halts() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut dhcp = FakeDhcp::binding_after(0, LEASE);
        // One poll binds, three idle polls keep the lease, then the conflict
        dhcp.push_n(DhcpStatus::Leased, 4);
        dhcp.push(DhcpStatus::Conflict, None);
        let mut s = session(
            &SessionConfig::default(),
            dhcp,
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        assert_eq!(block_on(s.run()), Err(FatalError::AddressConflict));
        assert_eq!(s.parts().https.calls.len(), 1);
        let polls = s.parts().dhcp.polls;
        for _ in 0..10 {
            assert_eq!(block_on(s.idle_step()), Err(FatalError::AddressConflict));
        }
        assert_eq!(s.parts().dhcp.polls, polls);
        assert_eq!(s.parts().https.calls.len(), 1);
    }

    /// Boot the way a board does: a session exists only after bring-up succeeds
    fn boot(version: u8) -> (Result<ChipReady, FatalError>, TestParts) {
        let mut chip = FakeChip::w5100s();
        chip.version = version;
        let result = block_on(bring_up(
            &mut chip,
            FakeBus::default(),
            &mut FakeResetPin::default(),
            &mut FakeDelay::default(),
            &BringUpConfig::default(),
        ));
        let parts = SessionParts {
            regs: FakeRegs::default(),
            dhcp: FakeDhcp::binding_after(0, LEASE),
            https: FakeHttps::responding(OK_RESPONSE),
            delay: FakeDelay::default(),
            console: String::new(),
        };

        let parts = match result.clone() {
            Ok(ready) => {
                let mut scratch = [0u8; 32];
                let mut response = [0u8; 128];
                let mut s = NetworkSession::new(
                    ready,
                    &SessionConfig::default(),
                    parts,
                    SessionBuffers {
                        scratch: &mut scratch,
                        response: &mut response,
                    },
                );
                let _ = block_on(s.configure());
                s.into_parts()
            }
            Err(_) => parts,
        };
        (result, parts)
    }

    #[test]
    fn test_version_mismatch_stops_before_configuration() {
        let (result, parts) = boot(0x04);
        assert_eq!(
            result,
            Err(FatalError::ChipIdentityMismatch {
                expected: 0x51,
                found: 0x04
            })
        );
        assert!(parts.regs.pushes.is_empty());
        assert_eq!(parts.dhcp.polls, 0);
        assert!(parts.dhcp.inits.is_empty());

        let (result, parts) = boot(0x51);
        assert!(result.is_ok());
        assert_eq!(parts.regs.pushes.len(), 1);
        assert_eq!(parts.dhcp.inits.len(), 1);
    }

    #[test]
    fn test_static_end_to_end() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let config = static_config();
        let mut s = session(
            &config,
            FakeDhcp::new(DhcpStatus::Leased),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        block_on(s.configure()).unwrap();
        let outcome = block_on(s.request()).unwrap();
        for _ in 0..3 {
            block_on(s.idle_step()).unwrap();
        }

        let mut expected = DEFAULT_IDENTITY;
        expected.mode = AddressingMode::Static;
        assert_eq!(s.parts().regs.pushes, [expected.net_info()]);
        let pushed = s.parts().regs.pushes[0];
        assert_eq!(pushed.mac, MAC);
        assert_eq!(pushed.ip, Ipv4Addr::new(192, 168, 1, 15));
        assert_eq!(pushed.subnet, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(pushed.gateway, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(pushed.dns, Ipv4Addr::new(8, 8, 8, 8));

        let rule = "=".repeat(100);
        let block = std::format!(
            "{rule}\n \
             W5100S network configuration : static\n\
             \n \
             MAC         : 00:08:DC:12:34:56\n \
             IP          : 192.168.1.15\n \
             Subnet Mask : 255.255.255.0\n \
             Gateway     : 192.168.1.1\n \
             DNS         : 8.8.8.8\n\
             {rule}\n\n"
        );
        assert!(s.parts().console.starts_with(&block));
        assert!(s
            .parts()
            .console
            .contains(" HTTPS GET https://www.wiznet.io/ : HTTP 200 ("));

        assert_eq!(s.parts().https.calls.len(), 1);
        assert_eq!(s.parts().https.calls[0].url, "www.wiznet.io:443/");
        assert_eq!(s.parts().https.calls[0].socket, config.http_socket);
        assert_eq!(outcome.status, Some(200));
        assert_eq!(block_on(s.request()), Err(RequestError::AlreadyIssued));
        assert_eq!(s.parts().https.calls.len(), 1);
    }

    #[test]
    fn test_request_requires_configuration() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &static_config(),
            FakeDhcp::new(DhcpStatus::Leased),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );
        assert_eq!(block_on(s.request()), Err(RequestError::NotConfigured));
        assert!(s.parts().https.calls.is_empty());
    }

    #[test]
    fn test_request_failure_is_reported_and_idle_continues() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut s = session(
            &static_config(),
            FakeDhcp::new(DhcpStatus::Leased),
            FakeHttps::failing(RequestError::Timeout),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );
        block_on(s.configure()).unwrap();

        assert_eq!(block_on(s.request()), Err(RequestError::Timeout));
        assert!(s
            .parts()
            .console
            .contains(" HTTPS GET https://www.wiznet.io/ failed : "));
        assert_eq!(block_on(s.idle_step()), Ok(()));
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_truncated_response_is_reported() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 24];
        let mut s = session(
            &static_config(),
            FakeDhcp::new(DhcpStatus::Leased),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );
        block_on(s.configure()).unwrap();

        let outcome = block_on(s.request()).unwrap();
        assert!(outcome.truncated);
        assert!(s
            .parts()
            .console
            .contains(" HTTPS response truncated at 24 bytes\n"));
    }

    #[test]
    fn test_exhaustion_falls_back_to_static() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut config = SessionConfig::default();
        config.dhcp_retry_count = 3;
        let mut s = session(
            &config,
            FakeDhcp::new(DhcpStatus::Failed),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        block_on(s.configure()).unwrap();
        assert_eq!(s.parts().dhcp.polls, 3);
        assert_eq!(s.identity().mode, AddressingMode::Static);
        assert_eq!(s.parts().regs.pushes.len(), 1);
        assert_eq!(s.parts().regs.pushes[0].ip, DEFAULT_IDENTITY.ip);

        for _ in 0..5 {
            block_on(s.idle_step()).unwrap();
        }
        assert_eq!(s.parts().dhcp.polls, 3);
    }

    #[test]
    fn test_exhaustion_can_halt() {
        let mut scratch = [0u8; 32];
        let mut response = [0u8; 128];
        let mut config = SessionConfig::default();
        config.dhcp_retry_count = 2;
        config.dhcp_fallback = DhcpFallback::Halt;
        let mut s = session(
            &config,
            FakeDhcp::new(DhcpStatus::Stopped),
            FakeHttps::responding(OK_RESPONSE),
            SessionBuffers {
                scratch: &mut scratch,
                response: &mut response,
            },
        );

        let halted = FatalError::DhcpExhausted { attempts: 2 };
        assert_eq!(block_on(s.run()), Err(halted));
        assert_eq!(s.phase(), SessionPhase::Halted(halted));
        assert!(s.parts().regs.pushes.is_empty());
        assert!(s.parts().https.calls.is_empty());
    }
}
