//! Address acquisition state machine
//!
//! Tracks the DHCP lease lifecycle from the status codes the client reports.
//! [`AddressAcquisition::step`] is a pure transition: it never sleeps and
//! never touches the client, so the owner decides when to poll and how long
//! to wait between polls.
//!
//! ```text
//! NotStarted --start--> Running --Leased--> Bound
//!                          |  ^               |
//!                          |  +--Failed-------+   (lease lost, re-acquire)
//!                          +--Conflict--> Conflict   (terminal)
//!                          +--retries--> Failed      (terminal, initial only)
//! ```

use wizlink_hal::DhcpStatus;

/// Lease lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeaseState {
    NotStarted,
    Running,
    Bound,
    Conflict,
    Failed,
}

/// What the owner must do after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Not started; the status was ignored
    Idle,
    /// Keep polling
    Pending,
    /// A lease was granted or renewed with new values; read it and apply it
    Assign,
    /// The lease is bound
    Bound,
    /// Address conflict; halt
    Conflict,
    /// Initial acquisition ran out of retries
    Exhausted,
}

/// DHCP lease state machine
#[derive(Debug, Clone)]
pub struct AddressAcquisition {
    state: LeaseState,
    retry_limit: u8,
    failures: u8,
    ever_bound: bool,
}

impl AddressAcquisition {
    /// `retry_limit` consecutive failures end initial acquisition; 0 never does
    pub const fn new(retry_limit: u8) -> Self {
        Self {
            state: LeaseState::NotStarted,
            retry_limit,
            failures: 0,
            ever_bound: false,
        }
    }

    pub fn state(&self) -> LeaseState {
        self.state
    }

    /// Consecutive failed polls since the last success
    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn is_bound(&self) -> bool {
        self.state == LeaseState::Bound
    }

    /// Whether the owner should keep polling the client
    pub fn is_active(&self) -> bool {
        matches!(self.state, LeaseState::Running | LeaseState::Bound)
    }

    /// Enter `Running`; the client has just been initialized
    pub fn start(&mut self) {
        if self.state == LeaseState::NotStarted {
            self.state = LeaseState::Running;
            self.failures = 0;
        }
    }

    /// Apply one poll result
    pub fn step(&mut self, status: DhcpStatus) -> Step {
        match self.state {
            LeaseState::NotStarted => return Step::Idle,
            LeaseState::Conflict => return Step::Conflict,
            LeaseState::Failed => return Step::Exhausted,
            LeaseState::Running | LeaseState::Bound => {}
        }

        match status {
            DhcpStatus::Conflict => {
                self.state = LeaseState::Conflict;
                Step::Conflict
            }
            DhcpStatus::Assigned | DhcpStatus::Changed => {
                self.failures = 0;
                Step::Assign
            }
            DhcpStatus::Leased => {
                self.failures = 0;
                if self.state != LeaseState::Bound {
                    debug!("DHCP lease bound");
                }
                self.state = LeaseState::Bound;
                self.ever_bound = true;
                Step::Bound
            }
            DhcpStatus::Running => Step::Pending,
            DhcpStatus::Failed | DhcpStatus::Stopped => self.on_failure(),
        }
    }

    fn on_failure(&mut self) -> Step {
        if self.state == LeaseState::Bound {
            warn!("DHCP lease lost, re-acquiring");
            self.state = LeaseState::Running;
        }
        // Retries only bound the first acquisition
        if self.ever_bound || self.retry_limit == 0 {
            return Step::Pending;
        }
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.retry_limit {
            self.state = LeaseState::Failed;
            return Step::Exhausted;
        }
        Step::Pending
    }
}
