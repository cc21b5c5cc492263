//! Chip bring-up
//!
//! Runs the hard-ordered sequence that must complete before any network
//! configuration:
//! 1. Reset pulse (low, then high and settle)
//! 2. Bus registration with the driver
//! 3. Socket memory sizing
//! 4. PHY link wait
//! 5. Version register check
//!
//! A successful run yields [`ChipReady`], the only way to obtain one, and
//! a [`NetworkSession`](crate::session::NetworkSession) cannot be built
//! without it.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use wizlink_hal::{ChipControl, PhyLink};

use crate::config::BringUpConfig;
use crate::error::FatalError;

/// Proof that the chip was reset, configured, linked and identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipReady {
    chip_id: String<8>,
    version: u8,
}

impl ChipReady {
    pub(crate) fn new(id: &str, version: u8) -> Self {
        let mut chip_id = String::new();
        for c in id.chars() {
            if chip_id.push(c).is_err() {
                break;
            }
        }
        Self { chip_id, version }
    }

    /// Chip model name reported by the driver
    pub fn chip_id(&self) -> &str {
        &self.chip_id
    }

    /// Version register value
    pub fn version(&self) -> u8 {
        self.version
    }
}

/// Bring the chip up
///
/// Every step is a precondition for the next; the first failure is
/// returned as a [`FatalError`] and nothing after it runs.
pub async fn bring_up<C, R, D>(
    chip: &mut C,
    bus: C::Bus,
    reset: &mut R,
    delay: &mut D,
    config: &BringUpConfig,
) -> Result<ChipReady, FatalError>
where
    C: ChipControl,
    R: OutputPin,
    D: DelayNs,
{
    info!("Performing chip hardware reset...");
    reset.set_low().map_err(|_| FatalError::ResetLine)?;
    delay.delay_ms(config.reset_low_ms).await;
    reset.set_high().map_err(|_| FatalError::ResetLine)?;
    delay.delay_ms(config.reset_settle_ms).await;

    chip.register(bus);

    chip.init_memory(&config.memory).map_err(|e| {
        error!("Chip initialization failed: {:?}", e);
        FatalError::ChipInit(e)
    })?;

    info!("Waiting for PHY link...");
    loop {
        match chip.phy_link() {
            Ok(PhyLink::Up) => break,
            Ok(PhyLink::Down) => delay.delay_ms(config.link_poll_interval_ms).await,
            Err(e) => {
                error!("Unknown PHY link status: {:?}", e);
                return Err(FatalError::PhyLink(e));
            }
        }
    }
    info!("PHY link is up");

    let found = chip.version().map_err(FatalError::ChipAccess)?;
    if found != config.expected_version {
        error!(
            "Version register mismatch: expected {:#x}, read {:#x}",
            config.expected_version, found
        );
        return Err(FatalError::ChipIdentityMismatch {
            expected: config.expected_version,
            found,
        });
    }

    let ready = ChipReady::new(chip.chip_id(), found);
    info!("{} ready (version {:#x})", ready.chip_id(), found);
    Ok(ready)
}
