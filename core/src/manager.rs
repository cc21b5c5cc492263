//! Network configuration manager
//!
//! Pushes the identity record to the driver's network-info registers and
//! renders the diagnostic block shown after every (re)configuration.

use core::fmt::Write;

use wizlink_hal::NetInfoRegisters;

use crate::identity::NetworkIdentity;

const RULE: &str =
    "====================================================================================================";

/// Applies [`NetworkIdentity`] to the driver
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    pushes: u32,
}

impl ConfigurationManager {
    pub const fn new() -> Self {
        Self { pushes: 0 }
    }

    /// Write the identity to the driver in one call
    pub fn apply<N: NetInfoRegisters>(&mut self, regs: &mut N, identity: &NetworkIdentity) {
        regs.set_net_info(&identity.net_info());
        self.pushes += 1;
        debug!("Network info applied ({} pushes)", self.pushes);
    }

    /// Number of pushes so far
    pub fn pushes(&self) -> u32 {
        self.pushes
    }
}

/// Render the configuration block for operators
pub fn write_configuration_block<W: Write>(
    w: &mut W,
    chip_id: &str,
    identity: &NetworkIdentity,
) -> core::fmt::Result {
    writeln!(w, "{}", RULE)?;
    writeln!(w, " {} network configuration : {}", chip_id, identity.mode)?;
    writeln!(w)?;
    writeln!(w, " MAC         : {}", identity.mac())?;
    writeln!(w, " IP          : {}", identity.ip)?;
    writeln!(w, " Subnet Mask : {}", identity.subnet)?;
    writeln!(w, " Gateway     : {}", identity.gateway)?;
    writeln!(w, " DNS         : {}", identity.dns)?;
    writeln!(w, "{}", RULE)?;
    writeln!(w)
}
