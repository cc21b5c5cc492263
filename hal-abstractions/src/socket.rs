//! Hardware socket slots

/// One of the controller's fixed hardware socket slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketHandle(u8);

impl SocketHandle {
    /// Largest socket count of any supported chip (W5500)
    pub const MAX_SOCKETS: u8 = 8;

    /// `None` when `index` is not a valid slot
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::MAX_SOCKETS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "socket {}", self.0)
    }
}
