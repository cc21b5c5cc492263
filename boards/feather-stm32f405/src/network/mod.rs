//! Collaborators backed by the W5500 packet driver and `embassy-net`

mod https;
mod socket;
mod stack;

pub use https::TlsHttpsClient;
pub use stack::{StackDhcp, StackRegisters};
