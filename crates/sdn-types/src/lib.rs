//! Common types for the L2 forwarding controller.
//!
//! This crate provides type-safe representations of the identifiers that
//! cross the boundary between the controller core and the switch transport:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`SwitchId`]: datapath identifier of an attached switch
//! - [`PortId`]: switch port number, or one of the reserved CONTROLLER/FLOOD ports
//! - [`BufferId`]: handle of a packet buffered on the switch

mod datapath;
mod mac;
mod port;

pub use datapath::{BufferId, SwitchId};
pub use mac::MacAddress;
pub use port::PortId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid datapath id: {0}")]
    InvalidSwitchId(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("reserved port 0x{0:08x} cannot be used as a physical port")]
    ReservedPort(u32),
}
