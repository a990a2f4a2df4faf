//! Switch port identifiers.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A switch port: either a numbered physical port or a reserved port.
///
/// Raw values follow OpenFlow 1.3 (`ofp_port_no`): physical ports are
/// `1..=OFPP_MAX`, reserved ports live above `OFPP_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortId {
    /// Numbered front-panel port.
    Physical(u32),
    /// The control channel (packet is sent to the controller).
    Controller,
    /// All physical ports except the ingress port.
    Flood,
}

impl PortId {
    /// Highest raw value a physical port may take.
    pub const OFPP_MAX: u32 = 0xffff_ff00;
    pub const OFPP_FLOOD: u32 = 0xffff_fffb;
    pub const OFPP_CONTROLLER: u32 = 0xffff_fffd;

    /// Decodes a raw OpenFlow port number.
    ///
    /// Reserved ports other than FLOOD and CONTROLLER have no meaning for
    /// the controller and are rejected.
    pub fn from_raw(raw: u32) -> Result<Self, ParseError> {
        match raw {
            Self::OFPP_FLOOD => Ok(PortId::Flood),
            Self::OFPP_CONTROLLER => Ok(PortId::Controller),
            0 => Err(ParseError::InvalidPort(raw.to_string())),
            n if n <= Self::OFPP_MAX => Ok(PortId::Physical(n)),
            n => Err(ParseError::ReservedPort(n)),
        }
    }

    pub const fn to_raw(self) -> u32 {
        match self {
            PortId::Physical(n) => n,
            PortId::Controller => Self::OFPP_CONTROLLER,
            PortId::Flood => Self::OFPP_FLOOD,
        }
    }

    pub const fn is_physical(&self) -> bool {
        matches!(self, PortId::Physical(_))
    }

    /// Returns true for the CONTROLLER and FLOOD sentinels.
    pub const fn is_reserved(&self) -> bool {
        !self.is_physical()
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortId::Physical(n) => write!(f, "{}", n),
            PortId::Controller => write!(f, "CONTROLLER"),
            PortId::Flood => write!(f, "FLOOD"),
        }
    }
}

impl FromStr for PortId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "controller" => Ok(PortId::Controller),
            "flood" => Ok(PortId::Flood),
            other => {
                let raw = other
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidPort(s.to_string()))?;
                PortId::from_raw(raw)
            }
        }
    }
}

impl From<PortId> for u32 {
    fn from(port: PortId) -> u32 {
        port.to_raw()
    }
}
