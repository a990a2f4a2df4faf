//! Datapath and buffer identifiers.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an attached switch (OpenFlow datapath id).
///
/// Assigned by the transport and stable for the lifetime of the switch's
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchId(u64);

impl SwitchId {
    pub const fn new(dpid: u64) -> Self {
        SwitchId(dpid)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SwitchId {
    type Err = ParseError;

    /// Accepts decimal or `0x`-prefixed hexadecimal datapath ids.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(SwitchId)
            .map_err(|_| ParseError::InvalidSwitchId(s.to_string()))
    }
}

impl From<u64> for SwitchId {
    fn from(dpid: u64) -> Self {
        SwitchId(dpid)
    }
}

/// Handle of a packet retained in a switch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(u32);

impl BufferId {
    /// Raw `OFP_NO_BUFFER`: the packet is not buffered and the full payload
    /// accompanies the message.
    pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

    pub const fn new(id: u32) -> Self {
        BufferId(id)
    }

    /// Decodes a raw buffer id, mapping `OFP_NO_BUFFER` to `None`.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == Self::OFP_NO_BUFFER {
            None
        } else {
            Some(BufferId(raw))
        }
    }

    /// Encodes an optional buffer back to its raw form.
    pub fn to_raw(buffer: Option<BufferId>) -> u32 {
        buffer.map_or(Self::OFP_NO_BUFFER, |b| b.0)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
