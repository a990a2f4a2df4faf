//! Per-switch MAC learning table.
//!
//! Maps an observed source MAC address to the port it arrived on. Inserts
//! are last-write-wins and lookups never create entries. Entries carry the
//! time they were last refreshed so that optional aging can treat stale
//! ones as unknown.

use sdn_types::{MacAddress, PortId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single learned location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnedPort {
    pub port: PortId,
    pub last_seen: Instant,
}

impl LearnedPort {
    fn is_expired(&self, now: Instant, aging: Option<Duration>) -> bool {
        match aging {
            Some(max_age) => now.saturating_duration_since(self.last_seen) > max_age,
            None => false,
        }
    }
}

/// Outcome of a destination lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit(PortId),
    Miss,
    /// The entry existed but was older than the aging time; it has been
    /// removed.
    Expired,
}

impl Lookup {
    pub fn port(&self) -> Option<PortId> {
        match self {
            Lookup::Hit(port) => Some(*port),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LearningTable {
    entries: HashMap<MacAddress, LearnedPort>,
}

impl LearningTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that `mac` was seen on `port`.
    ///
    /// Returns the previously learned port if it differed, i.e. the host
    /// moved.
    pub fn learn(&mut self, mac: MacAddress, port: PortId, now: Instant) -> Option<PortId> {
        let previous = self.entries.insert(
            mac,
            LearnedPort {
                port,
                last_seen: now,
            },
        );
        previous.map(|p| p.port).filter(|&old| old != port)
    }

    /// Looks up where `mac` lives. Never creates an entry.
    pub fn get(&self, mac: &MacAddress) -> Option<PortId> {
        self.entries.get(mac).map(|e| e.port)
    }

    /// Looks up `mac`, evicting it if it is older than `aging`.
    pub fn lookup(&mut self, mac: &MacAddress, now: Instant, aging: Option<Duration>) -> Lookup {
        match self.entries.get(mac) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired(now, aging) => {
                self.entries.remove(mac);
                Lookup::Expired
            }
            Some(entry) => Lookup::Hit(entry.port),
        }
    }

    pub fn remove(&mut self, mac: &MacAddress) -> Option<PortId> {
        self.entries.remove(mac).map(|e| e.port)
    }

    /// Drops every entry older than `aging` and returns how many were removed.
    pub fn expire(&mut self, now: Instant, aging: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, Some(aging)));
        before - self.entries.len()
    }
}
