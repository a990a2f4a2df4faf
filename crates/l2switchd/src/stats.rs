//! Controller counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ControllerStats {
    switches_attached: AtomicU64,
    switches_detached: AtomicU64,
    packet_ins: AtomicU64,
    floods: AtomicU64,
    rules_installed: AtomicU64,
    packet_outs: AtomicU64,
    host_moves: AtomicU64,
    malformed_dropped: AtomicU64,
    entries_aged_out: AtomicU64,
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub switches_attached: u64,
    pub switches_detached: u64,
    pub packet_ins: u64,
    pub floods: u64,
    pub rules_installed: u64,
    pub packet_outs: u64,
    pub host_moves: u64,
    pub malformed_dropped: u64,
    pub entries_aged_out: u64,
}

macro_rules! counter {
    ($name:ident, $field:ident) => {
        pub(crate) fn $name(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl ControllerStats {
    counter!(record_attach, switches_attached);
    counter!(record_detach, switches_detached);
    counter!(record_packet_in, packet_ins);
    counter!(record_flood, floods);
    counter!(record_rule_installed, rules_installed);
    counter!(record_packet_out, packet_outs);
    counter!(record_host_move, host_moves);
    counter!(record_malformed, malformed_dropped);

    pub(crate) fn record_aged_out(&self, count: u64) {
        self.entries_aged_out.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            switches_attached: self.switches_attached.load(Ordering::Relaxed),
            switches_detached: self.switches_detached.load(Ordering::Relaxed),
            packet_ins: self.packet_ins.load(Ordering::Relaxed),
            floods: self.floods.load(Ordering::Relaxed),
            rules_installed: self.rules_installed.load(Ordering::Relaxed),
            packet_outs: self.packet_outs.load(Ordering::Relaxed),
            host_moves: self.host_moves.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            entries_aged_out: self.entries_aged_out.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = ControllerStats::default();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let stats = ControllerStats::default();
        stats.record_packet_in();
        stats.record_packet_in();
        stats.record_flood();
        stats.record_aged_out(3);

        let snap = stats.snapshot();
        assert_eq!(snap.packet_ins, 2);
        assert_eq!(snap.floods, 1);
        assert_eq!(snap.entries_aged_out, 3);
        assert_eq!(snap.rules_installed, 0);
    }
}
