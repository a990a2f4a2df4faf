//! L2Controller - MAC-learning forwarding decisions.
//!
//! One method per event type. Every handler is a short, non-blocking
//! computation that returns the commands to send; the transport owns all
//! I/O.

use crate::config::LearningConfig;
use crate::error::{ControllerError, Result};
use crate::learning_table::{LearningTable, Lookup};
use crate::stats::{ControllerStats, StatsSnapshot};
use crate::tables::ProcessTables;
use crate::types::{
    AttachEvent, Command, DetachEvent, EmitPacketCommand, Event, InstallRuleCommand,
    PacketInEvent,
};
use sdn_types::{MacAddress, PortId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Forwarding decision for a single packet-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    out_port: PortId,
    /// The source was previously learned on a different port.
    moved_from: Option<PortId>,
    /// The destination entry existed but had aged out.
    expired: bool,
}

pub struct L2Controller {
    tables: Arc<ProcessTables>,
    config: LearningConfig,
    stats: ControllerStats,
}

impl L2Controller {
    /// Creates a controller over caller-owned tables.
    pub fn new(tables: Arc<ProcessTables>, config: LearningConfig) -> Self {
        Self {
            tables,
            config,
            stats: ControllerStats::default(),
        }
    }

    /// Convenience constructor with fresh tables and default config.
    pub fn standalone() -> Self {
        Self::new(Arc::new(ProcessTables::new()), LearningConfig::default())
    }

    pub fn tables(&self) -> &ProcessTables {
        &self.tables
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatches any event to its handler.
    pub fn handle(&self, event: Event) -> Result<Vec<Command>> {
        match event {
            Event::Attach(e) => Ok(self.handle_attach(&e)),
            Event::PacketIn(e) => self.handle_packet_in(e),
            Event::Detach(e) => {
                self.handle_detach(&e);
                Ok(Vec::new())
            }
        }
    }

    /// Installs the table-miss rule on a freshly attached switch.
    ///
    /// The learning table is not created here; that happens on the first
    /// packet-in.
    pub fn handle_attach(&self, event: &AttachEvent) -> Vec<Command> {
        info!(switch = %event.switch, "Switch attached, installing table-miss rule");
        self.stats.record_attach();
        self.stats.record_rule_installed();
        vec![InstallRuleCommand::table_miss(event.switch).into()]
    }

    /// Forgets a switch's learning table. Returns true if a table existed.
    pub fn handle_detach(&self, event: &DetachEvent) -> bool {
        match self.tables.forget(event.switch) {
            Some(table) => {
                info!(
                    switch = %event.switch,
                    entries = table.len(),
                    "Switch detached, learning table dropped"
                );
                self.stats.record_detach();
                true
            }
            None => {
                debug!(switch = %event.switch, "Detach for switch without a learning table");
                false
            }
        }
    }

    pub fn handle_packet_in(&self, event: PacketInEvent) -> Result<Vec<Command>> {
        self.handle_packet_in_at(event, Instant::now())
    }

    /// Learns the source, picks an output port, and builds the rule-install
    /// and/or packet-out commands.
    ///
    /// At most one install and at most one packet-out are returned. When the
    /// switch buffered the packet and a rule is installed, the buffer rides
    /// on the install and no packet-out follows.
    pub fn handle_packet_in_at(&self, event: PacketInEvent, now: Instant) -> Result<Vec<Command>> {
        let PacketInEvent {
            switch,
            in_port,
            src_mac,
            dst_mac,
            payload,
            buffer,
        } = event;

        if in_port.is_reserved() {
            let err = ControllerError::malformed(
                switch,
                format!("ingress port {} is not a physical port", in_port),
            );
            self.drop_malformed(&err);
            return Err(err);
        }

        self.stats.record_packet_in();
        let decision = self
            .tables
            .with_table(switch, |table| self.decide(table, in_port, &src_mac, &dst_mac, now));

        info!(
            switch = %switch,
            src = %src_mac,
            dst = %dst_mac,
            in_port = %in_port,
            out_port = %decision.out_port,
            "Packet in"
        );

        if let Some(old) = decision.moved_from {
            self.stats.record_host_move();
            debug!(switch = %switch, mac = %src_mac, from = %old, to = %in_port, "Host moved");
        }
        if decision.expired {
            self.stats.record_aged_out(1);
            debug!(switch = %switch, mac = %dst_mac, "Destination entry aged out");
        }

        let mut commands = Vec::with_capacity(2);
        let out_port = decision.out_port;

        if out_port != PortId::Flood {
            commands.push(
                InstallRuleCommand::forward(switch, in_port, dst_mac, out_port, buffer).into(),
            );
            self.stats.record_rule_installed();

            // The switch forwards its buffered copy through the new rule.
            if buffer.is_some() {
                return Ok(commands);
            }
        } else {
            self.stats.record_flood();
        }

        commands.push(
            EmitPacketCommand {
                switch,
                out_port,
                in_port,
                payload: buffer.is_none().then_some(payload),
                buffer,
            }
            .into(),
        );
        self.stats.record_packet_out();

        Ok(commands)
    }

    /// Learn + look up under a single table lock.
    fn decide(
        &self,
        table: &mut LearningTable,
        in_port: PortId,
        src: &MacAddress,
        dst: &MacAddress,
        now: Instant,
    ) -> Decision {
        let moved_from = table.learn(*src, in_port, now);
        let lookup = table.lookup(dst, now, self.config.aging_time());
        Decision {
            out_port: lookup.port().unwrap_or(PortId::Flood),
            moved_from,
            expired: lookup == Lookup::Expired,
        }
    }

    /// Sweeps every table for aged-out entries. No-op when aging is off.
    pub fn expire_stale(&self, now: Instant) -> usize {
        let Some(aging) = self.config.aging_time() else {
            return 0;
        };

        let mut removed = 0;
        self.tables.for_each_table(|switch, table| {
            let n = table.expire(now, aging);
            if n > 0 {
                debug!(switch = %switch, removed = n, "Aged out learning entries");
            }
            removed += n;
        });

        if removed > 0 {
            self.stats.record_aged_out(removed as u64);
        }
        removed
    }

    /// Logs and counts a rejected event.
    pub(crate) fn drop_malformed(&self, err: &ControllerError) {
        self.stats.record_malformed();
        warn!(error = %err, "Dropping malformed event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_RULE_PRIORITY, FORWARDING_RULE_PRIORITY};
    use pretty_assertions::assert_eq;
    use sdn_types::{BufferId, SwitchId};
    use std::time::Duration;

    const AA: MacAddress = MacAddress::new([0xaa; 6]);
    const BB: MacAddress = MacAddress::new([0xbb; 6]);
    const S1: SwitchId = SwitchId::new(1);

    fn packet_in(
        in_port: u32,
        src: MacAddress,
        dst: MacAddress,
        buffer: Option<BufferId>,
    ) -> PacketInEvent {
        PacketInEvent {
            switch: S1,
            in_port: PortId::Physical(in_port),
            src_mac: src,
            dst_mac: dst,
            payload: vec![1, 2, 3],
            buffer,
        }
    }

    #[test]
    fn test_attach_installs_table_miss_rule() {
        let ctl = L2Controller::standalone();
        let commands = ctl.handle_attach(&AttachEvent { switch: S1 });

        assert_eq!(commands.len(), 1);
        let rule = commands[0].as_install_rule().unwrap();
        assert_eq!(rule.priority, DEFAULT_RULE_PRIORITY);
        assert_eq!(rule.match_in_port, None);
        assert_eq!(rule.match_dst_mac, None);
        assert_eq!(rule.action_out_port, PortId::Controller);
        assert!(rule.full_payload);
        // Table is created lazily on the first packet-in
        assert!(!ctl.tables().contains_switch(S1));
    }

    #[test]
    fn test_unknown_destination_floods() {
        let ctl = L2Controller::standalone();
        let commands = ctl.handle_packet_in(packet_in(2, AA, BB, None)).unwrap();

        assert_eq!(ctl.tables().lookup(S1, &AA), Some(PortId::Physical(2)));
        assert_eq!(commands.len(), 1);
        let out = commands[0].as_emit_packet().unwrap();
        assert_eq!(out.out_port, PortId::Flood);
        assert_eq!(out.in_port, PortId::Physical(2));
        assert_eq!(out.payload, Some(vec![1, 2, 3]));
        assert_eq!(out.buffer, None);
    }

    #[test]
    fn test_flood_with_buffer_sends_buffer_not_payload() {
        let ctl = L2Controller::standalone();
        let buffer = Some(BufferId::new(77));
        let commands = ctl.handle_packet_in(packet_in(2, AA, BB, buffer)).unwrap();

        assert_eq!(commands.len(), 1);
        let out = commands[0].as_emit_packet().unwrap();
        assert_eq!(out.out_port, PortId::Flood);
        assert_eq!(out.buffer, buffer);
        assert_eq!(out.payload, None);
    }

    #[test]
    fn test_known_destination_unbuffered_installs_and_emits() {
        let ctl = L2Controller::standalone();
        ctl.handle_packet_in(packet_in(2, AA, BB, None)).unwrap();
        let commands = ctl.handle_packet_in(packet_in(5, BB, AA, None)).unwrap();

        assert_eq!(ctl.tables().lookup(S1, &BB), Some(PortId::Physical(5)));
        assert_eq!(commands.len(), 2);

        let rule = commands[0].as_install_rule().unwrap();
        assert_eq!(rule.priority, FORWARDING_RULE_PRIORITY);
        assert_eq!(rule.match_in_port, Some(PortId::Physical(5)));
        assert_eq!(rule.match_dst_mac, Some(AA));
        assert_eq!(rule.action_out_port, PortId::Physical(2));
        assert_eq!(rule.buffer, None);

        let out = commands[1].as_emit_packet().unwrap();
        assert_eq!(out.out_port, PortId::Physical(2));
        assert_eq!(out.payload, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_known_destination_buffered_installs_only() {
        let ctl = L2Controller::standalone();
        ctl.handle_packet_in(packet_in(2, AA, BB, None)).unwrap();
        let buffer = Some(BufferId::new(9));
        let commands = ctl.handle_packet_in(packet_in(5, BB, AA, buffer)).unwrap();

        assert_eq!(commands.len(), 1);
        let rule = commands[0].as_install_rule().unwrap();
        assert_eq!(rule.buffer, buffer);
        assert_eq!(rule.action_out_port, PortId::Physical(2));
    }

    #[test]
    fn test_reserved_ingress_port_is_malformed() {
        let ctl = L2Controller::standalone();
        let mut event = packet_in(2, AA, BB, None);
        event.in_port = PortId::Controller;

        let err = ctl.handle_packet_in(event).unwrap_err();
        assert!(matches!(err, ControllerError::MalformedEvent { .. }));
        assert!(!ctl.tables().contains_switch(S1));
        assert_eq!(ctl.stats().malformed_dropped, 1);
        assert_eq!(ctl.stats().packet_ins, 0);
    }

    #[test]
    fn test_detach_forgets_table() {
        let ctl = L2Controller::standalone();
        ctl.handle_packet_in(packet_in(2, AA, BB, None)).unwrap();

        assert!(ctl.handle_detach(&DetachEvent { switch: S1 }));
        assert!(!ctl.tables().contains_switch(S1));
        // Unknown switch is a no-op
        assert!(!ctl.handle_detach(&DetachEvent { switch: S1 }));
        assert_eq!(ctl.stats().switches_detached, 1);
    }

    #[test]
    fn test_host_move_is_counted() {
        let ctl = L2Controller::standalone();
        ctl.handle_packet_in(packet_in(2, AA, BB, None)).unwrap();
        ctl.handle_packet_in(packet_in(3, AA, BB, None)).unwrap();

        assert_eq!(ctl.tables().lookup(S1, &AA), Some(PortId::Physical(3)));
        assert_eq!(ctl.stats().host_moves, 1);
    }

    #[test]
    fn test_aging_falls_back_to_flood() {
        let config = LearningConfig {
            aging_time_secs: 10,
            ..Default::default()
        };
        let ctl = L2Controller::new(Arc::new(ProcessTables::new()), config);
        let start = Instant::now();

        ctl.handle_packet_in_at(packet_in(2, AA, BB, None), start).unwrap();
        let later = start + Duration::from_secs(11);
        let commands = ctl.handle_packet_in_at(packet_in(5, BB, AA, None), later).unwrap();

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_emit_packet().unwrap().out_port, PortId::Flood);
        assert_eq!(ctl.stats().entries_aged_out, 1);
    }

    #[test]
    fn test_expire_stale_disabled_by_default() {
        let ctl = L2Controller::standalone();
        let start = Instant::now();
        ctl.handle_packet_in_at(packet_in(2, AA, BB, None), start).unwrap();

        assert_eq!(ctl.expire_stale(start + Duration::from_secs(1_000_000)), 0);
        assert_eq!(ctl.tables().total_entries(), 1);
    }

    #[test]
    fn test_expire_stale_sweeps_all_switches() {
        let config = LearningConfig {
            aging_time_secs: 30,
            ..Default::default()
        };
        let ctl = L2Controller::new(Arc::new(ProcessTables::new()), config);
        let start = Instant::now();
        ctl.handle_packet_in_at(packet_in(2, AA, BB, None), start).unwrap();
        let mut other = packet_in(4, BB, AA, None);
        other.switch = SwitchId::new(2);
        ctl.handle_packet_in_at(other, start).unwrap();

        assert_eq!(ctl.expire_stale(start + Duration::from_secs(31)), 2);
        assert_eq!(ctl.tables().total_entries(), 0);
        assert_eq!(ctl.stats().entries_aged_out, 2);
    }

    #[test]
    fn test_handle_dispatches_by_event_type() {
        let ctl = L2Controller::standalone();
        let attach = ctl.handle(Event::Attach(AttachEvent { switch: S1 })).unwrap();
        assert_eq!(attach.len(), 1);

        let flood = ctl.handle(Event::PacketIn(packet_in(1, AA, BB, None))).unwrap();
        assert_eq!(flood.len(), 1);

        let detach = ctl.handle(Event::Detach(DetachEvent { switch: S1 })).unwrap();
        assert!(detach.is_empty());
    }
}
