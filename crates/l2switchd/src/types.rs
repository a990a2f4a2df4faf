//! Controller events and commands.
//!
//! These are the only shapes that cross the core's boundary: the transport
//! turns wire messages into events, and turns the returned commands back
//! into flow-mod / packet-out messages.

use sdn_types::{BufferId, MacAddress, PortId, SwitchId};
use serde::{Deserialize, Serialize};

/// Priority of the table-miss rule installed on attach.
pub const DEFAULT_RULE_PRIORITY: u16 = 0;

/// Priority of learned (in_port, eth_dst) forwarding rules.
pub const FORWARDING_RULE_PRIORITY: u16 = 1;

/// A switch finished its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachEvent {
    pub switch: SwitchId,
}

/// The switch lost its connection; its learning table is forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachEvent {
    pub switch: SwitchId,
}

/// A packet that matched no forwarding rule on the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInEvent {
    pub switch: SwitchId,
    pub in_port: PortId,
    pub src_mac: MacAddress,
    pub dst_mac: MacAddress,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// `None` means the switch did not buffer the packet and `payload`
    /// is the whole frame.
    #[serde(default)]
    pub buffer: Option<BufferId>,
}

/// Any inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Attach(AttachEvent),
    PacketIn(PacketInEvent),
    Detach(DetachEvent),
}

/// Install a forwarding rule (OpenFlow flow-mod ADD).
///
/// `None` match fields are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRuleCommand {
    pub switch: SwitchId,
    pub priority: u16,
    pub match_in_port: Option<PortId>,
    pub match_dst_mac: Option<MacAddress>,
    pub action_out_port: PortId,
    /// Buffered packet the switch should forward through the new rule.
    pub buffer: Option<BufferId>,
    /// Packets sent to CONTROLLER by this rule carry the whole frame
    /// instead of a buffer reference (`OFPCML_NO_BUFFER`).
    #[serde(default)]
    pub full_payload: bool,
}

impl InstallRuleCommand {
    /// The table-miss rule: match everything, send unbuffered to the controller.
    pub fn table_miss(switch: SwitchId) -> Self {
        Self {
            switch,
            priority: DEFAULT_RULE_PRIORITY,
            match_in_port: None,
            match_dst_mac: None,
            action_out_port: PortId::Controller,
            buffer: None,
            full_payload: true,
        }
    }

    /// A learned rule forwarding `dst` arriving on `in_port` to `out_port`.
    pub fn forward(
        switch: SwitchId,
        in_port: PortId,
        dst: MacAddress,
        out_port: PortId,
        buffer: Option<BufferId>,
    ) -> Self {
        Self {
            switch,
            priority: FORWARDING_RULE_PRIORITY,
            match_in_port: Some(in_port),
            match_dst_mac: Some(dst),
            action_out_port: out_port,
            buffer,
            full_payload: false,
        }
    }
}

/// Emit a packet out of a port (OpenFlow packet-out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitPacketCommand {
    pub switch: SwitchId,
    pub out_port: PortId,
    /// Ingress port; excluded when `out_port` is FLOOD.
    pub in_port: PortId,
    /// Frame bytes, present only when the packet is not buffered.
    #[serde(default, with = "hex_bytes_opt")]
    pub payload: Option<Vec<u8>>,
    pub buffer: Option<BufferId>,
}

/// Any outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    InstallRule(InstallRuleCommand),
    EmitPacket(EmitPacketCommand),
}

impl Command {
    pub fn switch(&self) -> SwitchId {
        match self {
            Command::InstallRule(c) => c.switch,
            Command::EmitPacket(c) => c.switch,
        }
    }

    pub fn as_install_rule(&self) -> Option<&InstallRuleCommand> {
        match self {
            Command::InstallRule(c) => Some(c),
            Command::EmitPacket(_) => None,
        }
    }

    pub fn as_emit_packet(&self) -> Option<&EmitPacketCommand> {
        match self {
            Command::EmitPacket(c) => Some(c),
            Command::InstallRule(_) => None,
        }
    }
}

impl From<InstallRuleCommand> for Command {
    fn from(c: InstallRuleCommand) -> Self {
        Command::InstallRule(c)
    }
}

impl From<EmitPacketCommand> for Command {
    fn from(c: EmitPacketCommand) -> Self {
        Command::EmitPacket(c)
    }
}

/// Frame bytes as a lowercase hex string on the JSON boundary.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&hex::encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|text| hex::decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_miss_rule() {
        let rule = InstallRuleCommand::table_miss(SwitchId::new(1));
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.match_in_port, None);
        assert_eq!(rule.match_dst_mac, None);
        assert_eq!(rule.action_out_port, PortId::Controller);
        assert!(rule.full_payload);
        assert_eq!(rule.buffer, None);
    }

    #[test]
    fn test_forward_rule() {
        let dst = MacAddress::new([0xbb; 6]);
        let rule = InstallRuleCommand::forward(
            SwitchId::new(1),
            PortId::Physical(5),
            dst,
            PortId::Physical(2),
            None,
        );
        assert_eq!(rule.priority, FORWARDING_RULE_PRIORITY);
        assert_eq!(rule.match_in_port, Some(PortId::Physical(5)));
        assert_eq!(rule.match_dst_mac, Some(dst));
        assert!(!rule.full_payload);
    }

    #[test]
    fn test_emit_packet_json_uses_hex_payload() {
        let cmd = Command::EmitPacket(EmitPacketCommand {
            switch: SwitchId::new(3),
            out_port: PortId::Flood,
            in_port: PortId::Physical(2),
            payload: Some(vec![0xde, 0xad]),
            buffer: None,
        });
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "emit_packet");
        assert_eq!(json["out_port"], "flood");
        assert_eq!(json["in_port"]["physical"], 2);
        assert_eq!(json["payload"], "dead");

        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_command_accessors() {
        let cmd: Command = InstallRuleCommand::table_miss(SwitchId::new(9)).into();
        assert_eq!(cmd.switch(), SwitchId::new(9));
        assert!(cmd.as_install_rule().is_some());
        assert!(cmd.as_emit_packet().is_none());
    }
}
