//! Boundary layer between the switch transport and the controller core.
//!
//! The transport hands over already-decoded OpenFlow messages as
//! [`WireMessage`]s; the dispatcher turns them into controller events,
//! extracts the Ethernet addresses from packet-in payloads, and feeds the
//! resulting commands to a [`CommandSink`]. Malformed messages are logged,
//! counted and dropped so that one bad packet never affects other switches.

use crate::controller::L2Controller;
use crate::error::{ControllerError, Result};
use crate::types::{hex_bytes, AttachEvent, Command, DetachEvent, Event, PacketInEvent};
use sdn_types::{BufferId, MacAddress, PortId, SwitchId};
use serde::{Deserialize, Serialize};
use smoltcp::wire::EthernetFrame;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, instrument};

/// An OpenFlow message relevant to the controller, as delivered by the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// OFPT_FEATURES_REPLY: handshake complete.
    SwitchFeatures { datapath_id: u64 },

    /// OFPT_PACKET_IN.
    PacketIn {
        datapath_id: u64,
        /// `in_port` OXM field of the packet-in match, if present.
        #[serde(default)]
        in_port: Option<u32>,
        #[serde(default = "no_buffer")]
        buffer_id: u32,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },

    /// OFPT_PORT_STATUS. Accepted so the transport can forward it, but the
    /// learning switch does not react to port changes.
    PortStatus { datapath_id: u64 },

    /// The control channel to the switch closed.
    Disconnected { datapath_id: u64 },
}

fn no_buffer() -> u32 {
    BufferId::OFP_NO_BUFFER
}

impl WireMessage {
    pub fn datapath_id(&self) -> u64 {
        match self {
            WireMessage::SwitchFeatures { datapath_id }
            | WireMessage::PacketIn { datapath_id, .. }
            | WireMessage::PortStatus { datapath_id }
            | WireMessage::Disconnected { datapath_id } => *datapath_id,
        }
    }

    /// Translates the wire message into a controller event.
    ///
    /// Returns `Ok(None)` for messages the controller ignores.
    pub fn into_event(self) -> Result<Option<Event>> {
        match self {
            WireMessage::SwitchFeatures { datapath_id } => Ok(Some(Event::Attach(AttachEvent {
                switch: SwitchId::new(datapath_id),
            }))),
            WireMessage::Disconnected { datapath_id } => Ok(Some(Event::Detach(DetachEvent {
                switch: SwitchId::new(datapath_id),
            }))),
            WireMessage::PortStatus { .. } => Ok(None),
            WireMessage::PacketIn {
                datapath_id,
                in_port,
                buffer_id,
                data,
            } => {
                let switch = SwitchId::new(datapath_id);

                let raw_port = in_port
                    .ok_or_else(|| ControllerError::malformed(switch, "packet-in without in_port"))?;
                let in_port = PortId::from_raw(raw_port)?;
                if !in_port.is_physical() {
                    return Err(ControllerError::malformed(
                        switch,
                        format!("ingress port {} is not a physical port", in_port),
                    ));
                }

                let (src_mac, dst_mac) = ethernet_addresses(switch, &data)?;

                Ok(Some(Event::PacketIn(PacketInEvent {
                    switch,
                    in_port,
                    src_mac,
                    dst_mac,
                    payload: data,
                    buffer: BufferId::from_raw(buffer_id),
                })))
            }
        }
    }
}

/// Extracts (source, destination) from the Ethernet header of `frame`.
fn ethernet_addresses(switch: SwitchId, frame: &[u8]) -> Result<(MacAddress, MacAddress)> {
    let eth = EthernetFrame::new_checked(frame).map_err(|_| {
        ControllerError::malformed(
            switch,
            format!("truncated Ethernet header ({} bytes)", frame.len()),
        )
    })?;
    Ok((
        MacAddress::new(eth.src_addr().0),
        MacAddress::new(eth.dst_addr().0),
    ))
}

/// Destination for commands produced by the controller.
pub trait CommandSink {
    fn send(&mut self, command: Command) -> Result<()>;
}

impl CommandSink for Vec<Command> {
    fn send(&mut self, command: Command) -> Result<()> {
        self.push(command);
        Ok(())
    }
}

/// Writes each command as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for JsonLinesSink<W> {
    fn send(&mut self, command: Command) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &command)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

pub struct Dispatcher {
    controller: Arc<L2Controller>,
}

impl Dispatcher {
    pub fn new(controller: Arc<L2Controller>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &L2Controller {
        &self.controller
    }

    /// Handles one wire message and forwards the resulting commands.
    ///
    /// Returns the number of commands sent. Malformed messages yield
    /// `Ok(0)`; only sink failures are returned as errors.
    #[instrument(skip_all, fields(datapath_id = msg.datapath_id()))]
    pub fn dispatch(&self, msg: WireMessage, sink: &mut dyn CommandSink) -> Result<usize> {
        let event = match msg.into_event() {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Ignoring wire message");
                return Ok(0);
            }
            Err(err) if err.is_event_local() => {
                self.controller.drop_malformed(&err);
                return Ok(0);
            }
            Err(err) => return Err(err),
        };

        let commands = match self.controller.handle(event) {
            Ok(commands) => commands,
            // Already logged and counted by the controller
            Err(err) if err.is_event_local() => return Ok(0),
            Err(err) => return Err(err),
        };

        let sent = commands.len();
        for command in commands {
            sink.send(command)?;
        }
        debug!(sent, "Dispatched wire message");
        Ok(sent)
    }

    /// Decodes one JSON line and dispatches it.
    pub fn dispatch_line(&self, line: &str, sink: &mut dyn CommandSink) -> Result<usize> {
        self.dispatch_bytes(line.as_bytes(), sink)
    }

    /// Like [`Dispatcher::dispatch_line`], for input that may not be UTF-8.
    ///
    /// Undecodable input is reported as [`ControllerError::Decode`].
    pub fn dispatch_bytes(&self, line: &[u8], sink: &mut dyn CommandSink) -> Result<usize> {
        let msg: WireMessage = serde_json::from_slice(line).map_err(ControllerError::Decode)?;
        self.dispatch(msg, sink)
    }
}
