//! MAC-learning L2 forwarding controller
//!
//! This crate provides the controller core of a software-defined L2 switch:
//! it reacts to switches attaching and to packets that missed every flow
//! rule, learns where each source MAC address lives, and tells the switch
//! either to install a forwarding rule or to emit the packet.
//!
//! # Architecture
//!
//! ```text
//!   transport                 l2switchd                      transport
//!  ┌───────────┐   WireMessage  ┌────────────┐   Event   ┌──────────────┐
//!  │ features  │──────────────▶│ Dispatcher │─────────▶│ L2Controller │
//!  │ packet-in │               │            │◀─────────│              │
//!  │ disconnect│               └────────────┘  Command  └──────┬───────┘
//!  └───────────┘                     │                         │
//!        ▲        install-rule /     │                  ProcessTables
//!        └───────── emit-packet ─────┘            (SwitchId → LearningTable)
//! ```
//!
//! The learning state is an explicitly owned [`ProcessTables`] handed to the
//! controller at construction, so independent controllers never share state.

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod learning_table;
pub mod stats;
pub mod tables;
pub mod types;

pub use config::{L2SwitchConfig, LearningConfig, LoggingConfig, DEFAULT_CONFIG_PATH};
pub use controller::L2Controller;
pub use dispatcher::{CommandSink, Dispatcher, JsonLinesSink, WireMessage};
pub use error::{ControllerError, Result};
pub use learning_table::{LearnedPort, LearningTable, Lookup};
pub use stats::{ControllerStats, StatsSnapshot};
pub use tables::ProcessTables;
pub use types::{
    AttachEvent, Command, DetachEvent, EmitPacketCommand, Event, InstallRuleCommand,
    PacketInEvent, DEFAULT_RULE_PRIORITY, FORWARDING_RULE_PRIORITY,
};

pub use sdn_types::{BufferId, MacAddress, PortId, SwitchId};
