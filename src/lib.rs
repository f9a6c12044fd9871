// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bambu Bridge - mirror a Bambu Lab printer into a hierarchical state store.
//!
//! The printer exposes a local MQTT broker. This library keeps a session
//! with it, projects every status report into a tree of named states and
//! turns writes on a few control states back into printer commands.
//!
//! # Features
//!
//! - **Telemetry**: every field of `print` reports appears below
//!   `<serial>.`, with fan speeds, stage codes and speed levels normalized
//! - **Control**: `<serial>.control.{chamberLight,start,stop,resume}`
//! - **Connectivity**: `info.connection` follows the transport state
//! - **Reconnect**: a fixed-delay retry after every connection loss
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bambu_bridge::{Bridge, MemoryStore, PrinterConfig, StatePath, StateStore};
//!
//! #[tokio::main]
//! async fn main() -> bambu_bridge::Result<()> {
//!     let config = PrinterConfig::from_json(
//!         r#"{"host": "192.168.1.40", "Password": "12345678", "serial": "01P00A000000000"}"#,
//!     )?;
//!     let store = Arc::new(MemoryStore::new());
//!     let mut bridge = Bridge::new(config, Arc::clone(&store)).start()?;
//!
//!     // Switch the chamber light on
//!     let light: StatePath = "01P00A000000000.control.chamberLight".parse()?;
//!     store.set_state(&light, true.into(), false)?;
//!
//!     bridge.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod explorer;
pub mod protocol;
pub mod store;
pub mod telemetry;
pub mod types;

pub use bridge::{Bridge, BridgeHandle};
pub use command::{Command, CommandTranslator, ControlState, OutboundCommand};
pub use config::{PrinterConfig, PrinterConfigBuilder};
pub use error::{
    ConfigError, Error, ParseError, ProjectionError, PublishError, Result, StoreError,
    TransportError,
};
pub use explorer::{AttributeTable, Explorer};
pub use protocol::{Dispatcher, MessageHandler, Publisher, Session, SessionMachine, SessionState};
pub use store::{MemoryStore, StateEvent, StateStore};
pub use types::{PrintStage, SpeedProfile, StatePath, StateValue};
