// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport to the printer.
//!
//! - [`Session`]: owns the connection and drives the [`SessionMachine`]
//! - [`Publisher`]: fire-and-forget command publishing
//! - [`Dispatcher`]: the [`MessageHandler`] that projects inbound reports
//!   into the state store
//! - [`tls`]: client configuration for the printer's self-signed broker

mod dispatcher;
mod machine;
mod publisher;
mod session;
pub mod tls;

pub use dispatcher::{Dispatcher, LIGHTS_REPORT_KEY};
pub use machine::{SessionMachine, SessionState};
pub use publisher::Publisher;
pub use session::{MessageHandler, Session, connection_state_id, reset_connection_state};
