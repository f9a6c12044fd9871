// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer commands and their wire format.
//!
//! Commands are published as JSON on `device/<serial>/request`:
//!
//! ```json
//! {"system": {"sequence_id": "2003", "command": "ledctrl", "led_node": "chamber_light", ...}}
//! {"print": {"sequence_id": "0", "command": "resume"}}
//! ```
//!
//! # Examples
//!
//! ```
//! use bambu_bridge::command::{Command, OutboundCommand};
//!
//! let msg = OutboundCommand::new(Command::ChamberLight(true));
//! let json = serde_json::to_value(&msg).unwrap();
//! assert_eq!(json["system"]["command"], "ledctrl");
//! assert_eq!(json["system"]["led_mode"], "on");
//! ```

mod control;
mod translator;

pub use control::ControlState;
pub use translator::CommandTranslator;

use serde::Serialize;

/// Sequence id used for LED control requests.
pub const LED_SEQUENCE_ID: &str = "2003";

/// Sequence id used for print job requests.
pub const PRINT_SEQUENCE_ID: &str = "0";

/// A command the bridge can send to the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Switch the chamber light on (`true`) or off (`false`).
    ChamberLight(bool),
    /// Start the loaded print job.
    Start,
    /// Stop the running print job.
    Stop,
    /// Resume a paused print job.
    Resume,
}

impl Command {
    /// Returns the wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChamberLight(_) => "ledctrl",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Resume => "resume",
        }
    }

    fn body(self) -> CommandBody {
        match self {
            Self::ChamberLight(on) => CommandBody::System(LedControl::chamber_light(on)),
            Self::Start | Self::Stop | Self::Resume => CommandBody::Print(PrintAction {
                sequence_id: PRINT_SEQUENCE_ID,
                command: self.name(),
            }),
        }
    }
}

/// The section a command is sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CommandBody {
    System(LedControl),
    Print(PrintAction),
}

/// Body of a `ledctrl` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct LedControl {
    sequence_id: &'static str,
    command: &'static str,
    led_node: &'static str,
    led_mode: &'static str,
    led_on_time: u32,
    led_off_time: u32,
    loop_times: u32,
    interval_time: u32,
}

impl LedControl {
    fn chamber_light(on: bool) -> Self {
        Self {
            sequence_id: LED_SEQUENCE_ID,
            command: "ledctrl",
            led_node: "chamber_light",
            led_mode: if on { "on" } else { "off" },
            led_on_time: 500,
            led_off_time: 500,
            loop_times: 0,
            interval_time: 0,
        }
    }
}

/// Body of a print job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PrintAction {
    sequence_id: &'static str,
    command: &'static str,
}

/// A serializable outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundCommand {
    #[serde(skip)]
    command: Command,
    #[serde(flatten)]
    body: CommandBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl OutboundCommand {
    /// Creates a message without a user id.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            body: command.body(),
            user_id: None,
        }
    }

    /// Attaches a top-level `user_id`.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns the command this message carries.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Serializes the message to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
