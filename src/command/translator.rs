// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Maps user writes on control states to printer commands.

use super::{Command, ControlState, OutboundCommand};
use crate::store::StateEvent;

/// Turns store change events into [`OutboundCommand`]s.
///
/// Only unacknowledged writes (user intent) on the control states of the
/// configured printer produce a command. Everything else is ignored.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    serial: String,
    user_id: Option<String>,
}

impl CommandTranslator {
    /// Creates a translator for `serial`.
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            user_id: None,
        }
    }

    /// Sets the `user_id` attached to every outbound command.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Translates a change event, or returns `None` if it is not a command.
    #[must_use]
    pub fn translate(&self, event: &StateEvent) -> Option<OutboundCommand> {
        if event.state.ack {
            return None;
        }
        let control = ControlState::from_segment(event.id.last()?)?;
        if event.id != control.path(&self.serial) {
            tracing::trace!(id = %event.id, "Ignoring write outside this printer");
            return None;
        }

        let command = match control {
            ControlState::ChamberLight => {
                let Some(on) = event.state.val.as_bool() else {
                    tracing::warn!(id = %event.id, value = %event.state.val, "Chamber light expects a boolean");
                    return None;
                };
                Command::ChamberLight(on)
            }
            ControlState::Start => Command::Start,
            ControlState::Stop => Command::Stop,
            ControlState::Resume => Command::Resume,
        };

        let outbound = OutboundCommand::new(command);
        Some(match &self.user_id {
            Some(user_id) => outbound.with_user_id(user_id.clone()),
            None => outbound,
        })
    }
}
