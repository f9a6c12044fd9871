// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound command publishing.

use rumqttc::{AsyncClient, QoS};

use crate::command::OutboundCommand;
use crate::error::PublishError;

/// Publishes commands on the printer's request topic.
///
/// Cheap to clone. Publishing never waits: messages go out at most once
/// and are dropped if the client queue is full or the session is gone.
#[derive(Debug, Clone)]
pub struct Publisher {
    client: AsyncClient,
    topic: String,
}

impl Publisher {
    /// Creates a publisher sending on `topic`.
    pub(crate) fn new(client: AsyncClient, topic: String) -> Self {
        Self { client, topic }
    }

    /// Returns the topic commands are published on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Serializes and queues `command`.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Serialize` if the command cannot be encoded
    /// and `PublishError::Client` if the request cannot be queued.
    pub fn publish(&self, command: &OutboundCommand) -> Result<(), PublishError> {
        let payload = command.to_json()?;
        self.client
            .try_publish(&self.topic, QoS::AtMostOnce, false, payload)?;
        tracing::debug!(
            topic = %self.topic,
            command = command.command().name(),
            "Command published"
        );
        Ok(())
    }

    /// Publishes `command` and logs a failure instead of returning it.
    pub fn send(&self, command: &OutboundCommand) {
        if let Err(e) = self.publish(command) {
            tracing::warn!(
                topic = %self.topic,
                command = command.command().name(),
                error = %e,
                "Failed to publish command"
            );
        }
    }
}
