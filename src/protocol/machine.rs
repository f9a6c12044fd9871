// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected ──request_connect──▶ Connecting ──ConnAck──▶ Connected
//!                                      ▲    │                  │
//!                         reconnect_due│    └──transport_failed┤
//!                                      │                       ▼
//!                                   Reconnecting ◀─────────────┘
//!
//! any state ──close──▶ Closed
//! ```
//!
//! The machine is pure: it owns the single pending reconnect deadline and
//! never touches the network. [`Session`](super::Session) drives it.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Lifecycle state of the printer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not yet started.
    Disconnected,
    /// Waiting for the broker to acknowledge a connection.
    Connecting,
    /// Connected and subscribed.
    Connected,
    /// Waiting for the reconnect deadline.
    Reconnecting,
    /// Shut down; terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` if the transport should be driven in this state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State and reconnect bookkeeping of one session.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    reconnect_at: Option<Instant>,
    reconnect_delay: Duration,
    attempts: u32,
}

impl SessionMachine {
    /// Creates a machine in `Disconnected` that waits `reconnect_delay`
    /// after each connection loss.
    #[must_use]
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: SessionState::Disconnected,
            reconnect_at: None,
            reconnect_delay,
            attempts: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the pending reconnect deadline, if any.
    #[must_use]
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Number of reconnect attempts since the last successful connection.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Starts connecting. Returns `false` if already connecting, connected
    /// or closed.
    pub fn request_connect(&mut self) -> bool {
        match self.state {
            SessionState::Disconnected | SessionState::Reconnecting => {
                self.cancel_reconnect();
                self.state = SessionState::Connecting;
                true
            }
            SessionState::Connecting | SessionState::Connected | SessionState::Closed => false,
        }
    }

    /// Records a successful connection. Returns `false` if the machine was
    /// not connecting.
    pub fn connection_established(&mut self) -> bool {
        if self.state != SessionState::Connecting {
            return false;
        }
        self.cancel_reconnect();
        self.attempts = 0;
        self.state = SessionState::Connected;
        true
    }

    /// Records a transport failure observed at `now` and schedules the next
    /// attempt, replacing any pending one.
    ///
    /// Returns `false` if there was no connection to lose (`Disconnected`
    /// or `Closed`).
    pub fn transport_failed(&mut self, now: Instant) -> bool {
        match self.state {
            SessionState::Disconnected | SessionState::Closed => false,
            SessionState::Connecting | SessionState::Connected | SessionState::Reconnecting => {
                self.cancel_reconnect();
                self.reconnect_at = Some(now + self.reconnect_delay);
                self.state = SessionState::Reconnecting;
                true
            }
        }
    }

    /// Moves to `Connecting` if the reconnect deadline has passed.
    pub fn reconnect_due(&mut self, now: Instant) -> bool {
        match self.reconnect_at {
            Some(deadline) if self.state == SessionState::Reconnecting && deadline <= now => {
                self.reconnect_at = None;
                self.attempts = self.attempts.saturating_add(1);
                self.state = SessionState::Connecting;
                true
            }
            _ => false,
        }
    }

    /// Drops the pending reconnect deadline and returns it.
    pub fn cancel_reconnect(&mut self) -> Option<Instant> {
        self.reconnect_at.take()
    }

    /// Moves to `Closed`. Returns the state before closing, or `None` if
    /// the machine was already closed.
    pub fn close(&mut self) -> Option<SessionState> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.cancel_reconnect();
        Some(std::mem::replace(&mut self.state, SessionState::Closed))
    }
}
