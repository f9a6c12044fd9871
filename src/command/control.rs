// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Writable control states under `<serial>.control`.

use crate::error::StoreError;
use crate::store::{ObjectDefinition, StateStore, ValueType};
use crate::types::StatePath;

/// Channel segment holding the control states.
pub const CONTROL_CHANNEL: &str = "control";

/// A user-writable state that maps to a printer command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    /// `chamberLight`: boolean light switch.
    ChamberLight,
    /// `start`: start button.
    Start,
    /// `stop`: stop button.
    Stop,
    /// `resume`: resume button.
    Resume,
}

impl ControlState {
    /// All control states, in provisioning order.
    pub const ALL: [Self; 4] = [Self::ChamberLight, Self::Start, Self::Stop, Self::Resume];

    /// Returns the state id segment.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::ChamberLight => "chamberLight",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Resume => "resume",
        }
    }

    /// Looks up a control state by its id segment.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.segment() == segment)
    }

    /// Returns the object definition of this state.
    #[must_use]
    pub fn definition(self) -> ObjectDefinition {
        let (name, role) = match self {
            Self::ChamberLight => ("Chamber Light", "state"),
            Self::Start => ("Start printing", "button.start"),
            Self::Stop => ("Stop Printing", "button.stop"),
            Self::Resume => ("Resume Printing", "button.resume"),
        };
        ObjectDefinition::state(name, ValueType::Boolean, role).writable()
    }

    /// Returns the full id of this state for `serial`.
    #[must_use]
    pub fn path(self, serial: &str) -> StatePath {
        control_channel(serial).child(self.segment())
    }

    /// Declares the control channel and all control states, and subscribes
    /// to their changes.
    ///
    /// Safe to call on every (re)connect: existing objects are merged, not
    /// duplicated.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store rejects an object.
    pub fn provision<S: StateStore + ?Sized>(store: &S, serial: &str) -> Result<(), StoreError> {
        store.extend_object(
            &control_channel(serial),
            ObjectDefinition::channel("Control device"),
        )?;
        for control in Self::ALL {
            let path = control.path(serial);
            store.extend_object(&path, control.definition())?;
            store.subscribe_states(&path.to_string());
        }
        tracing::debug!(serial = %serial, "Control states provisioned");
        Ok(())
    }
}

/// Returns `<serial>.control`.
#[must_use]
pub fn control_channel(serial: &str) -> StatePath {
    StatePath::root(serial).child(CONTROL_CHANNEL)
}
