// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hierarchical state store the bridge writes into.
//!
//! The bridge does not own storage. It talks to a key/value + metadata
//! registry through the [`StateStore`] trait:
//!
//! - states: a typed value plus an acknowledgement flag, addressed by a
//!   [`StatePath`]
//! - objects: static metadata (kind, name, type, role, access)
//! - change events: delivered for states matching a subscribed pattern
//!
//! [`MemoryStore`] is a complete in-process implementation.
//!
//! # Examples
//!
//! ```
//! use bambu_bridge::store::{MemoryStore, StateStore};
//! use bambu_bridge::types::StatePath;
//!
//! let store = MemoryStore::new();
//! let id = StatePath::root("printer").child("nozzle_temper");
//!
//! assert!(store.set_state_changed(&id, 220.into(), true).unwrap());
//! // Same value again: nothing is written, no event is emitted
//! assert!(!store.set_state_changed(&id, 220.into(), true).unwrap());
//! ```

mod memory;
mod object;

pub use memory::MemoryStore;
pub use object::{CommonAttributes, ObjectDefinition, ObjectKind, ValueType};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::types::{StatePath, StateValue};

/// A state value together with its acknowledgement flag and timestamps.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct State {
    /// The value.
    pub val: StateValue,
    /// `true` if the value originates from the device, `false` for a
    /// pending write that the device has not confirmed yet.
    pub ack: bool,
    /// Time of the last accepted write.
    pub ts: DateTime<Utc>,
    /// Time the value last changed.
    pub lc: DateTime<Utc>,
}

impl State {
    /// Creates a state stamped with the current time.
    #[must_use]
    pub fn new(val: StateValue, ack: bool) -> Self {
        let now = Utc::now();
        Self {
            val,
            ack,
            ts: now,
            lc: now,
        }
    }
}

/// A change notification for a subscribed state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    /// The id of the changed state.
    pub id: StatePath,
    /// The state after the change.
    pub state: State,
}

/// A hierarchical key/value + metadata registry.
///
/// Implementations must be usable from several tasks at once.
pub trait StateStore: Send + Sync {
    /// Returns the current state of `id`.
    fn get_state(&self, id: &StatePath) -> Option<State>;

    /// Writes a state unconditionally and emits a change event if `id` is
    /// subscribed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the write.
    fn set_state(&self, id: &StatePath, val: StateValue, ack: bool) -> Result<(), StoreError>;

    /// Writes a state only if its value or ack flag differs from the stored
    /// one. Returns `true` if a write happened.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the write.
    fn set_state_changed(
        &self,
        id: &StatePath,
        val: StateValue,
        ack: bool,
    ) -> Result<bool, StoreError>;

    /// Returns the object definition of `id`.
    fn get_object(&self, id: &StatePath) -> Option<ObjectDefinition>;

    /// Creates the object or merges `object` into the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the write.
    fn extend_object(&self, id: &StatePath, object: ObjectDefinition) -> Result<(), StoreError>;

    /// Registers interest in change events for ids matching `pattern`
    /// (`*` matches any run of characters).
    fn subscribe_states(&self, pattern: &str);

    /// Returns a receiver for change events of subscribed states.
    fn subscribe(&self) -> broadcast::Receiver<StateEvent>;
}

/// Matches an id against a subscription pattern where `*` is a wildcard.
///
/// # Examples
///
/// ```
/// use bambu_bridge::store::matches_pattern;
///
/// assert!(matches_pattern("printer.control.*", "printer.control.start"));
/// assert!(matches_pattern("*", "anything"));
/// assert!(!matches_pattern("printer.control.*", "printer.bed_temper"));
/// ```
#[must_use]
pub fn matches_pattern(pattern: &str, id: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return id.is_empty();
    };
    let Some(mut rest) = id.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        // No wildcard at all: exact match required.
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
