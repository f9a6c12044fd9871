// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory state store.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{ObjectDefinition, State, StateEvent, StateStore, matches_pattern};
use crate::error::StoreError;
use crate::types::{StatePath, StateValue};

/// Capacity of the change event channel.
const EVENT_CAPACITY: usize = 256;

/// A thread-safe, in-process [`StateStore`].
///
/// States and objects are kept in ordered maps so dumps are stable.
/// Change events are broadcast for ids matching a subscribed pattern. A
/// receiver that falls more than 256 events behind gets
/// `RecvError::Lagged` and loses the oldest ones.
///
/// # Examples
///
/// ```
/// use bambu_bridge::store::{MemoryStore, StateStore};
/// use bambu_bridge::types::StatePath;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.subscribe_states("printer.control.*");
/// let mut events = store.subscribe();
///
/// let id = StatePath::root("printer").child("control").child("start");
/// store.set_state(&id, true.into(), false).unwrap();
///
/// let event = events.recv().await.unwrap();
/// assert_eq!(event.id, id);
/// assert!(!event.state.ack);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    states: RwLock<BTreeMap<StatePath, State>>,
    objects: RwLock<BTreeMap<StatePath, ObjectDefinition>>,
    patterns: RwLock<Vec<String>>,
    events: broadcast::Sender<StateEvent>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            states: RwLock::default(),
            objects: RwLock::default(),
            patterns: RwLock::default(),
            events,
        }
    }

    /// Returns the number of stored states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.read().len()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns the ids of all stored states, in order.
    #[must_use]
    pub fn state_ids(&self) -> Vec<StatePath> {
        self.states.read().keys().cloned().collect()
    }

    fn is_subscribed(&self, id: &StatePath) -> bool {
        let id = id.to_string();
        self.patterns
            .read()
            .iter()
            .any(|pattern| matches_pattern(pattern, &id))
    }

    /// Writes `val` and broadcasts the change while the state map is still
    /// locked, so events for one id leave in the order they were stored.
    fn write(&self, id: &StatePath, val: StateValue, ack: bool, only_changed: bool) -> bool {
        let mut states = self.states.write();
        let now = Utc::now();
        let state = match states.get_mut(id) {
            Some(existing) if only_changed && existing.val == val && existing.ack == ack => {
                return false;
            }
            Some(existing) => {
                if existing.val != val {
                    existing.lc = now;
                }
                existing.val = val;
                existing.ack = ack;
                existing.ts = now;
                existing.clone()
            }
            None => {
                let state = State::new(val, ack);
                states.insert(id.clone(), state.clone());
                state
            }
        };

        tracing::trace!(id = %id, val = %state.val, ack = state.ack, "State written");
        if self.is_subscribed(id) {
            // No receivers is not an error
            let _ = self.events.send(StateEvent {
                id: id.clone(),
                state,
            });
        }
        drop(states);
        true
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, id: &StatePath) -> Option<State> {
        self.states.read().get(id).cloned()
    }

    fn set_state(&self, id: &StatePath, val: StateValue, ack: bool) -> Result<(), StoreError> {
        self.write(id, val, ack, false);
        Ok(())
    }

    fn set_state_changed(
        &self,
        id: &StatePath,
        val: StateValue,
        ack: bool,
    ) -> Result<bool, StoreError> {
        Ok(self.write(id, val, ack, true))
    }

    fn get_object(&self, id: &StatePath) -> Option<ObjectDefinition> {
        self.objects.read().get(id).cloned()
    }

    fn extend_object(&self, id: &StatePath, object: ObjectDefinition) -> Result<(), StoreError> {
        let mut objects = self.objects.write();
        match objects.get_mut(id) {
            Some(existing) => existing.extend(object),
            None => {
                tracing::trace!(id = %id, kind = ?object.kind, "Object created");
                objects.insert(id.clone(), object);
            }
        }
        Ok(())
    }

    fn subscribe_states(&self, pattern: &str) {
        let mut patterns = self.patterns.write();
        if !patterns.iter().any(|p| p == pattern) {
            patterns.push(pattern.to_string());
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }
}
