// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing of inbound printer messages into the state store.
//!
//! ```text
//! device/<serial>/report: {"print": {...}}
//!                     ↓
//!           parse_message() → InboundMessage::Telemetry
//!                     ↓
//!           normalize::apply(print)
//!                     ↓
//!           Explorer.traverse(print, "<serial>")
//!                     ↓
//!           lights_report[0].mode → <serial>.control.chamberLight
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use super::MessageHandler;
use crate::command::ControlState;
use crate::error::{Error, ProjectionError};
use crate::explorer::{AttributeTable, Explorer};
use crate::store::StateStore;
use crate::telemetry::{InboundMessage, normalize, parse_message};
use crate::types::StatePath;

/// Key of the light status array in telemetry.
pub const LIGHTS_REPORT_KEY: &str = "lights_report";

/// Projects inbound documents of one printer into a [`StateStore`].
#[derive(Debug)]
pub struct Dispatcher<S: ?Sized> {
    serial: String,
    root: StatePath,
    explorer: Explorer,
    store: Arc<S>,
}

impl<S: StateStore + ?Sized> Dispatcher<S> {
    /// Creates a dispatcher rooting all states at `<serial>`.
    #[must_use]
    pub fn new(serial: impl Into<String>, store: Arc<S>) -> Self {
        let serial = serial.into();
        Self {
            root: StatePath::root(&serial),
            serial,
            explorer: Explorer::new(AttributeTable::bambu()),
            store,
        }
    }

    /// Replaces the explorer.
    #[must_use]
    pub fn with_explorer(mut self, explorer: Explorer) -> Self {
        self.explorer = explorer;
        self
    }

    /// Applies one classified message to the store.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError` if the `print` section is not an object or
    /// a store write fails.
    pub fn dispatch(&self, message: InboundMessage) -> Result<(), ProjectionError> {
        match message {
            telemetry @ InboundMessage::Telemetry(_) => {
                if let Some(print) = telemetry.into_telemetry()? {
                    self.apply_telemetry(print)?;
                }
            }
            InboundMessage::System(system) => {
                tracing::debug!(
                    serial = %self.serial,
                    command = system.get("command").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    sequence_id = system.get("sequence_id").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    result = system.get("result").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    "System message received"
                );
            }
            InboundMessage::Unknown => {
                tracing::trace!(serial = %self.serial, "Ignoring message without known section");
            }
        }
        Ok(())
    }

    fn apply_telemetry(&self, mut print: Map<String, Value>) -> Result<(), ProjectionError> {
        normalize::apply(&mut print);
        let stats = self
            .explorer
            .traverse(&*self.store, &print, &self.root, true, true, 0)?;
        tracing::trace!(
            serial = %self.serial,
            visited = stats.visited,
            changed = stats.changed,
            created = stats.created,
            depth = stats.max_depth,
            "Telemetry projected"
        );
        self.derive_chamber_light(&print)
    }

    /// Mirrors the first `lights_report` entry into the chamber light
    /// control state.
    fn derive_chamber_light(&self, print: &Map<String, Value>) -> Result<(), ProjectionError> {
        let mode = print
            .get(LIGHTS_REPORT_KEY)
            .and_then(Value::as_array)
            .and_then(|reports| reports.first())
            .and_then(|report| report.get("mode"))
            .and_then(Value::as_str);
        let on = match mode {
            Some("on") => true,
            Some("off") => false,
            _ => return Ok(()),
        };

        let id = ControlState::ChamberLight.path(&self.serial);
        self.store
            .set_state_changed(&id, on.into(), true)
            .map_err(|source| ProjectionError::Write {
                path: id.to_string(),
                source,
            })?;
        Ok(())
    }
}

impl<S: StateStore + ?Sized> MessageHandler for Dispatcher<S> {
    fn handle(&self, _topic: &str, payload: &[u8]) -> Result<(), Error> {
        let message = parse_message(payload)?;
        self.dispatch(message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;
    use crate::types::StateValue;

    fn dispatcher() -> (Dispatcher<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Dispatcher::new("SN1", Arc::clone(&store)), store)
    }

    fn value(store: &MemoryStore, id: &str) -> Option<StateValue> {
        store.get_state(&id.parse().unwrap()).map(|s| s.val)
    }

    fn telemetry(print: Value) -> InboundMessage {
        InboundMessage::classify(json!({ "print": print }))
    }

    #[test]
    fn telemetry_is_normalized_and_projected() {
        let (dispatcher, store) = dispatcher();
        dispatcher
            .dispatch(telemetry(json!({
                "bed_temper": 60.5,
                "cooling_fan_speed": "15",
                "stg_cur": 2,
                "spd_lvl": 3,
                "mc_remaining_time": -4
            })))
            .unwrap();

        assert_eq!(value(&store, "SN1.bed_temper"), Some(StateValue::Number(60.5)));
        assert_eq!(value(&store, "SN1.cooling_fan_speed"), Some(StateValue::Number(100.0)));
        assert_eq!(value(&store, "SN1.stg_cur"), Some("heatbed preheating".into()));
        assert_eq!(value(&store, "SN1.spd_lvl"), Some("sport".into()));
        assert_eq!(value(&store, "SN1.mc_remaining_time"), Some(StateValue::Number(0.0)));
        assert!(store.get_state(&"SN1.bed_temper".parse().unwrap()).unwrap().ack);
    }

    #[test]
    fn lights_report_drives_chamber_light() {
        let (dispatcher, store) = dispatcher();

        dispatcher
            .dispatch(telemetry(json!({
                "lights_report": [{"node": "chamber_light", "mode": "on"}]
            })))
            .unwrap();
        let light = store
            .get_state(&ControlState::ChamberLight.path("SN1"))
            .unwrap();
        assert_eq!(light.val, StateValue::Bool(true));
        assert!(light.ack);

        dispatcher
            .dispatch(telemetry(json!({
                "lights_report": [{"node": "chamber_light", "mode": "off"}]
            })))
            .unwrap();
        assert_eq!(
            value(&store, "SN1.control.chamberLight"),
            Some(StateValue::Bool(false))
        );
    }

    #[test]
    fn other_light_modes_are_ignored() {
        let (dispatcher, store) = dispatcher();
        for report in [json!([]), json!([{"mode": "flashing"}]), json!("on")] {
            dispatcher
                .dispatch(telemetry(json!({ "lights_report": report })))
                .unwrap();
        }
        assert!(store.get_state(&ControlState::ChamberLight.path("SN1")).is_none());
    }

    #[test]
    fn repeated_report_emits_no_events() {
        let (dispatcher, store) = dispatcher();
        store.subscribe_states("SN1.*");
        let mut rx = store.subscribe();
        let report = json!({
            "nozzle_temper": 220,
            "lights_report": [{"node": "chamber_light", "mode": "on"}],
            "ams": {"ams": [{"id": "0", "humidity": "4"}]}
        });

        dispatcher.dispatch(telemetry(report.clone())).unwrap();
        let mut first = 0;
        while rx.try_recv().is_ok() {
            first += 1;
        }
        assert!(first > 0);

        dispatcher.dispatch(telemetry(report)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn system_and_unknown_messages_leave_store_untouched() {
        let (dispatcher, store) = dispatcher();
        dispatcher
            .dispatch(InboundMessage::classify(json!({
                "system": {"sequence_id": "2003", "command": "ledctrl", "result": "success"}
            })))
            .unwrap();
        dispatcher.dispatch(InboundMessage::Unknown).unwrap();
        assert_eq!(store.state_count(), 0);
    }

    #[test]
    fn non_object_print_section_is_an_error() {
        let (dispatcher, _store) = dispatcher();
        let err = dispatcher.dispatch(telemetry(json!([1, 2]))).unwrap_err();
        assert!(matches!(err, ProjectionError::UnexpectedShape { .. }));
    }

    #[test]
    fn handle_reports_parse_errors() {
        let (dispatcher, store) = dispatcher();
        let err = dispatcher.handle("device/SN1/report", b"not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        dispatcher
            .handle("device/SN1/report", br#"{"print":{"layer_num":12}}"#)
            .unwrap();
        assert_eq!(value(&store, "SN1.layer_num"), Some(StateValue::Number(12.0)));
    }
}
