// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Name-keyed metadata for telemetry fields.
//!
//! When the explorer meets a JSON key for the first time it asks the
//! [`AttributeTable`] how to describe it. Keys without an entry fall back to
//! inference from the value type.

use std::collections::HashMap;

use crate::store::{ObjectDefinition, ValueType};
use crate::types::StateValue;

/// How an array value is projected into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayPolicy {
    /// One child node per element, named by index.
    #[default]
    Indexed,
    /// A single string node holding the compact JSON of the array.
    Serialized,
}

/// Metadata for one telemetry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Display name.
    pub name: &'static str,
    /// Role hint.
    pub role: &'static str,
    /// Unit of measurement.
    pub unit: Option<&'static str>,
    /// Array projection policy.
    pub array: ArrayPolicy,
}

impl Attribute {
    const fn new(name: &'static str, role: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            name,
            role,
            unit,
            array: ArrayPolicy::Indexed,
        }
    }

    const fn serialized(name: &'static str) -> Self {
        Self {
            name,
            role: "json",
            unit: None,
            array: ArrayPolicy::Serialized,
        }
    }
}

const CELSIUS: Option<&str> = Some("°C");
const PERCENT: Option<&str> = Some("%");

/// Known Bambu Lab telemetry keys.
const BAMBU_ATTRIBUTES: &[(&str, Attribute)] = &[
    ("nozzle_temper", Attribute::new("Nozzle temperature", "value.temperature", CELSIUS)),
    ("nozzle_target_temper", Attribute::new("Nozzle target temperature", "value.temperature", CELSIUS)),
    ("bed_temper", Attribute::new("Bed temperature", "value.temperature", CELSIUS)),
    ("bed_target_temper", Attribute::new("Bed target temperature", "value.temperature", CELSIUS)),
    ("chamber_temper", Attribute::new("Chamber temperature", "value.temperature", CELSIUS)),
    ("frame_temper", Attribute::new("Frame temperature", "value.temperature", CELSIUS)),
    ("mc_percent", Attribute::new("Print progress", "value.progress", PERCENT)),
    ("mc_remaining_time", Attribute::new("Remaining time", "value.interval", Some("min"))),
    ("layer_num", Attribute::new("Current layer", "value", None)),
    ("total_layer_num", Attribute::new("Total layers", "value", None)),
    ("cooling_fan_speed", Attribute::new("Part cooling fan", "value.speed", PERCENT)),
    ("heatbreak_fan_speed", Attribute::new("Heatbreak fan", "value.speed", PERCENT)),
    ("big_fan1_speed", Attribute::new("Auxiliary fan", "value.speed", PERCENT)),
    ("big_fan2_speed", Attribute::new("Chamber fan", "value.speed", PERCENT)),
    ("spd_lvl", Attribute::new("Speed profile", "text", None)),
    ("spd_mag", Attribute::new("Speed magnitude", "value.speed", PERCENT)),
    ("stg_cur", Attribute::new("Current stage", "text", None)),
    ("gcode_state", Attribute::new("Print state", "text", None)),
    ("gcode_file", Attribute::new("G-code file", "text", None)),
    ("subtask_name", Attribute::new("Job name", "text", None)),
    ("print_error", Attribute::new("Print error code", "value", None)),
    ("wifi_signal", Attribute::new("Wi-Fi signal", "value", Some("dBm"))),
    ("humidity", Attribute::new("AMS humidity level", "value.humidity", None)),
    ("hms", Attribute::serialized("Health management messages")),
    ("stg", Attribute::serialized("Stage history")),
];

/// A lookup table from JSON key names to [`Attribute`]s.
///
/// # Examples
///
/// ```
/// use bambu_bridge::explorer::{ArrayPolicy, AttributeTable};
///
/// let table = AttributeTable::bambu();
/// assert_eq!(table.array_policy("hms"), ArrayPolicy::Serialized);
/// assert_eq!(table.array_policy("lights_report"), ArrayPolicy::Indexed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    entries: HashMap<&'static str, Attribute>,
}

impl AttributeTable {
    /// Creates an empty table: every key is inferred.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the table of known Bambu Lab telemetry keys.
    #[must_use]
    pub fn bambu() -> Self {
        Self {
            entries: BAMBU_ATTRIBUTES.iter().cloned().collect(),
        }
    }

    /// Adds or replaces an entry.
    #[must_use]
    pub fn with(mut self, key: &'static str, attribute: Attribute) -> Self {
        self.entries.insert(key, attribute);
        self
    }

    /// Adds or replaces an entry that serializes arrays.
    #[must_use]
    pub fn with_serialized(self, key: &'static str, name: &'static str) -> Self {
        self.with(key, Attribute::serialized(name))
    }

    /// Returns the entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.entries.get(key)
    }

    /// Returns the array policy for `key`.
    #[must_use]
    pub fn array_policy(&self, key: &str) -> ArrayPolicy {
        self.get(key).map_or(ArrayPolicy::default(), |a| a.array)
    }

    /// Builds the object definition for a new leaf named `key`.
    ///
    /// The declared type always follows the value; name, role and unit come
    /// from the table entry if there is one.
    #[must_use]
    pub fn state_definition(&self, key: &str, value: &StateValue) -> ObjectDefinition {
        let value_type = ValueType::of(value);
        match self.get(key) {
            Some(attr) => {
                let definition = ObjectDefinition::state(attr.name, value_type, attr.role);
                match attr.unit {
                    Some(unit) => definition.with_unit(unit),
                    None => definition,
                }
            }
            None => ObjectDefinition::state(key, value_type, inferred_role(value_type)),
        }
    }
}

fn inferred_role(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Number => "value",
        ValueType::Boolean => "indicator",
        ValueType::String => "text",
        ValueType::Mixed => "state",
    }
}
