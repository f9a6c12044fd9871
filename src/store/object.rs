// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static metadata attached to state store entries.

use serde::{Deserialize, Serialize};

use crate::types::StateValue;

/// The kind of a store object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A grouping node (JSON object or the control section).
    Channel,
    /// A leaf holding a value.
    State,
}

/// The declared type of a state's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Boolean.
    Boolean,
    /// Number.
    Number,
    /// String.
    String,
    /// Any JSON scalar (used for `null` leaves).
    Mixed,
}

impl ValueType {
    /// Infers the declared type from a value.
    #[must_use]
    pub fn of(value: &StateValue) -> Self {
        match value {
            StateValue::Bool(_) => Self::Boolean,
            StateValue::Number(_) => Self::Number,
            StateValue::Text(_) => Self::String,
            StateValue::Null => Self::Mixed,
        }
    }
}

/// Common attributes of an object (display name, type, role, access).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonAttributes {
    /// Display name.
    pub name: String,
    /// Declared value type; `None` for channels.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Role hint such as `value.temperature` or `button.start`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Whether the value may be read.
    pub read: bool,
    /// Whether the value may be written by users.
    pub write: bool,
    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A store object definition: kind plus common attributes.
///
/// # Examples
///
/// ```
/// use bambu_bridge::store::{ObjectDefinition, ValueType};
///
/// let light = ObjectDefinition::state("Chamber Light", ValueType::Boolean, "state").writable();
/// assert!(light.common.write);
///
/// let control = ObjectDefinition::channel("Control device");
/// assert!(control.common.value_type.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Object kind.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Common attributes.
    pub common: CommonAttributes,
}

impl ObjectDefinition {
    /// Creates a channel definition.
    #[must_use]
    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Channel,
            common: CommonAttributes {
                name: name.into(),
                value_type: None,
                role: None,
                read: true,
                write: false,
                unit: None,
            },
        }
    }

    /// Creates a read-only state definition.
    #[must_use]
    pub fn state(name: impl Into<String>, value_type: ValueType, role: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::State,
            common: CommonAttributes {
                name: name.into(),
                value_type: Some(value_type),
                role: Some(role.into()),
                read: true,
                write: false,
                unit: None,
            },
        }
    }

    /// Marks the state as writable.
    #[must_use]
    pub fn writable(mut self) -> Self {
        self.common.write = true;
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.common.unit = Some(unit.into());
        self
    }

    /// Merges `other` into `self`, the way an extend operation does:
    /// kind and all set attributes of `other` win, unset optional
    /// attributes keep their previous value.
    pub fn extend(&mut self, other: ObjectDefinition) {
        self.kind = other.kind;
        self.common.name = other.common.name;
        self.common.read = other.common.read;
        self.common.write = other.common.write;
        if other.common.value_type.is_some() {
            self.common.value_type = other.common.value_type;
        }
        if other.common.role.is_some() {
            self.common.role = other.common.role;
        }
        if other.common.unit.is_some() {
            self.common.unit = other.common.unit;
        }
    }
}
