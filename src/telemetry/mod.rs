// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound message decoding.
//!
//! The printer publishes JSON on two topics:
//!
//! - `device/<serial>/report` - periodic `{"print": {...}}` status reports
//! - `device/<serial>/request` - the loopback of requests, including
//!   `{"system": {...}}` acknowledgements
//!
//! [`parse_message`] decodes a payload and classifies it by its top-level
//! shape into an [`InboundMessage`].
//!
//! # Examples
//!
//! ```
//! use bambu_bridge::telemetry::{InboundMessage, parse_message};
//!
//! let msg = parse_message(br#"{"print":{"nozzle_temper":220.0}}"#).unwrap();
//! assert!(matches!(msg, InboundMessage::Telemetry(_)));
//!
//! let msg = parse_message(br#"{"system":{"command":"ledctrl","result":"success"}}"#).unwrap();
//! assert!(matches!(msg, InboundMessage::System(_)));
//! ```

pub mod normalize;

use serde_json::Value;

use crate::error::{ParseError, ProjectionError};

/// Top-level key of telemetry documents.
pub const PRINT_SECTION: &str = "print";

/// Top-level key of system documents.
pub const SYSTEM_SECTION: &str = "system";

/// A classified inbound document.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A document with a `print` section; holds the section itself.
    Telemetry(Value),
    /// A document with a `system` section; holds the section itself.
    System(Value),
    /// Anything else.
    Unknown,
}

impl InboundMessage {
    /// Classifies a decoded document.
    ///
    /// A `print` section takes precedence over a `system` section.
    #[must_use]
    pub fn classify(document: Value) -> Self {
        let Value::Object(mut map) = document else {
            return Self::Unknown;
        };
        if let Some(print) = map.remove(PRINT_SECTION) {
            return Self::Telemetry(print);
        }
        if let Some(system) = map.remove(SYSTEM_SECTION) {
            return Self::System(system);
        }
        Self::Unknown
    }

    /// Returns the `print` section as an object map.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::UnexpectedShape` if this is a telemetry
    /// message whose `print` section is not an object.
    pub fn into_telemetry(self) -> Result<Option<serde_json::Map<String, Value>>, ProjectionError> {
        match self {
            Self::Telemetry(Value::Object(map)) => Ok(Some(map)),
            Self::Telemetry(_) => Err(ProjectionError::UnexpectedShape {
                section: PRINT_SECTION.to_string(),
                expected: "an object",
            }),
            Self::System(_) | Self::Unknown => Ok(None),
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Telemetry(_) => "telemetry",
            Self::System(_) => "system",
            Self::Unknown => "unknown",
        }
    }
}

/// Decodes a raw payload as UTF-8 JSON and classifies it.
///
/// # Errors
///
/// Returns `ParseError` if the payload is not UTF-8 or not valid JSON.
pub fn parse_message(payload: &[u8]) -> Result<InboundMessage, ParseError> {
    let text = std::str::from_utf8(payload)?;
    let document: Value = serde_json::from_str(text)?;
    Ok(InboundMessage::classify(document))
}
