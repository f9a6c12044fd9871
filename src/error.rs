// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Every failure the bridge can run into at runtime is recovered locally:
//! transport failures drive the reconnect state machine, malformed payloads
//! and projection failures drop a single message, publish failures drop a
//! single command. The types below exist so those failures can be logged
//! with context and asserted on in tests.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The MQTT transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An inbound payload could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An inbound document could not be projected into the state store.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// An outbound command could not be sent.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// The state store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The printer configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the MQTT connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established or was dropped.
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The broker closed the connection.
    #[error("connection closed by printer")]
    ClosedByPeer,

    /// The TLS client configuration could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    /// A subscribe request could not be queued.
    #[error("subscribe to {topic} failed: {source}")]
    Subscribe {
        /// The topic that could not be subscribed.
        topic: String,
        /// The underlying client error.
        source: rumqttc::ClientError,
    },
}

/// Errors related to decoding inbound payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The payload is not valid UTF-8.
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The payload is not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while projecting a document into the state store.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A section had a shape the dispatcher cannot handle.
    #[error("unexpected shape for `{section}`: expected {expected}")]
    UnexpectedShape {
        /// The offending section name.
        section: String,
        /// What was expected instead.
        expected: &'static str,
    },

    /// Writing a node failed.
    #[error("failed to write `{path}`: {source}")]
    Write {
        /// The state path being written.
        path: String,
        /// The underlying store error.
        source: StoreError,
    },
}

/// Errors related to sending outbound commands.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The command could not be serialized.
    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The MQTT client refused the request (queue full or closed).
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Errors reported by a state store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The id is empty or contains an empty segment.
    #[error("invalid state id: {0:?}")]
    InvalidId(String),

    /// The backend failed to perform the operation.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors related to printer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is missing or empty.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
