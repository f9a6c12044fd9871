// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printer connection configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default MQTT-over-TLS port of Bambu Lab printers.
pub const DEFAULT_PORT: u16 = 8883;

/// Username expected by the printer's local broker.
pub const DEFAULT_USERNAME: &str = "bblp";

/// Default delay between a connection loss and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default MQTT keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Default upper bound for the DISCONNECT handshake on shutdown.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection settings for one printer.
///
/// Build with [`PrinterConfig::builder`] or load from JSON with
/// [`PrinterConfig::from_json`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bambu_bridge::PrinterConfig;
///
/// let config = PrinterConfig::builder()
///     .host("192.168.1.40")
///     .password("12345678")
///     .serial("01P00A000000000")
///     .reconnect_delay(Duration::from_secs(10))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.port, 8883);
/// assert_eq!(config.report_topic(), "device/01P00A000000000/report");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Printer hostname or IP address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Broker username.
    pub username: String,
    /// Broker password (the printer's LAN access code).
    pub password: String,
    /// Printer serial number, used in topics and as the state root.
    pub serial: String,
    /// Optional `user_id` attached to outbound commands.
    pub user_id: Option<String>,
    /// MQTT client identifier.
    pub client_id: String,
    /// Whether to wrap the connection in TLS.
    pub tls: bool,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
    /// Delay before reconnecting after a connection loss.
    pub reconnect_delay: Duration,
    /// Upper bound for the DISCONNECT handshake on shutdown.
    pub disconnect_timeout: Duration,
}

impl PrinterConfig {
    /// Returns a new builder.
    #[must_use]
    pub fn builder() -> PrinterConfigBuilder {
        PrinterConfigBuilder::default()
    }

    /// Parses the adapter's JSON configuration.
    ///
    /// Recognized keys are `host`, `Password`, `serial` and the optional
    /// `port`, `user_id`, `tls` and `reconnect_delay_secs`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on malformed JSON and
    /// `ConfigError::Missing` if a required key is empty or absent.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let mut builder = Self::builder()
            .host(raw.host)
            .password(raw.password)
            .serial(raw.serial)
            .tls(raw.tls.unwrap_or(true));
        if let Some(port) = raw.port {
            builder = builder.port(port);
        }
        if let Some(user_id) = raw.user_id.filter(|u| !u.is_empty()) {
            builder = builder.user_id(user_id);
        }
        if let Some(secs) = raw.reconnect_delay_secs {
            builder = builder.reconnect_delay(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Topic the printer publishes status reports on.
    #[must_use]
    pub fn report_topic(&self) -> String {
        format!("device/{}/report", self.serial)
    }

    /// Topic commands are published on.
    #[must_use]
    pub fn request_topic(&self) -> String {
        format!("device/{}/request", self.serial)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    host: String,
    #[serde(default, rename = "Password")]
    password: String,
    #[serde(default)]
    serial: String,
    port: Option<u16>,
    user_id: Option<String>,
    tls: Option<bool>,
    reconnect_delay_secs: Option<u64>,
}

/// Builder for [`PrinterConfig`].
#[derive(Debug, Clone)]
pub struct PrinterConfigBuilder {
    host: Option<String>,
    port: u16,
    username: String,
    password: Option<String>,
    serial: Option<String>,
    user_id: Option<String>,
    client_id: Option<String>,
    tls: bool,
    keep_alive: Duration,
    reconnect_delay: Duration,
    disconnect_timeout: Duration,
}

impl Default for PrinterConfigBuilder {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: None,
            serial: None,
            user_id: None,
            client_id: None,
            tls: true,
            keep_alive: DEFAULT_KEEP_ALIVE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}

impl PrinterConfigBuilder {
    /// Sets the printer host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the broker port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the broker username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the broker password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the printer serial.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Sets the `user_id` attached to commands.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Overrides the MQTT client id (defaults to `bambu_bridge_<serial>`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Enables or disables TLS.
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the disconnect timeout.
    #[must_use]
    pub fn disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if host, password or serial is unset
    /// or empty.
    pub fn build(self) -> Result<PrinterConfig, ConfigError> {
        let host = required(self.host, "host")?;
        let password = required(self.password, "password")?;
        let serial = required(self.serial, "serial")?;
        let client_id = self
            .client_id
            .unwrap_or_else(|| format!("bambu_bridge_{serial}"));

        Ok(PrinterConfig {
            host,
            port: self.port,
            username: self.username,
            password,
            serial,
            user_id: self.user_id,
            client_id,
            tls: self.tls,
            keep_alive: self.keep_alive,
            reconnect_delay: self.reconnect_delay,
            disconnect_timeout: self.disconnect_timeout,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PrinterConfigBuilder {
        PrinterConfig::builder()
            .host("printer.local")
            .password("secret")
            .serial("SN1")
    }

    #[test]
    fn defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.port, 8883);
        assert_eq!(config.username, "bblp");
        assert!(config.tls);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.client_id, "bambu_bridge_SN1");
        assert!(config.user_id.is_none());
    }

    #[test]
    fn topics() {
        let config = builder().build().unwrap();
        assert_eq!(config.report_topic(), "device/SN1/report");
        assert_eq!(config.request_topic(), "device/SN1/request");
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = PrinterConfig::builder().password("x").serial("y").build();
        assert!(matches!(err, Err(ConfigError::Missing("host"))));

        let err = builder().serial("  ").build();
        assert!(matches!(err, Err(ConfigError::Missing("serial"))));
    }

    #[test]
    fn from_json_uses_adapter_keys() {
        let config = PrinterConfig::from_json(
            r#"{"host": "10.0.0.5", "Password": "abcd", "serial": "SN9", "user_id": "77"}"#,
        )
        .unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.password, "abcd");
        assert_eq!(config.serial, "SN9");
        assert_eq!(config.user_id.as_deref(), Some("77"));
        assert!(config.tls);
    }

    #[test]
    fn from_json_overrides() {
        let config = PrinterConfig::from_json(
            r#"{"host": "h", "Password": "p", "serial": "s", "port": 1883, "tls": false, "reconnect_delay_secs": 1, "user_id": ""}"#,
        )
        .unwrap();
        assert_eq!(config.port, 1883);
        assert!(!config.tls);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert!(config.user_id.is_none());
    }

    #[test]
    fn from_json_errors() {
        assert!(matches!(
            PrinterConfig::from_json("{"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PrinterConfig::from_json(r#"{"host": "h", "serial": "s"}"#),
            Err(ConfigError::Missing("password"))
        ));
    }
}
