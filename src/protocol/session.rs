// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MQTT session with one printer.
//!
//! A [`Session`] owns the client, its event loop and the
//! [`SessionMachine`]. It runs as a single task:
//!
//! - the event loop is polled only while connecting or connected, so the
//!   client never redials on its own
//! - after a connection loss the task sleeps until the one pending
//!   reconnect deadline, then resumes polling, which redials
//! - every inbound publish is handed to the [`MessageHandler`] in order

use std::sync::Arc;

use rumqttc::{AsyncClient, ConnAck, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use tokio::sync::watch;
use tokio::time::Instant;

use super::machine::{SessionMachine, SessionState};
use super::{Publisher, tls};
use crate::command::ControlState;
use crate::config::PrinterConfig;
use crate::error::{Error, StoreError, TransportError};
use crate::store::{ObjectDefinition, StateStore, ValueType};
use crate::types::StatePath;

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// Largest packet accepted or sent. Full status reports exceed the
/// client's 10 KiB default.
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Receives inbound publishes from the session task.
pub trait MessageHandler: Send + Sync {
    /// Handles one payload received on `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded or applied. The
    /// session logs it and carries on with the next message.
    fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), Error>;
}

/// Returns the id of the connectivity flag, `info.connection`.
#[must_use]
pub fn connection_state_id() -> StatePath {
    StatePath::root("info").child("connection")
}

/// Declares the connectivity flag and resets it to `false`.
///
/// # Errors
///
/// Returns `StoreError` if the store rejects the object or the write.
pub fn reset_connection_state<S: StateStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    let id = connection_state_id();
    store.extend_object(&StatePath::root("info"), ObjectDefinition::channel("Information"))?;
    store.extend_object(
        &id,
        ObjectDefinition::state("Device or service connected", ValueType::Boolean, "indicator.connected"),
    )?;
    store.set_state(&id, false.into(), true)
}

/// What woke the session task up.
enum Step {
    Shutdown,
    ReconnectDue,
    Event(Result<Event, rumqttc::ConnectionError>),
}

/// An MQTT session bound to one printer.
pub struct Session<S: ?Sized, H> {
    config: PrinterConfig,
    client: AsyncClient,
    event_loop: EventLoop,
    machine: SessionMachine,
    state_tx: watch::Sender<SessionState>,
    handler: H,
    store: Arc<S>,
}

impl<S: StateStore + ?Sized, H: MessageHandler> Session<S, H> {
    /// Creates a session. Nothing is sent until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Tls` if TLS is enabled and the client
    /// configuration cannot be built.
    pub fn new(config: PrinterConfig, store: Arc<S>, handler: H) -> Result<Self, TransportError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options
            .set_credentials(&config.username, &config.password)
            .set_keep_alive(config.keep_alive)
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if config.tls {
            options.set_transport(Transport::tls_with_config(tls::client_config()?.into()));
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let machine = SessionMachine::new(config.reconnect_delay);
        let (state_tx, _) = watch::channel(machine.state());

        Ok(Self {
            config,
            client,
            event_loop,
            machine,
            state_tx,
            handler,
            store,
        })
    }

    /// Returns a publisher for the printer's request topic.
    #[must_use]
    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.client.clone(), self.config.request_topic())
    }

    /// Returns a receiver that follows the session state.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Runs the session until `shutdown` turns `true` or its sender is
    /// dropped, then closes the connection.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if !*shutdown.borrow_and_update() && self.machine.request_connect() {
            self.publish_state();
            tracing::debug!(
                host = %self.config.host,
                port = self.config.port,
                serial = %self.config.serial,
                "Try to connect to printer"
            );

            loop {
                let polling = self.machine.state().is_active();
                let deadline = self.machine.reconnect_deadline();

                let step = tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_ok() && !*shutdown.borrow() {
                            continue;
                        }
                        Step::Shutdown
                    }
                    () = wait_until(deadline) => Step::ReconnectDue,
                    event = self.event_loop.poll(), if polling => Step::Event(event),
                };

                match step {
                    Step::Shutdown => break,
                    Step::ReconnectDue => self.on_reconnect_due(),
                    Step::Event(Ok(event)) => self.on_event(event),
                    Step::Event(Err(e)) => self.on_connection_lost(&TransportError::Connection(e)),
                }
            }
        }

        self.close().await;
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(connack)) => self.on_connected(&connack),
            Event::Incoming(Packet::Publish(publish)) => {
                if let Err(e) = self.handler.handle(&publish.topic, &publish.payload) {
                    tracing::warn!(topic = %publish.topic, error = %e, "Failed to handle printer message");
                }
            }
            Event::Incoming(Packet::SubAck(suback)) => {
                tracing::debug!(?suback, "Subscription acknowledged");
            }
            Event::Incoming(Packet::Disconnect) => {
                // Drop the socket now so the next poll redials instead of
                // reading EOF on the old one
                self.event_loop.clean();
                self.on_connection_lost(&TransportError::ClosedByPeer);
            }
            _ => {}
        }
    }

    fn on_connected(&mut self, connack: &ConnAck) {
        if !self.machine.connection_established() {
            tracing::debug!(?connack, "Ignoring ConnAck outside of connect");
            return;
        }
        tracing::info!(host = %self.config.host, serial = %self.config.serial, "Printer connected");
        self.set_connection_flag(true);

        if let Err(e) = ControlState::provision(&*self.store, &self.config.serial) {
            tracing::warn!(error = %e, "Failed to provision control states");
        }

        for topic in [self.config.report_topic(), self.config.request_topic()] {
            match self.client.try_subscribe(&topic, QoS::AtMostOnce) {
                Ok(()) => tracing::debug!(topic = %topic, "Subscribed to printer topic"),
                Err(source) => {
                    let error = TransportError::Subscribe { topic, source };
                    tracing::warn!(error = %error, "Subscribe failed");
                }
            }
        }
        self.publish_state();
    }

    fn on_connection_lost(&mut self, error: &TransportError) {
        let previous = self.machine.state();
        if !self.machine.transport_failed(Instant::now()) {
            return;
        }
        self.set_connection_flag(false);
        self.publish_state();

        if previous == SessionState::Connected {
            tracing::info!(serial = %self.config.serial, "Connection to Printer closed");
        }
        tracing::warn!(
            error = %error,
            retry_in = ?self.config.reconnect_delay,
            "Connection issue occurred"
        );
    }

    fn on_reconnect_due(&mut self) {
        if self.machine.reconnect_due(Instant::now()) {
            self.publish_state();
            tracing::info!(
                host = %self.config.host,
                attempt = self.machine.attempts(),
                "Reconnecting"
            );
        }
    }

    async fn close(&mut self) {
        let Some(previous) = self.machine.close() else {
            return;
        };
        if previous == SessionState::Connected {
            self.disconnect().await;
        }
        self.set_connection_flag(false);
        self.publish_state();
        tracing::info!(serial = %self.config.serial, "Connection to Printer closed");
    }

    /// Sends DISCONNECT and drives the event loop until it is written,
    /// bounded by the configured timeout.
    async fn disconnect(&mut self) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(error = %e, "Could not queue disconnect");
            return;
        }
        let event_loop = &mut self.event_loop;
        let flushed = tokio::time::timeout(self.config.disconnect_timeout, async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        if flushed.is_err() {
            tracing::debug!("Disconnect timed out");
        }
    }

    fn set_connection_flag(&self, connected: bool) {
        let id = connection_state_id();
        if let Err(e) = self.store.set_state_changed(&id, connected.into(), true) {
            tracing::warn!(id = %id, error = %e, "Failed to update connection state");
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.machine.state());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;

    struct Ignore;

    impl MessageHandler for Ignore {
        fn handle(&self, _topic: &str, _payload: &[u8]) -> Result<(), Error> {
            Ok(())
        }
    }

    fn config() -> PrinterConfig {
        PrinterConfig::builder()
            .host("127.0.0.1")
            .port(1)
            .password("secret")
            .serial("SN1")
            .tls(false)
            .reconnect_delay(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[test]
    fn reset_declares_flag() {
        let store = MemoryStore::new();
        reset_connection_state(&store).unwrap();

        let state = store.get_state(&connection_state_id()).unwrap();
        assert_eq!(state.val, false.into());
        assert!(state.ack);
        assert_eq!(connection_state_id().to_string(), "info.connection");
    }

    #[test]
    fn builds_tls_session() {
        let store = Arc::new(MemoryStore::new());
        let mut config = config();
        config.tls = true;
        let session = Session::new(config, store, Ignore).unwrap();
        assert_eq!(session.publisher().topic(), "device/SN1/request");
        assert_eq!(*session.watch_state().borrow(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_before_start_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(config(), Arc::clone(&store), Ignore).unwrap();
        let state = session.watch_state();
        let (_tx, rx) = watch::channel(true);

        session.run(rx).await;

        assert_eq!(*state.borrow(), SessionState::Closed);
        assert_eq!(
            store.get_state(&connection_state_id()).map(|s| s.val),
            Some(false.into())
        );
    }

    #[tokio::test]
    async fn refused_connection_schedules_reconnect() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(config(), Arc::clone(&store), Ignore).unwrap();
        let mut state = session.watch_state();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(session.run(rx));

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == SessionState::Reconnecting),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            store.get_state(&connection_state_id()).map(|s| s.val),
            Some(false.into())
        );

        tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(*state.borrow(), SessionState::Closed);
    }
}
