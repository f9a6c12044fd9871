// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wiring of session, dispatcher, translator and store.
//!
//! ```text
//!  printer ──report──▶ Session ──▶ Dispatcher ──▶ StateStore
//!                         ▲                          │ change events
//!                         │                          ▼
//!                     Publisher ◀── CommandTranslator ◀┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use bambu_bridge::{Bridge, MemoryStore, PrinterConfig};
//!
//! # async fn example() -> bambu_bridge::Result<()> {
//! let config = PrinterConfig::builder()
//!     .host("192.168.1.40")
//!     .password("12345678")
//!     .serial("01P00A000000000")
//!     .build()?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut bridge = Bridge::new(config, store).start()?;
//!
//! // ... later
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::command::CommandTranslator;
use crate::config::PrinterConfig;
use crate::error::Result;
use crate::explorer::Explorer;
use crate::protocol::{Dispatcher, Publisher, Session, SessionState, reset_connection_state};
use crate::store::{StateEvent, StateStore};

/// A bridge between one printer and a state store, ready to start.
#[derive(Debug)]
pub struct Bridge<S: ?Sized> {
    config: PrinterConfig,
    explorer: Option<Explorer>,
    store: Arc<S>,
}

impl<S: StateStore + ?Sized + 'static> Bridge<S> {
    /// Creates a bridge for `config` writing into `store`.
    #[must_use]
    pub fn new(config: PrinterConfig, store: Arc<S>) -> Self {
        Self {
            config,
            explorer: None,
            store,
        }
    }

    /// Uses a custom explorer for telemetry projection.
    #[must_use]
    pub fn with_explorer(mut self, explorer: Explorer) -> Self {
        self.explorer = Some(explorer);
        self
    }

    /// Resets the connectivity flag and spawns the session and command
    /// tasks.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the connectivity flag cannot be written or the
    /// TLS configuration cannot be built.
    pub fn start(self) -> Result<BridgeHandle> {
        reset_connection_state(&*self.store)?;

        let serial = self.config.serial.clone();
        let mut dispatcher = Dispatcher::new(serial.clone(), Arc::clone(&self.store));
        if let Some(explorer) = self.explorer {
            dispatcher = dispatcher.with_explorer(explorer);
        }
        let translator =
            CommandTranslator::new(serial.clone()).with_user_id(self.config.user_id.clone());

        let session = Session::new(self.config, Arc::clone(&self.store), dispatcher)?;
        let publisher = session.publisher();
        let state = session.watch_state();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let commands = tokio::spawn(forward_commands(
            self.store.subscribe(),
            translator,
            publisher.clone(),
            shutdown_rx.clone(),
        ));
        let session = tokio::spawn(session.run(shutdown_rx));
        tracing::info!(serial = %serial, "Bridge started");

        Ok(BridgeHandle {
            serial,
            shutdown_tx,
            state,
            publisher,
            session: Some(session),
            commands: Some(commands),
        })
    }
}

/// Handle to a running bridge.
///
/// Dropping the handle stops both tasks without waiting for them.
#[derive(Debug)]
pub struct BridgeHandle {
    serial: String,
    shutdown_tx: watch::Sender<bool>,
    state: watch::Receiver<SessionState>,
    publisher: Publisher,
    session: Option<JoinHandle<()>>,
    commands: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    /// Returns the printer serial.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a receiver that follows the session state.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Returns the publisher used for commands.
    #[must_use]
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has completed.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.session.is_none() && self.commands.is_none()
    }

    /// Stops both tasks, disconnects and clears the connectivity flag.
    ///
    /// Calling this again is a no-op.
    pub async fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);

        for task in [self.commands.take(), self.session.take()].into_iter().flatten() {
            if let Err(e) = task.await {
                tracing::warn!(serial = %self.serial, error = %e, "Bridge task failed");
            }
        }
        tracing::debug!(serial = %self.serial, "Bridge stopped");
    }
}

/// Publishes a command for every user write on a control state.
async fn forward_commands(
    mut events: broadcast::Receiver<StateEvent>,
    translator: CommandTranslator,
    publisher: Publisher,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(command) = translator.translate(&event) {
                        tracing::info!(
                            id = %event.id,
                            command = command.command().name(),
                            "Sending command to printer"
                        );
                        publisher.send(&command);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Command listener lagged behind state changes");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::protocol::connection_state_id;
    use crate::store::MemoryStore;
    use crate::types::StateValue;

    fn config() -> PrinterConfig {
        PrinterConfig::builder()
            .host("127.0.0.1")
            .port(1)
            .password("secret")
            .serial("SN1")
            .tls(false)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn start_resets_flag_and_shutdown_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_state(&connection_state_id(), true.into(), true)
            .unwrap();

        let mut handle = Bridge::new(config(), Arc::clone(&store)).start().unwrap();
        assert_eq!(
            store.get_state(&connection_state_id()).map(|s| s.val),
            Some(StateValue::Bool(false))
        );
        assert_eq!(handle.serial(), "SN1");

        handle.shutdown().await;
        assert!(handle.is_shut_down());
        assert_eq!(handle.state(), SessionState::Closed);

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn drop_stops_tasks() {
        let store = Arc::new(MemoryStore::new());
        let handle = Bridge::new(config(), Arc::clone(&store)).start().unwrap();
        let mut state = handle.watch_state();
        drop(handle);

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == SessionState::Closed),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
