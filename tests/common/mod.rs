// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted MQTT 3.1.1 peer that plays the printer's broker.
//!
//! mockforge-mqtt does not forward publishes between clients, so the tests
//! that need traffic in both directions talk to this instead. It speaks
//! just enough of the protocol for a QoS 0 client: CONNECT, SUBSCRIBE,
//! PUBLISH, PINGREQ and DISCONNECT.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bambu_bridge::PrinterConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;

const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
const DISCONNECT: [u8; 2] = [0xE0, 0x00];
const PINGRESP: [u8; 2] = [0xD0, 0x00];

/// How the first accepted connection behaves. Later ones always serve.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Acknowledge subscriptions, relay publishes both ways.
    Serve,
    /// Accept the CONNECT, then close the socket.
    DropAfterConnAck,
    /// Accept the CONNECT, send DISCONNECT and keep the socket open.
    DisconnectAfterConnAck,
}

#[derive(Clone)]
struct Shared {
    subscriptions: Arc<watch::Sender<usize>>,
    reports: broadcast::Sender<Vec<u8>>,
    requests: mpsc::UnboundedSender<(String, Vec<u8>)>,
}

/// A listening fake printer.
pub struct FakePrinter {
    port: u16,
    connections: Arc<AtomicUsize>,
    subscriptions: watch::Receiver<usize>,
    reports: broadcast::Sender<Vec<u8>>,
    requests: mpsc::UnboundedReceiver<(String, Vec<u8>)>,
}

impl FakePrinter {
    /// Binds an ephemeral port and starts accepting connections.
    pub async fn start(first: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connections = Arc::new(AtomicUsize::new(0));
        let (subscriptions_tx, subscriptions) = watch::channel(0);
        let (reports, _) = broadcast::channel(16);
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let shared = Shared {
            subscriptions: Arc::new(subscriptions_tx),
            reports: reports.clone(),
            requests: requests_tx,
        };

        let accepted = Arc::clone(&connections);
        tokio::spawn(async move {
            let mut script = first;
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, script, shared.clone()));
                script = Script::Serve;
            }
        });

        Self {
            port,
            connections,
            subscriptions,
            reports,
            requests,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Waits until `count` SUBSCRIBE packets have been acknowledged.
    pub async fn wait_for_subscriptions(&mut self, count: usize) {
        timeout(
            Duration::from_secs(5),
            self.subscriptions.wait_for(|n| *n >= count),
        )
        .await
        .unwrap_or_else(|_| panic!("client did not subscribe {count} times"))
        .unwrap();
    }

    /// Sends a QoS 0 PUBLISH to every connected client.
    pub fn publish(&self, topic: &str, payload: &[u8]) {
        self.reports.send(publish_frame(topic, payload)).unwrap();
    }

    /// Returns the next PUBLISH sent by a client, or `None` if nothing
    /// arrives within `within`.
    pub async fn next_request(&mut self, within: Duration) -> Option<(String, Vec<u8>)> {
        timeout(within, self.requests.recv()).await.ok().flatten()
    }
}

/// A plain TCP configuration for serial `SN1` pointing at `port`.
pub fn config(port: u16, reconnect_delay: Duration) -> PrinterConfig {
    PrinterConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .password("12345678")
        .serial("SN1")
        .tls(false)
        .reconnect_delay(reconnect_delay)
        .build()
        .unwrap()
}

async fn serve(stream: TcpStream, script: Script, shared: Shared) {
    let (mut reader, mut writer) = stream.into_split();
    match read_packet(&mut reader).await {
        Ok((header, _)) if header >> 4 == 1 => {}
        _ => return,
    }
    if writer.write_all(&CONNACK_ACCEPTED).await.is_err() {
        return;
    }

    match script {
        Script::DropAfterConnAck => return,
        Script::DisconnectAfterConnAck => {
            let _ = writer.write_all(&DISCONNECT).await;
            // Hold the socket until the client closes it
            while read_packet(&mut reader).await.is_ok() {}
            return;
        }
        Script::Serve => {}
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let mut reports = shared.reports.subscribe();
    let reading = tokio::spawn(read_loop(reader, out_tx, shared));

    loop {
        let frame = tokio::select! {
            frame = out_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            report = reports.recv() => match report {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        if writer.write_all(&frame).await.is_err() {
            break;
        }
    }
    reading.abort();
}

async fn read_loop(mut reader: OwnedReadHalf, out: mpsc::UnboundedSender<Vec<u8>>, shared: Shared) {
    while let Ok((header, body)) = read_packet(&mut reader).await {
        match header >> 4 {
            3 => {
                if let Some(request) = decode_publish(header, &body) {
                    let _ = shared.requests.send(request);
                }
            }
            8 => {
                let _ = out.send(vec![0x90, 0x03, body[0], body[1], 0x00]);
                shared.subscriptions.send_modify(|n| *n += 1);
            }
            12 => {
                let _ = out.send(PINGRESP.to_vec());
            }
            14 => break,
            _ => {}
        }
    }
}

async fn read_packet(reader: &mut OwnedReadHalf) -> std::io::Result<(u8, Vec<u8>)> {
    let header = reader.read_u8().await?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8().await?;
        len |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; len];
    reader.read_exact(&mut body).await?;
    Ok((header, body))
}

fn decode_publish(header: u8, body: &[u8]) -> Option<(String, Vec<u8>)> {
    let topic_len = usize::from(u16::from_be_bytes([*body.first()?, *body.get(1)?]));
    let topic = String::from_utf8(body.get(2..2 + topic_len)?.to_vec()).ok()?;
    // QoS 1 and 2 carry a packet id after the topic
    let start = if header & 0x06 == 0 { 2 + topic_len } else { 4 + topic_len };
    Some((topic, body.get(start..)?.to_vec()))
}

fn publish_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + topic.len() + payload.len());
    body.extend_from_slice(&u16::try_from(topic.len()).unwrap().to_be_bytes());
    body.extend_from_slice(topic.as_bytes());
    body.extend_from_slice(payload);

    let mut frame = vec![0x30];
    let mut len = body.len();
    loop {
        let mut byte = u8::try_from(len % 128).unwrap();
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        frame.push(byte);
        if len == 0 {
            break;
        }
    }
    frame.extend_from_slice(&body);
    frame
}
