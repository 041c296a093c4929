// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Host-bridged transport binding.
//!
//! In the embedded build the duplex channel is owned by the host shell;
//! the feed exchanges bridge messages with it over an in-process channel
//! pair instead of opening a socket itself. Same capability set as
//! [`crate::transport::WebSocketTransport`]; only channel ownership
//! differs.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::transport::{Transport, TransportError, TransportResult};

/// Requests from the feed to the host shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    /// Open the duplex channel to `url`.
    Open {
        /// Fully-built connection URL.
        url: String,
    },
    /// Send a text frame.
    Send {
        /// Frame contents.
        frame: String,
    },
    /// Close the channel.
    Close,
}

/// Events from the host shell back to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The channel is open.
    Opened,
    /// The open attempt failed.
    OpenFailed {
        /// Host-reported reason.
        reason: String,
    },
    /// A text frame arrived.
    Frame {
        /// Frame contents.
        text: String,
    },
    /// The channel closed (remote close or host teardown).
    Closed,
}

/// Host-side endpoints of a bridge pair.
pub struct BridgeHost {
    /// Requests issued by the transport.
    pub requests: mpsc::UnboundedReceiver<BridgeRequest>,
    /// Events delivered to the transport.
    pub events: mpsc::UnboundedSender<BridgeEvent>,
}

/// Transport bound to a host-owned duplex channel.
pub struct BridgedTransport {
    requests: mpsc::UnboundedSender<BridgeRequest>,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    connected: bool,
}

/// Create a connected transport/host pair.
pub fn bridge_pair() -> (BridgedTransport, BridgeHost) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let transport = BridgedTransport {
        requests: request_tx,
        events: event_rx,
        connected: false,
    };
    let host = BridgeHost {
        requests: request_rx,
        events: event_tx,
    };

    (transport, host)
}

impl Transport for BridgedTransport {
    fn connect(
        &mut self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            self.connected = false;
            self.requests
                .send(BridgeRequest::Open { url })
                .map_err(|_| TransportError::ConnectionFailed("bridge host is gone".to_string()))?;

            // Drain events until the host answers this open request; frames
            // or close notices from a previous session are stale.
            loop {
                match self.events.recv().await {
                    Some(BridgeEvent::Opened) => {
                        self.connected = true;
                        return Ok(());
                    }
                    Some(BridgeEvent::OpenFailed { reason }) => {
                        return Err(TransportError::ConnectionFailed(reason));
                    }
                    Some(_) => continue,
                    None => {
                        return Err(TransportError::ConnectionFailed(
                            "bridge host is gone".to_string(),
                        ));
                    }
                }
            }
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.connected {
                self.connected = false;
                let _ = self.requests.send(BridgeRequest::Close);
            }
            Ok(())
        })
    }

    fn send(
        &mut self,
        frame: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            self.requests
                .send(BridgeRequest::Send { frame })
                .map_err(|_| {
                    self.connected = false;
                    TransportError::SendFailed("bridge host is gone".to_string())
                })?;
            Ok(())
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            loop {
                match self.events.recv().await {
                    Some(BridgeEvent::Frame { text }) => return Ok(Some(text)),
                    Some(BridgeEvent::Closed) => {
                        self.connected = false;
                        return Ok(None);
                    }
                    // Open answers are consumed by connect(); a stray one
                    // here is stale.
                    Some(BridgeEvent::Opened) | Some(BridgeEvent::OpenFailed { .. }) => continue,
                    None => {
                        self.connected = false;
                        return Ok(None);
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
