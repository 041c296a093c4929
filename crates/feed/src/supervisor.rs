// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection supervisor: the feed state machine.
//!
//! One supervisor owns the single transport instance and is the only
//! component that mutates connection state. External calls arrive as
//! commands on a channel; transport events and timers are arms of one
//! `tokio::select!` loop, so every transition is serialized and no two
//! envelopes are ever processed concurrently.

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use till_core::{kind, Envelope};

use crate::backoff::ReconnectPolicy;
use crate::config::FeedConfig;
use crate::dispatch::{InboundDispatcher, Listener, ListenerError, ListenerId};
use crate::error::{FeedError, FeedResult};
use crate::gate::PersistenceGate;
use crate::queue::OutboundQueue;
use crate::sinks::Collaborators;
use crate::state::{ConnectionState, SharedFeedState};
use crate::transport::Transport;

/// Far-enough deadline for disarmed timers; the branch guard keeps the
/// sleep unpolled.
const DISARMED: Duration = Duration::from_secs(24 * 60 * 60);

/// Message shown to the user once reconnection attempts are exhausted.
const EXHAUSTED_MESSAGE: &str = "event feed disconnected; reconnect manually or reload";

/// External calls delivered into the supervisor loop.
enum Command {
    Init {
        server_url: String,
        ack: oneshot::Sender<FeedResult<()>>,
    },
    Close,
    Send {
        kind: String,
        payload: Value,
    },
    AddListener {
        kind: String,
        listener: Listener,
        ack: oneshot::Sender<ListenerId>,
    },
    AddWildcard {
        listener: Listener,
        ack: oneshot::Sender<ListenerId>,
    },
    RemoveListener {
        kind: String,
        id: ListenerId,
    },
    RemoveWildcard {
        id: ListenerId,
    },
}

/// Cloneable handle for talking to a running supervisor.
#[derive(Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedFeedState>,
}

impl FeedHandle {
    /// Start connecting to `server_url`.
    ///
    /// Fails fast when no credential is available; the feed never connects
    /// anonymously. A failed connection attempt is not an error here; it
    /// schedules a retry.
    pub async fn init(&self, server_url: &str) -> FeedResult<()> {
        let (ack, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Init {
                server_url: server_url.to_string(),
                ack,
            })
            .map_err(|_| FeedError::SupervisorGone)?;
        ack_rx.await.map_err(|_| FeedError::SupervisorGone)?
    }

    /// Close the connection without scheduling a reconnect. Idempotent.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Send an envelope, queueing it when not connected. Never blocks and
    /// never fails the caller.
    pub fn send(&self, kind: impl Into<String>, payload: Value) {
        let _ = self.commands.send(Command::Send {
            kind: kind.into(),
            payload,
        });
    }

    /// Register a listener for an exact event kind.
    pub async fn add_listener<F>(&self, kind: &str, listener: F) -> FeedResult<ListenerId>
    where
        F: Fn(&Envelope) -> Result<(), ListenerError> + Send + 'static,
    {
        let (ack, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::AddListener {
                kind: kind.to_string(),
                listener: Box::new(listener),
                ack,
            })
            .map_err(|_| FeedError::SupervisorGone)?;
        ack_rx.await.map_err(|_| FeedError::SupervisorGone)
    }

    /// Register a listener receiving every dispatched envelope.
    pub async fn add_wildcard_listener<F>(&self, listener: F) -> FeedResult<ListenerId>
    where
        F: Fn(&Envelope) -> Result<(), ListenerError> + Send + 'static,
    {
        let (ack, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::AddWildcard {
                listener: Box::new(listener),
                ack,
            })
            .map_err(|_| FeedError::SupervisorGone)?;
        ack_rx.await.map_err(|_| FeedError::SupervisorGone)
    }

    /// Remove a per-kind listener.
    pub fn remove_listener(&self, kind: &str, id: ListenerId) {
        let _ = self.commands.send(Command::RemoveListener {
            kind: kind.to_string(),
            id,
        });
    }

    /// Remove a wildcard listener.
    pub fn remove_wildcard_listener(&self, id: ListenerId) {
        let _ = self.commands.send(Command::RemoveWildcard { id });
    }

    /// Lock-free snapshot of the feed state.
    pub fn shared(&self) -> &SharedFeedState {
        &self.shared
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Current outbound queue depth.
    pub fn queued(&self) -> usize {
        self.shared.queued()
    }

    /// Highest server-assigned envelope id seen so far.
    pub fn last_message_id(&self) -> u64 {
        self.shared.last_message_id()
    }
}

/// The feed state machine. Owns the transport, the outbound queue, the
/// listener registry, and the persistence gate.
pub struct Supervisor<T: Transport> {
    config: FeedConfig,
    policy: ReconnectPolicy,
    transport: T,
    collab: Collaborators,
    gate: PersistenceGate,
    dispatcher: InboundDispatcher,
    queue: OutboundQueue,
    shared: Arc<SharedFeedState>,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Target set by the last `init`; retries reuse it.
    server_url: Option<String>,
    /// Consecutive failed connection attempts.
    attempt: u32,
    /// True after `close()` until the resulting close event is consumed.
    manual_close: bool,
    /// Whether exhaustion has already been reported for this cycle.
    exhausted_reported: bool,
    /// Pending retry deadline, at most one.
    reconnect_at: Option<Instant>,
    /// Next heartbeat probe deadline, armed while connected.
    heartbeat_at: Option<Instant>,
}

impl<T: Transport> Supervisor<T> {
    /// Create a supervisor and its handle.
    ///
    /// The supervisor does nothing until [`Supervisor::run`] is spawned.
    pub fn new(config: FeedConfig, transport: T, collab: Collaborators) -> (Self, FeedHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedFeedState::new());
        let policy = ReconnectPolicy::new(
            config.reconnect_base_ms,
            config.reconnect_cap_ms,
            config.reconnect_max_attempts,
        );
        let gate = PersistenceGate::new(Arc::clone(&collab.mutations), Arc::clone(&collab.messages));

        let supervisor = Supervisor {
            config,
            policy,
            transport,
            collab,
            gate,
            dispatcher: InboundDispatcher::new(),
            queue: OutboundQueue::new(),
            shared: Arc::clone(&shared),
            commands: command_rx,
            server_url: None,
            attempt: 0,
            manual_close: false,
            exhausted_reported: false,
            reconnect_at: None,
            heartbeat_at: None,
        };
        let handle = FeedHandle {
            commands: command_tx,
            shared,
        };

        (supervisor, handle)
    }

    /// Run the control loop until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            let connected = self.shared.state() == ConnectionState::Connected;
            let reconnect_armed = self.reconnect_at.is_some();
            let heartbeat_armed = connected && self.heartbeat_at.is_some();
            let reconnect_deadline = self
                .reconnect_at
                .unwrap_or_else(|| Instant::now() + DISARMED);
            let heartbeat_deadline = self
                .heartbeat_at
                .unwrap_or_else(|| Instant::now() + DISARMED);

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            // Every handle dropped; tear down and stop.
                            self.shutdown().await;
                            return;
                        }
                    }
                }

                result = self.transport.recv(), if connected => {
                    match result {
                        Ok(Some(frame)) => self.handle_frame(&frame).await,
                        Ok(None) | Err(_) => self.handle_connection_lost().await,
                    }
                }

                _ = tokio::time::sleep_until(reconnect_deadline), if reconnect_armed => {
                    self.reconnect_at = None;
                    self.attempt = self.attempt.saturating_add(1);
                    self.shared.set_attempt(self.attempt);
                    self.try_connect().await;
                }

                _ = tokio::time::sleep_until(heartbeat_deadline), if heartbeat_armed => {
                    self.heartbeat_tick().await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Init { server_url, ack } => match self.prepare_init(&server_url).await {
                Ok(()) => {
                    // Ack before the attempt: a failed connect schedules a
                    // retry, it is not an init error.
                    let _ = ack.send(Ok(()));
                    self.try_connect().await;
                }
                Err(e) => {
                    let _ = ack.send(Err(e));
                }
            },
            Command::Close => self.handle_close().await,
            Command::Send { kind, payload } => self.handle_send(kind, payload).await,
            Command::AddListener {
                kind,
                listener,
                ack,
            } => {
                let _ = ack.send(self.dispatcher.add_listener(&kind, listener));
            }
            Command::AddWildcard { listener, ack } => {
                let _ = ack.send(self.dispatcher.add_wildcard_listener(listener));
            }
            Command::RemoveListener { kind, id } => {
                self.dispatcher.remove_listener(&kind, id);
            }
            Command::RemoveWildcard { id } => {
                self.dispatcher.remove_wildcard_listener(id);
            }
        }
    }

    /// Reset for a fresh connection cycle toward `server_url`.
    ///
    /// Runs in one serialized turn: the pending retry is cancelled before
    /// the transport is touched, so two connections can never race.
    async fn prepare_init(&mut self, server_url: &str) -> FeedResult<()> {
        self.reconnect_at = None;
        self.heartbeat_at = None;

        if self.transport.is_connected() {
            tracing::debug!("tearing down existing connection before init");
            let _ = self.transport.disconnect().await;
        }

        if self.collab.credentials.credential().is_none() {
            return Err(FeedError::MissingCredential);
        }

        self.server_url = Some(server_url.to_string());
        self.manual_close = false;
        self.exhausted_reported = false;
        self.attempt = 0;
        self.shared.set_attempt(0);
        Ok(())
    }

    /// One connection attempt. Failures schedule a retry; they are never
    /// surfaced to the caller directly.
    async fn try_connect(&mut self) {
        let Some(server_url) = self.server_url.clone() else {
            return;
        };

        // Each attempt re-fetches the credential; one that vanished
        // mid-retry counts as a failed attempt.
        let Some(credential) = self.collab.credentials.credential() else {
            tracing::warn!("credential no longer available, counting attempt as failed");
            self.shared.set_state(ConnectionState::Disconnected);
            self.schedule_retry();
            return;
        };

        self.shared.set_state(ConnectionState::Connecting);
        let url = connection_url(&server_url, &self.collab.credentials.identity(), &credential);

        match self.transport.connect(&url).await {
            Ok(()) => self.handle_open().await,
            Err(e) => {
                tracing::warn!("connect attempt {} failed: {}", self.attempt, e);
                self.shared.set_state(ConnectionState::Disconnected);
                self.schedule_retry();
            }
        }
    }

    /// The transport reports an open channel.
    async fn handle_open(&mut self) {
        tracing::info!("feed connected");
        self.shared.set_state(ConnectionState::Connected);
        self.attempt = 0;
        self.shared.set_attempt(0);
        self.manual_close = false;
        self.exhausted_reported = false;
        self.flush_queue().await;
        self.arm_heartbeat();
    }

    /// Close/error reported by the transport.
    async fn handle_connection_lost(&mut self) {
        self.heartbeat_at = None;
        self.shared.set_state(ConnectionState::Disconnected);

        if self.manual_close {
            // Voluntary close; consume the flag and stay down.
            self.manual_close = false;
            return;
        }

        tracing::warn!("feed connection lost");
        self.schedule_retry();
    }

    /// Schedule exactly one retry timer, or report exhaustion.
    fn schedule_retry(&mut self) {
        if self.policy.is_exhausted(self.attempt) {
            self.reconnect_at = None;
            if !self.exhausted_reported {
                self.exhausted_reported = true;
                tracing::error!(
                    "giving up after {} failed connection attempts",
                    self.attempt
                );
                self.collab.notifier.notify_fatal(EXHAUSTED_MESSAGE);
            }
            return;
        }

        let delay = self.policy.delay(self.attempt);
        tracing::info!(
            "scheduling reconnect attempt {} in {}ms",
            self.attempt + 1,
            delay.as_millis()
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    /// Manual close. The manual-close flag is flipped before the socket is
    /// torn down so the resulting close event reads as voluntary.
    async fn handle_close(&mut self) {
        if self.shared.state() == ConnectionState::Disconnected
            && !self.transport.is_connected()
            && self.reconnect_at.is_none()
        {
            // Already closed; a second close is a no-op.
            return;
        }

        self.shared.set_state(ConnectionState::Closing);
        self.manual_close = true;
        self.heartbeat_at = None;
        self.reconnect_at = None;

        if let Err(e) = self.transport.disconnect().await {
            tracing::debug!("disconnect during close failed: {}", e);
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Outbound send. Queues when not connected or when the wire rejects
    /// the frame; the caller is never blocked or failed.
    async fn handle_send(&mut self, kind: String, payload: Value) {
        let envelope = Envelope::new(kind, payload);

        if self.shared.state() == ConnectionState::Connected {
            if let Err(e) = self.send_envelope(&envelope).await {
                tracing::warn!("send of {} failed, queueing: {}", envelope.kind, e);
                self.queue.enqueue(envelope);
            }
        } else {
            tracing::debug!("not connected, queueing {} envelope", envelope.kind);
            self.queue.enqueue(envelope);
        }

        self.shared.set_queued(self.queue.len());
    }

    async fn send_envelope(&mut self, envelope: &Envelope) -> FeedResult<()> {
        let frame = envelope.to_json()?;
        self.transport.send(frame).await?;
        Ok(())
    }

    /// Drain the outbound queue in insertion order.
    ///
    /// A failed envelope goes back to the tail and ends the drain; the
    /// rest stay queued, in order, for the next successful connection.
    async fn flush_queue(&mut self) {
        let depth = self.queue.len();
        if depth > 0 {
            tracing::info!("flushing {} queued envelopes", depth);
        }

        while let Some(envelope) = self.queue.pop() {
            if let Err(e) = self.send_envelope(&envelope).await {
                tracing::warn!("queued send of {} failed, requeueing: {}", envelope.kind, e);
                self.queue.enqueue(envelope);
                break;
            }
        }

        self.shared.set_queued(self.queue.len());
    }

    fn arm_heartbeat(&mut self) {
        // Interval 0 disables the heartbeat.
        if self.config.heartbeat_interval_ms > 0 {
            self.heartbeat_at =
                Some(Instant::now() + Duration::from_millis(self.config.heartbeat_interval_ms));
        } else {
            self.heartbeat_at = None;
        }
    }

    /// Liveness probe. Not RTT-based: a dead link shows up either as a
    /// failed probe send or as a transport that no longer reports open.
    async fn heartbeat_tick(&mut self) {
        if self.manual_close {
            self.heartbeat_at = None;
            return;
        }

        if !self.transport.is_connected() {
            tracing::warn!("heartbeat found the transport closed");
            self.handle_connection_lost().await;
            return;
        }

        let probe = Envelope::ping();
        match self.send_envelope(&probe).await {
            Ok(()) => {
                tracing::debug!("heartbeat probe sent");
                self.arm_heartbeat();
            }
            Err(e) => {
                tracing::warn!("heartbeat probe failed: {}", e);
                self.handle_connection_lost().await;
            }
        }
    }

    /// Decode and route one inbound frame.
    async fn handle_frame(&mut self, frame: &str) {
        // Some server builds reply to probes with a bare sentinel instead
        // of an envelope.
        if kind::is_heartbeat_reply(frame.trim()) {
            tracing::debug!("heartbeat reply received");
            return;
        }

        let mut envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("dropping undecodable frame: {}", e);
                return;
            }
        };

        if envelope.is_heartbeat_reply() {
            tracing::debug!("heartbeat reply received");
            return;
        }

        if envelope.is_heartbeat_probe() {
            // Server-initiated probe; answer and stop routing.
            let reply = Envelope::pong();
            if let Err(e) = self.send_envelope(&reply).await {
                tracing::debug!("heartbeat reply send failed: {}", e);
            }
            return;
        }

        if let Some(id) = envelope.id {
            self.shared.record_message_id(id);
        }

        self.gate.process(&mut envelope).await;
        self.dispatcher.dispatch(&envelope);
    }

    /// Final teardown once every handle is gone.
    async fn shutdown(&mut self) {
        self.manual_close = true;
        self.heartbeat_at = None;
        self.reconnect_at = None;
        if self.transport.is_connected() {
            let _ = self.transport.disconnect().await;
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }
}

/// Build `{server_url}/{identity}/{percent-encoded credential}`.
fn connection_url(server_url: &str, identity: &str, credential: &str) -> String {
    let encoded = utf8_percent_encode(credential, NON_ALPHANUMERIC);
    format!(
        "{}/{}/{}",
        server_url.trim_end_matches('/'),
        identity,
        encoded
    )
}
