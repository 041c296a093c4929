// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for feed tests: recording collaborator fakes.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use till_core::MessageRecord;

use crate::config::FeedConfig;
use crate::sinks::{
    Collaborators, CredentialProvider, FatalNotifier, MessageStore, MutationSink, SinkFuture,
};

/// Credential provider with a settable token.
pub struct TestCredentials {
    token: Mutex<Option<String>>,
    identity: String,
}

impl CredentialProvider for TestCredentials {
    fn credential(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}

/// Mutation sink recording calls into a shared event log.
pub struct RecordingSink {
    log: Arc<Mutex<Vec<String>>>,
    fail: AtomicBool,
}

impl MutationSink for RecordingSink {
    fn apply_order(&self, payload: Value) -> SinkFuture<'_> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("apply_order:{}", payload["order"]["nickName"]));
            if self.fail.load(Ordering::SeqCst) {
                return Err("order mutation refused".into());
            }
            Ok(())
        })
    }

    fn apply_user(&self, payload: Value) -> SinkFuture<'_> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("apply_user:{}", payload["nickName"]));
            if self.fail.load(Ordering::SeqCst) {
                return Err("user mutation refused".into());
            }
            Ok(())
        })
    }
}

/// Message store recording persisted records and the shared event log.
pub struct RecordingStore {
    log: Arc<Mutex<Vec<String>>>,
    records: Arc<Mutex<Vec<MessageRecord>>>,
    fail: AtomicBool,
}

impl MessageStore for RecordingStore {
    fn persist(&self, record: MessageRecord) -> SinkFuture<'_> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("persist:{}", record.message_type));
            if self.fail.load(Ordering::SeqCst) {
                return Err("store unavailable".into());
            }
            self.records.lock().unwrap().push(record);
            Ok(())
        })
    }
}

/// Notifier recording fatal messages.
pub struct RecordingNotifier {
    fatals: Arc<Mutex<Vec<String>>>,
}

impl FatalNotifier for RecordingNotifier {
    fn notify_fatal(&self, message: &str) {
        self.fatals.lock().unwrap().push(message.to_string());
    }
}

/// Test-side view of what the collaborators saw.
pub struct Probe {
    credentials: Arc<TestCredentials>,
    sink: Arc<RecordingSink>,
    store: Arc<RecordingStore>,
    /// Interleaved collaborator call log, in call order.
    pub log: Arc<Mutex<Vec<String>>>,
    /// Records accepted by the message store.
    pub records: Arc<Mutex<Vec<MessageRecord>>>,
    /// Fatal notifications, in order.
    pub fatals: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn set_credential(&self, token: Option<&str>) {
        *self.credentials.token.lock().unwrap() = token.map(str::to_string);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.sink.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_store(&self, fail: bool) {
        self.store.fail.store(fail, Ordering::SeqCst);
    }

    pub fn log_entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn record_entries(&self) -> Vec<MessageRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn fatal_entries(&self) -> Vec<String> {
        self.fatals.lock().unwrap().clone()
    }
}

/// Build a collaborator set whose calls are observable through the probe.
pub fn collaborators(identity: &str, token: Option<&str>) -> (Collaborators, Probe) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let records = Arc::new(Mutex::new(Vec::new()));
    let fatals = Arc::new(Mutex::new(Vec::new()));

    let credentials = Arc::new(TestCredentials {
        token: Mutex::new(token.map(str::to_string)),
        identity: identity.to_string(),
    });
    let sink = Arc::new(RecordingSink {
        log: Arc::clone(&log),
        fail: AtomicBool::new(false),
    });
    let store = Arc::new(RecordingStore {
        log: Arc::clone(&log),
        records: Arc::clone(&records),
        fail: AtomicBool::new(false),
    });
    let notifier = Arc::new(RecordingNotifier {
        fatals: Arc::clone(&fatals),
    });

    let collab = Collaborators {
        credentials: Arc::clone(&credentials) as Arc<dyn CredentialProvider>,
        mutations: Arc::clone(&sink) as Arc<dyn MutationSink>,
        messages: Arc::clone(&store) as Arc<dyn MessageStore>,
        notifier,
    };
    let probe = Probe {
        credentials,
        sink,
        store,
        log,
        records,
        fatals,
    };

    (collab, probe)
}

/// Feed config for tests: fast defaults, heartbeat disabled.
pub fn test_config() -> FeedConfig {
    FeedConfig {
        server_url: "ws://127.0.0.1:50000/ws".to_string(),
        heartbeat_interval_ms: 0,
        ..FeedConfig::default()
    }
}
