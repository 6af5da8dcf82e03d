//! Ledger event log
//!
//! Notifications emitted by the fund manager and token sender:
//! - Realized transfers (one per settled payout)
//! - Value received
//! - Registry changes
//! - Failed transfers that a failure policy chose to skip or abort on
//!
//! Sinks decide where events go. The core never emits events itself; the
//! services that execute transfers do.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::{address::Address, Amount, Weight};

/// Ledger event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A category's share reached its destination
    FundTransferred { category: String, amount: Amount },
    /// Value was deposited into the service
    FundReceived { value: Amount },
    /// Category added or overwritten
    CategoryUpserted {
        category: String,
        destination: Address,
        weight: Weight,
    },
    /// Category removed
    CategoryRemoved { category: String },
    /// Token delivered to a recipient
    TokenDistributed {
        token: Address,
        to: Address,
        value: Amount,
    },
    /// Transfer attempt failed
    TransferFailed {
        destination: Address,
        amount: Amount,
        reason: String,
    },
}

impl LedgerEvent {
    /// Short event name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::FundTransferred { .. } => "FundTransferred",
            LedgerEvent::FundReceived { .. } => "FundReceived",
            LedgerEvent::CategoryUpserted { .. } => "CategoryUpserted",
            LedgerEvent::CategoryRemoved { .. } => "CategoryRemoved",
            LedgerEvent::TokenDistributed { .. } => "TokenDistributed",
            LedgerEvent::TransferFailed { .. } => "TransferFailed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LedgerEvent::TransferFailed { .. })
    }
}

/// Event with identity and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID (UUIDv7, time ordered)
    pub event_id: String,
    /// Timestamp (Unix millis)
    pub timestamp: i64,
    /// Emitting service name
    pub source: String,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

impl EventRecord {
    pub fn new(source: &str, event: LedgerEvent) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.to_string(),
            event,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Event sink
pub trait EventSink: Send + Sync {
    /// Write an event
    fn emit(&self, record: &EventRecord);

    /// Flush pending events
    fn flush(&self) {}
}

/// Sink that writes events to the tracing subscriber
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, record: &EventRecord) {
        let json = match record.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(
                    source = %record.source,
                    event_id = %record.event_id,
                    event = record.event.name(),
                    payload = ?record.event,
                    error = %err,
                    "Failed to serialize event"
                );
                return;
            }
        };

        if record.event.is_failure() {
            warn!(
                source = %record.source,
                event_id = %record.event_id,
                event = record.event.name(),
                "{}",
                json
            );
        } else {
            info!(
                source = %record.source,
                event_id = %record.event_id,
                event = record.event.name(),
                "{}",
                json
            );
        }
    }
}

/// Sink that keeps every event in memory
#[derive(Default, Clone)]
pub struct MemoryEventSink {
    records: Arc<RwLock<Vec<EventRecord>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.records.read().iter().map(|r| r.event.clone()).collect()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, record: &EventRecord) {
        self.records.write().push(record.clone());
    }

    fn flush(&self) {
        debug!(count = self.len(), "Memory event sink holds events");
    }
}

/// Fan-out to several sinks
pub struct EventLog {
    source: String,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventLog {
    /// Create a log that writes to the tracing subscriber
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            sinks: vec![Arc::new(TracingEventSink)],
        }
    }

    /// Create a log with no sinks
    pub fn silent(source: &str) -> Self {
        Self {
            source: source.to_string(),
            sinks: Vec::new(),
        }
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rename the emitting service, keeping the sinks
    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    /// Stamp and write an event to all sinks
    pub fn emit(&self, event: LedgerEvent) {
        let record = EventRecord::new(&self.source, event);
        for sink in &self.sinks {
            sink.emit(&record);
        }
    }

    /// Flush all sinks
    pub fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}
