//! Operation event log with bounded retention and export

use crate::feed::models::ScanMode;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default number of retained entries
const DEFAULT_CAPACITY: usize = 500;

/// Events describing scanner and flow activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OperationEvent {
    ScanStarted { mode: ScanMode },
    ScanCompleted { item_count: usize },
    NodeSkipped { reason: String },
    RemovalFailed { error: String },
    SweepCompleted { removed: u64 },
    UpscaleRequested { item_id: String, accepted: bool },
    OperationCancelled { operation: String },
    FlowFailed { operation: String, error: String },
}

impl OperationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OperationEvent::ScanStarted { .. } => "scan_started",
            OperationEvent::ScanCompleted { .. } => "scan_completed",
            OperationEvent::NodeSkipped { .. } => "node_skipped",
            OperationEvent::RemovalFailed { .. } => "removal_failed",
            OperationEvent::SweepCompleted { .. } => "sweep_completed",
            OperationEvent::UpscaleRequested { .. } => "upscale_requested",
            OperationEvent::OperationCancelled { .. } => "operation_cancelled",
            OperationEvent::FlowFailed { .. } => "flow_failed",
        }
    }

    fn detail(&self) -> String {
        match self {
            OperationEvent::ScanStarted { mode } => format!("{:?}", mode),
            OperationEvent::ScanCompleted { item_count } => format!("{} items", item_count),
            OperationEvent::NodeSkipped { reason } => reason.clone(),
            OperationEvent::RemovalFailed { error } => error.clone(),
            OperationEvent::SweepCompleted { removed } => format!("{} removed", removed),
            OperationEvent::UpscaleRequested { item_id, accepted } => {
                format!("{} accepted={}", item_id, accepted)
            }
            OperationEvent::OperationCancelled { operation } => operation.clone(),
            OperationEvent::FlowFailed { operation, error } => {
                format!("{}: {}", operation, error)
            }
        }
    }
}

/// Timestamped log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: OperationEvent,
}

/// Bounded in-memory event ring shared between scanner and flows.
///
/// Oldest entries are dropped once the capacity is reached; every
/// recorded event is also echoed to tracing.
#[derive(Debug, Clone)]
pub struct OperationLog {
    entries: Arc<Mutex<VecDeque<LoggedEvent>>>,
    capacity: usize,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity,
        }
    }

    pub fn record(&self, event: OperationEvent) {
        tracing::debug!(event = event.kind(), "{}", event.detail());
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push_back(LoggedEvent {
            timestamp: Utc::now(),
            event,
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        match self.entries.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Export retained entries as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Export retained entries as CSV (`Timestamp,Event,Detail`).
    pub fn export_csv(&self) -> String {
        let mut lines = vec!["Timestamp,Event,Detail".to_string()];
        for entry in self.snapshot() {
            lines.push(format!(
                "\"{}\",\"{}\",{}",
                entry.timestamp.to_rfc3339(),
                entry.event.kind(),
                crate::utils::organizer::csv_escape(&entry.event.detail()),
            ));
        }
        lines.join("\n")
    }
}
