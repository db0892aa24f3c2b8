//! Per-frame summary aggregation.
//!
//! Builds the label -> probability mapping handed to the reporting
//! collaborator once per frame. Entries are recorded in filter order; later
//! detections sharing a label overwrite earlier ones (last-write-wins, no
//! averaging). An empty summary is valid and still published.

use std::collections::HashMap;

use anyhow::Result;

/// Accumulates one frame's label -> probability entries.
#[derive(Debug, Default)]
pub struct SummaryAggregator {
    entries: HashMap<String, f32>,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one kept detection. A repeated label overwrites the previous
    /// probability.
    pub fn record(&mut self, label: &str, probability: f32) {
        self.entries.insert(label.to_string(), probability);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn probability(&self, label: &str) -> Option<f32> {
        self.entries.get(label).copied()
    }

    /// Serialize as the JSON object published to the summary topic.
    pub fn payload(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }
}

/// Best-effort error payload published before the process terminates on a
/// fatal pipeline error.
pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
