//! Metrics for discovery runs

use carehero_domain::{InstitutionAppointmentResult, ResultStatus, SlotSource};
use std::collections::HashMap;

/// Counters collected over one discovery run
#[derive(Debug, Clone, Default)]
pub struct DiscoveryMetrics {
    /// Institutions finished, by status
    pub by_status: HashMap<ResultStatus, usize>,

    /// Slots kept, by the stage that produced them
    pub by_source: HashMap<SlotSource, usize>,

    /// Batches completed
    pub batches: usize,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl DiscoveryMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one institution's outcome
    pub fn record_result(&mut self, result: &InstitutionAppointmentResult) {
        *self.by_status.entry(result.status).or_insert(0) += 1;
        for slot in &result.slots {
            *self.by_source.entry(slot.source).or_insert(0) += 1;
        }
    }

    /// Record a batch completion
    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    /// Institutions processed
    pub fn total_institutions(&self) -> usize {
        self.by_status.values().sum()
    }

    /// Institutions with the given status
    pub fn count(&self, status: ResultStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Slots kept across all institutions
    pub fn total_slots(&self) -> usize {
        self.by_source.values().sum()
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Discovery Metrics Summary".to_string(),
            "=========================".to_string(),
            format!("Institutions: {}", self.total_institutions()),
            format!("Batches: {}", self.batches),
            format!("Elapsed: {}ms", self.elapsed_ms),
            String::new(),
            "By status:".to_string(),
        ];
        for status in [ResultStatus::Success, ResultStatus::NoSlotsFound, ResultStatus::Error] {
            lines.push(format!("  {:?}: {}", status, self.count(status)));
        }

        if !self.by_source.is_empty() {
            lines.push(String::new());
            lines.push("Slots by source:".to_string());
            let mut sources: Vec<_> = self.by_source.iter().collect();
            sources.sort_by_key(|(source, _)| source.as_str());
            for (source, count) in sources {
                lines.push(format!("  {}: {}", source, count));
            }
            lines.push(format!("  Total: {}", self.total_slots()));
        }

        lines.join("\n")
    }
}
