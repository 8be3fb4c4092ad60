//! Audit sinks for guardrail events

use carehero_domain::{GuardrailEvent, Severity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Receives every guardrail event
pub trait AuditSink: Send + Sync {
    /// Record one event
    fn record(&self, event: &GuardrailEvent);
}

/// Emits events as structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &GuardrailEvent) {
        let session_id = event.session_id.as_deref().unwrap_or("-");
        if event.blocked {
            warn!(
                target: "carehero::guardrail",
                event_type = %event.event_type,
                severity = %event.severity,
                session_id,
                excerpt = %event.input_excerpt,
                "Guardrail blocked text"
            );
        } else {
            info!(
                target: "carehero::guardrail",
                event_type = %event.event_type,
                session_id,
                "Guardrail passed text"
            );
        }
    }
}

/// Aggregate counts over recorded events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardrailStats {
    /// All events
    pub total: usize,
    /// Blocked events
    pub blocked: usize,
    /// Counts per severity
    pub by_severity: HashMap<Severity, usize>,
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<GuardrailEvent>>,
}

impl InMemoryAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events, oldest first
    pub fn events(&self) -> Vec<GuardrailEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events for one session
    pub fn events_for(&self, session_id: &str) -> Vec<GuardrailEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .collect()
    }

    /// Aggregate counts
    pub fn stats(&self) -> GuardrailStats {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = GuardrailStats {
            total: events.len(),
            ..Default::default()
        };
        for event in events.iter() {
            if event.blocked {
                stats.blocked += 1;
            }
            *stats.by_severity.entry(event.severity).or_insert(0) += 1;
        }
        stats
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &GuardrailEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards events to several sinks
#[derive(Default, Clone)]
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    /// Create an empty composite
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for CompositeAuditSink {
    fn record(&self, event: &GuardrailEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
