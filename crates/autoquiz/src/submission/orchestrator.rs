use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::sink::{DeliveryContext, LeadSink, SinkKind, SinkOutcome};
use crate::config::DeliveryConfig;
use crate::survey::LeadRecord;

pub const PRIMARY_SUCCESS_MESSAGE: &str = "Survey submission processed successfully";
pub const BACKUP_SUCCESS_MESSAGE: &str = "Survey submission received (backup method used)";
pub const FAILURE_MESSAGE: &str = "Failed to process quiz submission";

/// Aggregate outcome of one delivery attempt across every registered sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    pub outcomes: Vec<SinkOutcome>,
}

impl SubmissionResult {
    /// Per-sink success flags keyed by sink name.
    pub fn integrations(&self) -> BTreeMap<&'static str, bool> {
        self.outcomes
            .iter()
            .map(|outcome| (outcome.sink.as_str(), outcome.ok))
            .collect()
    }

    /// Displayable reasons for every sink that did not accept the lead.
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.ok)
            .map(|outcome| format!("{}: {}", outcome.sink.label(), outcome.detail))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct RegisteredSink {
    sink: Arc<dyn LeadSink>,
    critical: bool,
}

/// Fans a completed lead out to the configured sinks, in order, tolerating partial failure.
///
/// Success means at least one critical sink accepted the lead. When no sink is
/// flagged critical, any accepting sink is enough.
#[derive(Debug, Clone, Default)]
pub struct SubmissionOrchestrator {
    sinks: Vec<RegisteredSink>,
}

impl SubmissionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn LeadSink>, critical: bool) -> Self {
        self.sinks.push(RegisteredSink { sink, critical });
        self
    }

    /// Arrange the available sinks by the configured order and criticality.
    /// Sinks whose kind is not listed in the order are left out.
    pub fn from_delivery(available: Vec<Arc<dyn LeadSink>>, delivery: &DeliveryConfig) -> Self {
        let mut orchestrator = Self::new();
        for kind in &delivery.order {
            if let Some(sink) = available.iter().find(|sink| sink.kind() == *kind) {
                orchestrator =
                    orchestrator.with_sink(Arc::clone(sink), delivery.critical.contains(kind));
            }
        }
        orchestrator
    }

    pub fn sink_kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|entry| entry.sink.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn submit(&self, lead: &LeadRecord) -> SubmissionResult {
        self.submit_at(lead, Utc::now())
    }

    /// Deliver the lead; the record is only read so a failed attempt can be retried as-is.
    pub fn submit_at(&self, lead: &LeadRecord, submitted_at: DateTime<Utc>) -> SubmissionResult {
        if self.sinks.is_empty() {
            error!("no delivery sinks registered; lead cannot be delivered");
            return SubmissionResult {
                success: false,
                message: FAILURE_MESSAGE.to_string(),
                outcomes: Vec::new(),
            };
        }

        info!(
            vehicle_type = %lead.vehicle_info.vehicle_type,
            sinks = self.sinks.len(),
            "delivering lead"
        );

        let mut context = DeliveryContext::new(submitted_at);
        for entry in &self.sinks {
            let kind = entry.sink.kind();
            let outcome = match entry.sink.send(lead, &context) {
                Ok(receipt) => {
                    info!(sink = %kind, detail = %receipt.detail, "sink accepted lead");
                    SinkOutcome {
                        sink: kind,
                        ok: true,
                        critical: entry.critical,
                        detail: receipt.detail,
                    }
                }
                Err(err) => {
                    warn!(sink = %kind, critical = entry.critical, error = %err, "sink failed");
                    SinkOutcome {
                        sink: kind,
                        ok: false,
                        critical: entry.critical,
                        detail: err.to_string(),
                    }
                }
            };
            context.prior.push(outcome);
        }

        let outcomes = context.prior;
        let any_critical = outcomes.iter().any(|outcome| outcome.critical);
        let counted = |outcome: &&SinkOutcome| !any_critical || outcome.critical;
        let success = outcomes.iter().filter(counted).any(|outcome| outcome.ok);
        let primary_ok = outcomes
            .iter()
            .find(counted)
            .map(|outcome| outcome.ok)
            .unwrap_or(false);

        let message = match (success, primary_ok) {
            (true, true) => PRIMARY_SUCCESS_MESSAGE,
            (true, false) => BACKUP_SUCCESS_MESSAGE,
            (false, _) => FAILURE_MESSAGE,
        };

        if success {
            info!(backup = !primary_ok, "lead delivered");
        } else {
            error!(attempted = outcomes.len(), "every critical sink failed");
        }

        SubmissionResult {
            success,
            message: message.to_string(),
            outcomes,
        }
    }
}
