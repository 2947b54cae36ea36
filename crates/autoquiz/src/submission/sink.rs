use std::fmt::{self, Debug};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::http::TransportError;
use crate::survey::LeadRecord;

/// The downstream integrations a lead can be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Crm,
    Spreadsheet,
    Email,
}

impl SinkKind {
    pub const ALL: [SinkKind; 3] = [SinkKind::Crm, SinkKind::Spreadsheet, SinkKind::Email];

    pub const fn as_str(self) -> &'static str {
        match self {
            SinkKind::Crm => "crm",
            SinkKind::Spreadsheet => "spreadsheet",
            SinkKind::Email => "email",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SinkKind::Crm => "CRM",
            SinkKind::Spreadsheet => "Google Sheets",
            SinkKind::Email => "Email",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "crm" => Some(SinkKind::Crm),
            "spreadsheet" | "sheets" => Some(SinkKind::Spreadsheet),
            "email" | "smtp" => Some(SinkKind::Email),
            _ => None,
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sink reports back after accepting a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub detail: String,
}

impl SinkReceipt {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("rejected with status {status}")]
    Rejected { status: u16 },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("all endpoints failed: {0}")]
    Exhausted(String),
    #[error("lead could not be encoded: {0}")]
    Payload(String),
    #[error("{0}")]
    Backend(String),
    #[error("timed out after {0} ms")]
    Timeout(u128),
}

/// Result of one sink attempt, as recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub sink: SinkKind,
    pub ok: bool,
    pub critical: bool,
    pub detail: String,
}

/// Per-submission facts shared with every sink.
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    pub submitted_at: DateTime<Utc>,
    pub prior: Vec<SinkOutcome>,
}

impl DeliveryContext {
    pub fn new(submitted_at: DateTime<Utc>) -> Self {
        Self {
            submitted_at,
            prior: Vec::new(),
        }
    }

    /// Whether an earlier sink in this submission accepted the lead.
    pub fn status_of(&self, kind: SinkKind) -> Option<bool> {
        self.prior
            .iter()
            .find(|outcome| outcome.sink == kind)
            .map(|outcome| outcome.ok)
    }
}

/// A downstream integration that accepts a completed lead.
///
/// Implementations shape their own payload and must not panic; every failure is
/// reported through [`SinkError`] so the orchestrator can move on to the next sink.
pub trait LeadSink: Send + Sync + Debug {
    fn kind(&self) -> SinkKind;
    fn send(&self, lead: &LeadRecord, context: &DeliveryContext) -> Result<SinkReceipt, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases_case_insensitively() {
        assert_eq!(SinkKind::parse(" CRM "), Some(SinkKind::Crm));
        assert_eq!(SinkKind::parse("sheets"), Some(SinkKind::Spreadsheet));
        assert_eq!(SinkKind::parse("smtp"), Some(SinkKind::Email));
        assert_eq!(SinkKind::parse("fax"), None);
    }

    #[test]
    fn context_reports_prior_outcomes() {
        let mut context = DeliveryContext::new(Utc::now());
        assert_eq!(context.status_of(SinkKind::Crm), None);
        context.prior.push(SinkOutcome {
            sink: SinkKind::Crm,
            ok: false,
            critical: true,
            detail: "rejected with status 502".to_string(),
        });
        assert_eq!(context.status_of(SinkKind::Crm), Some(false));
    }
}
