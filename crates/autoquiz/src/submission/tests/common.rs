use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::submission::sink::{DeliveryContext, LeadSink, SinkError, SinkKind, SinkReceipt};
use crate::survey::LeadRecord;

pub(super) fn complete_lead() -> LeadRecord {
    let mut lead = LeadRecord::default();
    let personal = &mut lead.personal_info;
    personal.full_name = "Jane Doe".to_string();
    personal.email = "jane@example.com".to_string();
    personal.phone = "5195551234".to_string();
    personal.street_address = "1 Main St".to_string();
    personal.city = "London".to_string();
    personal.province = "ON".to_string();
    personal.postal_code = "N6C 4X5".to_string();
    personal.date_of_birth = "1990-04-12".to_string();
    personal.company_name = "Acme".to_string();
    personal.job_title = "Clerk".to_string();

    let vehicle = &mut lead.vehicle_info;
    vehicle.vehicle_type = "SUV".to_string();
    vehicle.budget = "$400-499".to_string();
    vehicle.trade_in = "No".to_string();
    vehicle.credit_score = "Good (660-724)".to_string();
    vehicle.employment = "Employed".to_string();
    vehicle.employment_length = "2+ Years".to_string();
    vehicle.income = "$3501-$4500".to_string();
    lead
}

/// Sink double that accepts or fails on demand and records what it saw.
#[derive(Debug)]
pub(super) struct ScriptedSink {
    kind: SinkKind,
    fail: bool,
    pub(super) received: Mutex<Vec<(LeadRecord, Vec<(SinkKind, bool)>)>>,
}

impl ScriptedSink {
    pub(super) fn up(kind: SinkKind) -> Arc<Self> {
        Self::build(kind, false)
    }

    pub(super) fn down(kind: SinkKind) -> Arc<Self> {
        Self::build(kind, true)
    }

    fn build(kind: SinkKind, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail,
            received: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn calls(&self) -> usize {
        self.received.lock().expect("sink mutex poisoned").len()
    }
}

impl LeadSink for ScriptedSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn send(&self, lead: &LeadRecord, context: &DeliveryContext) -> Result<SinkReceipt, SinkError> {
        let prior = context
            .prior
            .iter()
            .map(|outcome| (outcome.sink, outcome.ok))
            .collect();
        self.received
            .lock()
            .expect("sink mutex poisoned")
            .push((lead.clone(), prior));
        if self.fail {
            Err(SinkError::Rejected { status: 503 })
        } else {
            Ok(SinkReceipt::new("stored"))
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
