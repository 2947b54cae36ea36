use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::sink::{DeliveryContext, LeadSink, SinkError, SinkKind, SinkReceipt};
use crate::config::CrmConfig;
use crate::http::{HttpTransport, OutboundRequest, RequestBody};
use crate::survey::LeadRecord;

const WEBSITE_SOURCE: &str = "website";
const DIRECT_SOURCE: &str = "Auto Quiz Website";
const LEAD_TYPE: &str = "Auto Financing Survey";

/// Survey answers keyed by the CRM form's field names.
pub fn survey_responses(lead: &LeadRecord) -> Vec<(&'static str, String)> {
    let personal = &lead.personal_info;
    let vehicle = &lead.vehicle_info;
    vec![
        ("what_type_of_vehicle_are_you_looking_for", vehicle.vehicle_type.clone()),
        ("what_is_you_budget", vehicle.budget.clone()),
        ("radio_3dxv", vehicle.trade_in.clone()),
        ("what_is_your_estimated_credit_rating", vehicle.credit_score.clone()),
        ("what_is_your_employment_status", vehicle.employment.clone()),
        ("what_is_your_monthly_income", vehicle.income.clone()),
        (
            "how_long_have_you_been_employed_at_your_current_job",
            vehicle.employment_length.clone(),
        ),
        ("companys_name", personal.company_name.clone()),
        ("job_title", personal.job_title.clone()),
        ("address", personal.street_address.clone()),
        ("City_country", personal.city.clone()),
        ("province", personal.province.clone()),
        ("postal_code", personal.postal_code.clone()),
        ("date_of_birth", personal.date_of_birth.clone()),
        ("full_name", personal.full_name.clone()),
        ("phone", personal.phone.clone()),
        ("email_0", personal.email.clone()),
    ]
}

fn contact_block(lead: &LeadRecord) -> Value {
    let personal = &lead.personal_info;
    let (first_name, last_name) = personal.split_name();
    json!({
        "firstName": first_name,
        "lastName": last_name,
        "email": personal.email,
        "phone": personal.phone,
        "address1": personal.street_address,
        "city": personal.city,
        "state": personal.province,
        "postalCode": personal.postal_code,
        "country": "CA",
    })
}

/// Delivers leads to the CRM's survey widget, falling back through
/// alternate encodings and endpoints before giving up.
#[derive(Debug, Clone)]
pub struct CrmSink {
    transport: Arc<dyn HttpTransport>,
    config: CrmConfig,
    site_url: String,
}

impl CrmSink {
    pub fn new(transport: Arc<dyn HttpTransport>, config: CrmConfig, site_url: impl Into<String>) -> Self {
        Self {
            transport,
            config,
            site_url: site_url.into(),
        }
    }

    /// Ordered delivery attempts for this lead: JSON to the survey endpoint,
    /// form-encoded to the form endpoint, then form-encoded to the direct URL.
    pub fn attempts(&self, lead: &LeadRecord, context: &DeliveryContext) -> Vec<OutboundRequest> {
        let responses = survey_responses(lead);
        let submitted_at = context
            .submitted_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut attempts = Vec::new();

        if let (Some(url), Some(survey_id)) =
            (self.config.survey_submit_url(), self.config.survey_id.as_deref())
        {
            let answers: Map<String, Value> = responses
                .iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
                .collect();
            let payload = json!({
                "surveyId": survey_id,
                "source": WEBSITE_SOURCE,
                "submittedAt": submitted_at,
                "responses": answers,
                "contact": contact_block(lead),
            });
            attempts.push(self.request(url, RequestBody::Json(payload)));

            let mut fields = form_fields(&responses);
            fields.push(("surveyId".to_string(), survey_id.to_string()));
            fields.push(("source".to_string(), WEBSITE_SOURCE.to_string()));
            attempts.push(self.request(self.config.form_submit_url(), RequestBody::Form(fields)));
        }

        if let Some(direct) = self.config.direct_url.as_deref() {
            let mut fields = form_fields(&responses);
            fields.push(("source".to_string(), DIRECT_SOURCE.to_string()));
            fields.push(("lead_type".to_string(), LEAD_TYPE.to_string()));
            fields.push(("submission_time".to_string(), submitted_at));
            attempts.push(self.request(direct.to_string(), RequestBody::Form(fields)));
        }

        attempts
    }

    fn request(&self, url: String, body: RequestBody) -> OutboundRequest {
        let accept = match body {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "*/*",
        };
        let mut headers = vec![
            ("Accept".to_string(), accept.to_string()),
            ("Origin".to_string(), self.site_url.clone()),
            ("Referer".to_string(), self.site_url.clone()),
        ];
        if let Some(key) = &self.config.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }
        OutboundRequest { url, headers, body }
    }
}

fn form_fields(responses: &[(&'static str, String)]) -> Vec<(String, String)> {
    responses
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

impl LeadSink for CrmSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Crm
    }

    fn send(&self, lead: &LeadRecord, context: &DeliveryContext) -> Result<SinkReceipt, SinkError> {
        let attempts = self.attempts(lead, context);
        if attempts.is_empty() {
            return Err(SinkError::Backend("no CRM endpoint configured".to_string()));
        }

        let total = attempts.len();
        let mut last_error = None;
        for (index, request) in attempts.iter().enumerate() {
            match self.transport.post(request) {
                Ok(reply) if reply.is_success() => {
                    info!(attempt = index + 1, status = reply.status, "CRM accepted lead");
                    return Ok(SinkReceipt::new(format!(
                        "accepted by attempt {} of {total} (status {})",
                        index + 1,
                        reply.status
                    )));
                }
                Ok(reply) => {
                    warn!(attempt = index + 1, status = reply.status, "CRM attempt rejected");
                    last_error = Some(SinkError::Rejected {
                        status: reply.status,
                    });
                }
                Err(err) => {
                    warn!(attempt = index + 1, error = %err, "CRM attempt failed");
                    last_error = Some(SinkError::Transport(err));
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        Err(SinkError::Exhausted(format!("{total} attempts, last: {reason}")))
    }
}
