use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::SecondsFormat;
use google_sheets4::api::{Scope, ValueRange};
use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use serde_json::Value;
use tokio::runtime::Handle;

use super::sink::{DeliveryContext, LeadSink, SinkError, SinkKind, SinkReceipt};
use crate::survey::LeadRecord;

#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("spreadsheet operation failed: {0}")]
    Backend(String),
    #[error("spreadsheet call timed out after {0:?}")]
    Timeout(Duration),
    #[error("spreadsheet credentials unavailable: {0}")]
    Credentials(String),
}

pub trait SpreadsheetGateway: Send + Sync + Debug {
    /// Append one row below the table found at `range`; returns the updated range.
    fn append_row(&self, range: &str, row: Vec<Value>) -> Result<String, SpreadsheetError>;
}

/// Blocking facade over the generated google-sheets4 client so the sink can stay synchronous.
///
/// Calls are driven on the handle of the runtime that built the client, so the
/// gateway must be used from a blocking context (e.g. `spawn_blocking`).
pub struct GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    spreadsheet_id: String,
    timeout: Duration,
    runtime: Handle,
}

impl<C> GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, spreadsheet_id: impl Into<String>, timeout: Duration, runtime: Handle) -> Self {
        Self {
            hub,
            spreadsheet_id: spreadsheet_id.into(),
            timeout,
            runtime,
        }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> SpreadsheetError {
        SpreadsheetError::Backend(err.to_string())
    }
}

impl<C> std::fmt::Debug for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl<C> SpreadsheetGateway for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn append_row(&self, range: &str, row: Vec<Value>) -> Result<String, SpreadsheetError> {
        let request = ValueRange {
            values: Some(vec![row]),
            ..ValueRange::default()
        };

        let call = self
            .hub
            .spreadsheets()
            .values_append(request, &self.spreadsheet_id, range)
            .value_input_option("USER_ENTERED")
            .insert_data_option("INSERT_ROWS")
            .add_scope(Scope::Spreadsheet)
            .doit();

        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, call).await })
            .map_err(|_| SpreadsheetError::Timeout(self.timeout))?;

        let (_, response) = result.map_err(GoogleSheetsClient::<C>::map_error)?;
        Ok(response
            .updates
            .and_then(|updates| updates.updated_range)
            .unwrap_or_else(|| range.to_string()))
    }
}

/// Build a sheets client authenticated with a service-account key file.
pub async fn connect_service_account(
    key_path: &Path,
    spreadsheet_id: &str,
    timeout: Duration,
) -> Result<Arc<dyn SpreadsheetGateway>, SpreadsheetError> {
    let key = yup_oauth2::read_service_account_key(key_path)
        .await
        .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?;
    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?
        .https_or_http()
        .enable_http1()
        .build();
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    let hub = Sheets::new(client, auth);
    Ok(Arc::new(GoogleSheetsClient::new(
        hub,
        spreadsheet_id,
        timeout,
        Handle::current(),
    )))
}

/// Column order of the leads sheet.
pub const LEAD_COLUMNS: [&str; 20] = [
    "Submitted At",
    "Full Name",
    "Email",
    "Phone",
    "Street Address",
    "City",
    "Province",
    "Postal Code",
    "Date of Birth",
    "Company",
    "Job Title",
    "Vehicle Type",
    "Desired Vehicle",
    "Budget",
    "Trade-In",
    "Credit Score",
    "Employment",
    "Employment Length",
    "Monthly Income",
    "Pay Stub",
];

pub fn lead_row(lead: &LeadRecord, context: &DeliveryContext) -> Vec<Value> {
    let personal = &lead.personal_info;
    let vehicle = &lead.vehicle_info;
    let pay_stub = lead
        .pay_stub()
        .map(|stub| stub.filename.clone())
        .unwrap_or_default();

    [
        context.submitted_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        personal.full_name.clone(),
        personal.email.clone(),
        personal.phone.clone(),
        personal.street_address.clone(),
        personal.city.clone(),
        personal.province.clone(),
        personal.postal_code.clone(),
        personal.date_of_birth.clone(),
        personal.company_name.clone(),
        personal.job_title.clone(),
        vehicle.vehicle_type.clone(),
        vehicle.desired_vehicle.clone(),
        vehicle.budget.clone(),
        vehicle.trade_in.clone(),
        vehicle.credit_score.clone(),
        vehicle.employment.clone(),
        vehicle.employment_length.clone(),
        vehicle.income.clone(),
        pay_stub,
    ]
    .into_iter()
    .map(Value::String)
    .collect()
}

/// Appends each lead as a row in the leads spreadsheet.
#[derive(Debug, Clone)]
pub struct SpreadsheetSink {
    gateway: Arc<dyn SpreadsheetGateway>,
    range: String,
}

impl SpreadsheetSink {
    pub fn new(gateway: Arc<dyn SpreadsheetGateway>, range: impl Into<String>) -> Self {
        Self {
            gateway,
            range: range.into(),
        }
    }
}

impl LeadSink for SpreadsheetSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Spreadsheet
    }

    fn send(&self, lead: &LeadRecord, context: &DeliveryContext) -> Result<SinkReceipt, SinkError> {
        let row = lead_row(lead, context);
        match self.gateway.append_row(&self.range, row) {
            Ok(updated) => Ok(SinkReceipt::new(format!("appended to {updated}"))),
            Err(SpreadsheetError::Timeout(after)) => Err(SinkError::Timeout(after.as_millis())),
            Err(err) => Err(SinkError::Backend(err.to_string())),
        }
    }
}
