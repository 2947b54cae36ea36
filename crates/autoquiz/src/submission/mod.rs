//! Lead delivery: sink adapters, the orchestrator that fans a completed record out
//! to them, and the HTTP endpoint in front of it.

pub mod crm;
pub mod email;
pub mod orchestrator;
pub mod router;
pub mod sink;
pub mod spreadsheet;

#[cfg(test)]
mod tests;

pub use crm::CrmSink;
pub use email::{EmailSink, MailError, MailGateway, OutgoingMail, SmtpMailer};
pub use orchestrator::{SubmissionOrchestrator, SubmissionResult};
pub use router::{submission_router, SubmissionState};
pub use sink::{DeliveryContext, LeadSink, SinkError, SinkKind, SinkOutcome, SinkReceipt};
pub use spreadsheet::{
    connect_service_account, GoogleSheetsClient, SpreadsheetError, SpreadsheetGateway,
    SpreadsheetSink,
};
