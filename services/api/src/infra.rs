use autoquiz::config::AppConfig;
use autoquiz::error::AppError;
use autoquiz::http::HttpTransport;
use autoquiz::submission::{
    connect_service_account, CrmSink, DeliveryContext, EmailSink, LeadSink, SinkError, SinkKind,
    SinkReceipt, SmtpMailer, SpreadsheetSink,
};
use autoquiz::survey::LeadRecord;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub(crate) const USER_AGENT: &str = concat!("autoquiz/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build every sink the configuration has credentials for. Unconfigured sinks are skipped.
pub(crate) async fn live_sinks(
    config: &AppConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Vec<Arc<dyn LeadSink>>, AppError> {
    let mut sinks: Vec<Arc<dyn LeadSink>> = Vec::new();

    for kind in SinkKind::ALL {
        if !config.sink_configured(kind) {
            warn!(sink = %kind, "sink not configured; skipping");
            continue;
        }

        let sink: Arc<dyn LeadSink> = match kind {
            SinkKind::Crm => Arc::new(CrmSink::new(
                Arc::clone(&transport),
                config.crm.clone(),
                config.delivery.site_url.clone(),
            )),
            SinkKind::Spreadsheet => {
                let (Some(spreadsheet_id), Some(key_path)) = (
                    config.spreadsheet.spreadsheet_id.as_deref(),
                    config.spreadsheet.service_account_key.as_deref(),
                ) else {
                    continue;
                };
                let gateway =
                    connect_service_account(key_path, spreadsheet_id, config.delivery.timeout)
                        .await
                        .map_err(|err| AppError::Integration(err.to_string()))?;
                Arc::new(SpreadsheetSink::new(gateway, config.spreadsheet.range.clone()))
            }
            SinkKind::Email => {
                let Some(admin_email) = config.email.admin_email.clone() else {
                    continue;
                };
                let mailer = SmtpMailer::from_config(&config.email, config.delivery.timeout)
                    .map_err(|err| AppError::Integration(err.to_string()))?;
                Arc::new(EmailSink::new(
                    Arc::new(mailer),
                    admin_email,
                    config.email.confirm_applicant,
                ))
            }
        };
        info!(sink = %kind, "sink configured");
        sinks.push(sink);
    }

    Ok(sinks)
}

/// Sink that keeps leads in memory, used by the demo when no live delivery is requested.
#[derive(Debug)]
pub(crate) struct InMemoryLeadSink {
    kind: SinkKind,
    available: bool,
    leads: Mutex<Vec<LeadRecord>>,
}

impl InMemoryLeadSink {
    pub(crate) fn new(kind: SinkKind, available: bool) -> Self {
        Self {
            kind,
            available,
            leads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn stored(&self) -> usize {
        self.leads.lock().expect("lead mutex poisoned").len()
    }
}

impl LeadSink for InMemoryLeadSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn send(&self, lead: &LeadRecord, _context: &DeliveryContext) -> Result<SinkReceipt, SinkError> {
        if !self.available {
            return Err(SinkError::Backend(format!("{} offline", self.kind.label())));
        }
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        guard.push(lead.clone());
        Ok(SinkReceipt::new(format!("stored in memory ({} total)", guard.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn offline_memory_sink_reports_failure() {
        let sink = InMemoryLeadSink::new(SinkKind::Crm, false);
        let context = DeliveryContext::new(Utc::now());
        assert!(sink.send(&LeadRecord::default(), &context).is_err());
        assert_eq!(sink.stored(), 0);
    }

    #[test]
    fn memory_sink_keeps_each_lead() {
        let sink = InMemoryLeadSink::new(SinkKind::Email, true);
        let context = DeliveryContext::new(Utc::now());
        sink.send(&LeadRecord::default(), &context)
            .expect("stored");
        sink.send(&LeadRecord::default(), &context)
            .expect("stored");
        assert_eq!(sink.stored(), 2);
    }
}
