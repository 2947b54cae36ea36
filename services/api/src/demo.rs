use crate::infra::{live_sinks, InMemoryLeadSink, USER_AGENT};
use autoquiz::config::AppConfig;
use autoquiz::error::AppError;
use autoquiz::http::{HttpTransport, UreqTransport};
use autoquiz::places::StructuredAddress;
use autoquiz::submission::{LeadSink, SinkKind, SubmissionOrchestrator, SubmissionResult};
use autoquiz::survey::{
    validate_submission, Advance, FieldKey, FieldUpdate, LeadRecord, SurveyController,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Deliver to the sinks configured in the environment instead of in-memory ones.
    #[arg(long)]
    pub(crate) live: bool,
    /// Simulate a CRM outage so the backup path is exercised (in-memory mode only).
    #[arg(long)]
    pub(crate) crm_down: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("AutoQuiz survey demo");
    let lead = scripted_survey()?;

    if let Err(problems) = validate_submission(&lead) {
        println!("  Lead failed server-side validation:");
        for problem in problems {
            println!("    - {problem}");
        }
        return Ok(());
    }

    if args.live {
        return deliver_live(lead).await;
    }

    let mut orchestrator = SubmissionOrchestrator::new();
    for kind in SinkKind::ALL {
        let available = !(args.crm_down && kind == SinkKind::Crm);
        let sink: Arc<dyn LeadSink> = Arc::new(InMemoryLeadSink::new(kind, available));
        orchestrator = orchestrator.with_sink(sink, kind != SinkKind::Spreadsheet);
    }
    let result = orchestrator.submit(&lead);
    render_result(&result);
    Ok(())
}

async fn deliver_live(lead: LeadRecord) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let transport: Arc<dyn HttpTransport> =
        Arc::new(UreqTransport::new(config.delivery.timeout, USER_AGENT));
    let sinks = live_sinks(&config, transport).await?;
    let orchestrator = SubmissionOrchestrator::from_delivery(sinks, &config.delivery);

    // Sheets and SMTP clients block; keep them off the runtime threads.
    let result = tokio::task::spawn_blocking(move || orchestrator.submit(&lead))
        .await
        .map_err(|err| AppError::Integration(err.to_string()))?;
    render_result(&result);
    Ok(())
}

fn scripted_survey() -> Result<LeadRecord, AppError> {
    let mut controller = SurveyController::default();
    let answers: [(FieldKey, &str); 7] = [
        (FieldKey::VehicleType, "SUV"),
        (FieldKey::Budget, "$400-499"),
        (FieldKey::TradeIn, "No"),
        (FieldKey::CreditScore, "Good (660-724)"),
        (FieldKey::Employment, "Employed"),
        (FieldKey::Income, "$3501-$4500"),
        (FieldKey::EmploymentLength, "2+ Years"),
    ];
    let free_text: [(FieldKey, &str); 6] = [
        (FieldKey::CompanyName, "Northside Logistics"),
        (FieldKey::JobTitle, "Dispatcher"),
        (FieldKey::DateOfBirth, "1990-04-12"),
        (FieldKey::FullName, "Jane Doe"),
        (FieldKey::Phone, "5195551234"),
        (FieldKey::Email, "jane.doe@example.com"),
    ];

    while let Some(step) = controller.current_step().cloned() {
        println!("- {} {}", controller.progress_label(), step.prompt);

        if step.key == "address" {
            controller
                .apply_address(&StructuredAddress {
                    street_address: "1 Main St".to_string(),
                    city: "London".to_string(),
                    province: "ON".to_string(),
                    postal_code: "N6C 4X5".to_string(),
                })
                .map_err(survey_error)?;
        }

        let mut advanced = false;
        for field in step.fields {
            let value = answers
                .iter()
                .chain(free_text.iter())
                .find(|(key, _)| key == field)
                .map(|(_, value)| *value);
            let Some(value) = value else {
                continue;
            };
            println!("    {}: {value}", field.label());
            if let FieldUpdate::Advanced(_) =
                controller.update_field(*field, value).map_err(survey_error)?
            {
                advanced = true;
            }
        }

        if !advanced {
            if let Advance::Rejected { message } = controller.go_next() {
                return Err(AppError::Integration(format!(
                    "demo answers rejected at {}: {message}",
                    step.key
                )));
            }
        }
    }

    println!("Survey complete ({}%)", controller.progress_percent());
    Ok(controller.into_record())
}

fn survey_error(err: autoquiz::survey::SurveyError) -> AppError {
    AppError::Integration(err.to_string())
}

fn render_result(result: &SubmissionResult) {
    println!("\nDelivery");
    for outcome in &result.outcomes {
        let status = if outcome.ok { "ok" } else { "failed" };
        let critical = if outcome.critical { " (critical)" } else { "" };
        println!(
            "  - {}{}: {} | {}",
            outcome.sink.label(),
            critical,
            status,
            outcome.detail
        );
    }
    println!(
        "Result: {} | {}",
        if result.success { "success" } else { "failure" },
        result.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_survey_produces_a_valid_lead() {
        let lead = scripted_survey().expect("demo answers pass every step");
        assert!(validate_submission(&lead).is_ok());
        assert_eq!(lead.personal_info.province, "ON");
        assert_eq!(lead.vehicle_info.employment_length, "2+ Years");
    }

    #[tokio::test]
    async fn in_memory_demo_survives_crm_outage() {
        run_demo(DemoArgs {
            live: false,
            crm_down: true,
        })
        .await
        .expect("demo completes");
    }
}
