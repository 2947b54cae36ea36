use std::fmt::{Debug, Write as _};
use std::sync::Arc;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use super::sink::{DeliveryContext, LeadSink, SinkError, SinkKind, SinkReceipt};
use crate::config::EmailConfig;
use crate::survey::{decode_pay_stub, LeadRecord};

const SYSTEM_SENDER: &str = "AutoQuiz Pro System";
const APPLICANT_SENDER: &str = "AutoQuiz Pro";
const CONFIRMATION_SUBJECT: &str = "Thank you for completing your AutoQuiz Pro assessment!";

/// Fully rendered message ready for a mail gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub sender_name: &'static str,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachment: Option<MailAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("message could not be built: {0}")]
    Build(String),
    #[error("smtp delivery failed: {0}")]
    Smtp(String),
}

pub trait MailGateway: Send + Sync + Debug {
    fn deliver(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// SMTP relay over STARTTLS, authenticated with the configured account.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from_address: String,
}

impl Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig, timeout: Duration) -> Result<Self, MailError> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(MailError::Build("SMTP credentials missing".to_string()));
        };
        let transport = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|err| MailError::Smtp(err.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .timeout(Some(timeout))
            .build();
        Ok(Self {
            transport,
            from_address: username.clone(),
        })
    }

    fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox, MailError> {
        let parsed = address
            .parse()
            .map_err(|_| MailError::Address(address.to_string()))?;
        Ok(Mailbox::new(name.map(str::to_string), parsed))
    }
}

impl MailGateway for SmtpMailer {
    fn deliver(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let body = MultiPart::alternative_plain_html(mail.text.clone(), mail.html.clone());
        let body = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|err| MailError::Build(err.to_string()))?;
                MultiPart::mixed().multipart(body).singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.bytes.clone(), content_type),
                )
            }
            None => body,
        };

        let message = Message::builder()
            .from(Self::mailbox(Some(mail.sender_name), &self.from_address)?)
            .to(Self::mailbox(None, &mail.to)?)
            .subject(mail.subject.clone())
            .multipart(body)
            .map_err(|err| MailError::Build(err.to_string()))?;

        self.transport
            .send(&message)
            .map_err(|err| MailError::Smtp(err.to_string()))?;
        Ok(())
    }
}

/// Notifies the admin inbox of each lead, optionally thanking the applicant as well.
#[derive(Debug, Clone)]
pub struct EmailSink {
    gateway: Arc<dyn MailGateway>,
    admin_email: String,
    confirm_applicant: bool,
}

impl EmailSink {
    pub fn new(gateway: Arc<dyn MailGateway>, admin_email: impl Into<String>, confirm_applicant: bool) -> Self {
        Self {
            gateway,
            admin_email: admin_email.into(),
            confirm_applicant,
        }
    }

    pub fn admin_notification(&self, lead: &LeadRecord, context: &DeliveryContext) -> OutgoingMail {
        let attachment = lead.pay_stub().and_then(|stub| match decode_pay_stub(stub) {
            Ok(decoded) => Some(MailAttachment {
                filename: stub.filename.clone(),
                content_type: decoded.mime.essence_str().to_string(),
                bytes: decoded.bytes,
            }),
            Err(err) => {
                warn!(error = %err, "pay stub not attached");
                None
            }
        });

        OutgoingMail {
            sender_name: SYSTEM_SENDER,
            to: self.admin_email.clone(),
            subject: format!(
                "New Auto Quiz Lead: {} - {}",
                lead.personal_info.full_name, lead.vehicle_info.vehicle_type
            ),
            html: admin_html(lead, context),
            text: admin_text(lead, context),
            attachment,
        }
    }

    pub fn applicant_confirmation(&self, lead: &LeadRecord) -> OutgoingMail {
        OutgoingMail {
            sender_name: APPLICANT_SENDER,
            to: lead.personal_info.email.clone(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            html: confirmation_html(lead),
            text: confirmation_text(lead),
            attachment: None,
        }
    }
}

impl LeadSink for EmailSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Email
    }

    fn send(&self, lead: &LeadRecord, context: &DeliveryContext) -> Result<SinkReceipt, SinkError> {
        let notification = self.admin_notification(lead, context);
        self.gateway
            .deliver(&notification)
            .map_err(|err| SinkError::Backend(err.to_string()))?;
        info!("admin notification sent");

        // Only the admin notification decides the sink's outcome.
        if self.confirm_applicant {
            if let Err(err) = self.gateway.deliver(&self.applicant_confirmation(lead)) {
                warn!(error = %err, "applicant confirmation failed");
            }
        }

        Ok(SinkReceipt::new("admin notified"))
    }
}

fn integration_rows(context: &DeliveryContext) -> Vec<(&'static str, &'static str)> {
    context
        .prior
        .iter()
        .map(|outcome| {
            let status = if outcome.ok { "Success" } else { "Failed" };
            (outcome.sink.label(), status)
        })
        .collect()
}

fn personal_rows(lead: &LeadRecord) -> Vec<(&'static str, &str)> {
    let personal = &lead.personal_info;
    vec![
        ("Full Name", personal.full_name.as_str()),
        ("Email", personal.email.as_str()),
        ("Phone", personal.phone.as_str()),
        ("Street Address", personal.street_address.as_str()),
        ("City", personal.city.as_str()),
        ("Province", personal.province.as_str()),
        ("Postal Code", personal.postal_code.as_str()),
        ("Date of Birth", personal.date_of_birth.as_str()),
        ("Company", personal.company_name.as_str()),
        ("Job Title", personal.job_title.as_str()),
    ]
}

fn vehicle_rows(lead: &LeadRecord) -> Vec<(&'static str, &str)> {
    let vehicle = &lead.vehicle_info;
    let mut rows = vec![("Vehicle Type", vehicle.vehicle_type.as_str())];
    if !vehicle.desired_vehicle.is_empty() {
        rows.push(("Desired Vehicle", vehicle.desired_vehicle.as_str()));
    }
    rows.extend([
        ("Monthly Budget", vehicle.budget.as_str()),
        ("Trade-In", vehicle.trade_in.as_str()),
        ("Credit Score", vehicle.credit_score.as_str()),
        ("Employment", vehicle.employment.as_str()),
        ("Employment Length", vehicle.employment_length.as_str()),
        ("Monthly Income", vehicle.income.as_str()),
    ]);
    rows
}

fn html_table(html: &mut String, title: &str, rows: &[(&str, &str)]) {
    write!(html, "<h2>{}</h2><table>", escape_html(title)).expect("write section heading");
    for (label, value) in rows {
        write!(
            html,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        )
        .expect("write table row");
    }
    html.push_str("</table>");
}

fn admin_html(lead: &LeadRecord, context: &DeliveryContext) -> String {
    let mut html = String::from("<!DOCTYPE html><html><body>");
    write!(
        html,
        "<h1>New Auto Quiz Lead</h1><p>{} is looking for a {}.</p>",
        escape_html(&lead.personal_info.full_name),
        escape_html(&lead.vehicle_info.vehicle_type)
    )
    .expect("write lead headline");

    let integrations = integration_rows(context);
    if !integrations.is_empty() {
        html_table(&mut html, "Integration Status", &integrations);
    }
    html_table(&mut html, "Contact Information", &personal_rows(lead));
    html_table(&mut html, "Vehicle & Financial Information", &vehicle_rows(lead));

    if let Some(stub) = lead.pay_stub() {
        write!(
            html,
            "<p>Pay stub attached: {}</p>",
            escape_html(&stub.filename)
        )
        .expect("write pay stub note");
    }

    write!(
        html,
        "<p><em>Submitted {} via the Auto Quiz website.</em></p></body></html>",
        context.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
    .expect("write submission footer");
    html
}

fn text_section(text: &mut String, title: &str, rows: &[(&str, &str)]) {
    writeln!(text, "{title}").expect("write section title");
    writeln!(text, "{}", "-".repeat(title.len())).expect("write section rule");
    for (label, value) in rows {
        writeln!(text, "{label}: {value}").expect("write section row");
    }
    text.push('\n');
}

fn admin_text(lead: &LeadRecord, context: &DeliveryContext) -> String {
    let mut text = String::from("NEW AUTO QUIZ LEAD\n\n");
    let integrations = integration_rows(context);
    if !integrations.is_empty() {
        text_section(&mut text, "Integration Status", &integrations);
    }
    text_section(&mut text, "Contact Information", &personal_rows(lead));
    text_section(&mut text, "Vehicle & Financial Information", &vehicle_rows(lead));
    if let Some(stub) = lead.pay_stub() {
        writeln!(text, "Pay stub attached: {}\n", stub.filename).expect("write pay stub note");
    }
    writeln!(
        text,
        "Submitted: {}\nSource: Auto Quiz Website",
        context.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
    .expect("write submission footer");
    text
}

const NEXT_STEPS: [&str; 3] = [
    "A financing specialist reviews your answers.",
    "We contact you within one business day with options that fit your budget.",
    "You pick a vehicle and we handle the paperwork.",
];

fn confirmation_html(lead: &LeadRecord) -> String {
    let (first_name, _) = lead.personal_info.split_name();
    let mut html = String::from("<!DOCTYPE html><html><body>");
    write!(
        html,
        "<h1>AutoQuiz Pro</h1><h2>Hello {}!</h2><p>Thank you for completing your automotive assessment. Our financing team is already reviewing your responses.</p>",
        escape_html(&first_name)
    )
    .expect("write greeting");
    html_table(&mut html, "Your Assessment Summary", &vehicle_rows(lead));
    html.push_str("<h2>What Happens Next?</h2><ol>");
    for step in NEXT_STEPS {
        write!(html, "<li>{step}</li>").expect("write next step");
    }
    html.push_str("</ol></body></html>");
    html
}

fn confirmation_text(lead: &LeadRecord) -> String {
    let (first_name, _) = lead.personal_info.split_name();
    let mut text = format!(
        "Hello {first_name}!\n\nThank you for completing your automotive assessment. Our financing team is already reviewing your responses.\n\n"
    );
    text_section(&mut text, "Your Assessment Summary", &vehicle_rows(lead));
    text.push_str("What Happens Next?\n");
    for (index, step) in NEXT_STEPS.iter().enumerate() {
        writeln!(text, "{}. {step}", index + 1).expect("write next step");
    }
    text
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
