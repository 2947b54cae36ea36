use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;

use super::domain::{FieldKey, LeadRecord, PayStub};
use super::steps::{InputKind, StepDefinition};

pub const PAY_STUB_MAX_BYTES: u64 = 10 * 1024 * 1024;

const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address (e.g. name@example.com)";

/// Result of checking one step against the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepValidation {
    pub valid: bool,
    pub message: Option<String>,
}

impl StepValidation {
    pub fn pass() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"))
}

pub fn is_valid_email(candidate: &str) -> bool {
    email_pattern().is_match(candidate)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Check whether the record satisfies the step so the survey can advance.
pub fn validate_step(step: &StepDefinition, record: &LeadRecord) -> StepValidation {
    if step.optional {
        return StepValidation::pass();
    }

    match step.input {
        InputKind::SingleChoice { .. } | InputKind::Date | InputKind::FreeText => {
            if step.fields.iter().any(|field| is_blank(record.get(*field))) {
                StepValidation::fail(step.missing_message)
            } else {
                StepValidation::pass()
            }
        }
        InputKind::MultiField | InputKind::Address => {
            let missing: Vec<FieldKey> = step
                .fields
                .iter()
                .copied()
                .filter(|field| is_blank(record.get(*field)))
                .collect();

            if !missing.is_empty() {
                return StepValidation::fail(missing_fields_message(step, &missing));
            }

            if step.touches(FieldKey::Email) && !is_valid_email(record.get(FieldKey::Email)) {
                return StepValidation::fail(INVALID_EMAIL_MESSAGE);
            }

            StepValidation::pass()
        }
        InputKind::File => StepValidation::pass(),
    }
}

fn missing_fields_message(step: &StepDefinition, missing: &[FieldKey]) -> String {
    if missing.len() == step.fields.len() {
        return step.missing_message.to_string();
    }

    let labels: Vec<&str> = missing.iter().map(|field| field.label()).collect();
    match labels.as_slice() {
        [only] => format!("Please enter your {only}"),
        [head @ .., last] => format!("Please enter your {} and {}", head.join(", "), last),
        [] => step.missing_message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayStubError {
    #[error("pay stub must be an image or PDF (found {0})")]
    UnsupportedType(String),
    #[error("pay stub exceeds the 10 MB limit")]
    TooLarge,
    #[error("pay stub payload is not a valid base64 data URL")]
    Malformed,
}

/// Decoded view of a pay stub data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayStub {
    pub mime: mime::Mime,
    pub bytes: Vec<u8>,
}

/// Enforce the upload rules: image or PDF, at most 10 MB.
pub fn decode_pay_stub(stub: &PayStub) -> Result<DecodedPayStub, PayStubError> {
    let (header, payload) = stub
        .data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(PayStubError::Malformed)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(PayStubError::Malformed)?;
    let parsed: mime::Mime = media_type
        .parse()
        .map_err(|_| PayStubError::UnsupportedType(media_type.to_string()))?;

    let accepted = parsed.type_() == mime::IMAGE
        || (parsed.type_() == mime::APPLICATION && parsed.subtype() == mime::PDF);
    if !accepted {
        return Err(PayStubError::UnsupportedType(parsed.essence_str().to_string()));
    }

    if stub.size > PAY_STUB_MAX_BYTES {
        return Err(PayStubError::TooLarge);
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| PayStubError::Malformed)?;
    if bytes.len() as u64 > PAY_STUB_MAX_BYTES {
        return Err(PayStubError::TooLarge);
    }

    Ok(DecodedPayStub {
        mime: parsed,
        bytes,
    })
}

const REQUIRED_FIELDS: &[(FieldKey, &str)] = &[
    (FieldKey::FullName, "Full name is required"),
    (FieldKey::Email, "Email is required"),
    (FieldKey::Phone, "Phone number is required"),
    (FieldKey::City, "City is required"),
    (FieldKey::Province, "Province is required"),
    (FieldKey::StreetAddress, "Street address is required"),
    (FieldKey::PostalCode, "Postal code is required"),
    (FieldKey::DateOfBirth, "Date of birth is required"),
    (FieldKey::CompanyName, "Company name is required"),
    (FieldKey::JobTitle, "Job title is required"),
    (FieldKey::VehicleType, "Vehicle type is required"),
    (FieldKey::Budget, "Budget is required"),
    (FieldKey::TradeIn, "Trade in preference is required"),
    (FieldKey::CreditScore, "Credit score is required"),
    (FieldKey::Employment, "Employment status is required"),
    (FieldKey::EmploymentLength, "Employment length is required"),
    (FieldKey::Income, "Monthly income is required"),
];

/// Whole-record check run by the submission endpoint. Reports every problem at once.
pub fn validate_submission(record: &LeadRecord) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(field, _)| is_blank(record.get(*field)))
        .map(|(_, message)| (*message).to_string())
        .collect();

    let email = record.personal_info.email.as_str();
    if !is_blank(email) && !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }

    if let Some(stub) = record.pay_stub() {
        if let Err(err) = decode_pay_stub(stub) {
            errors.push(err.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::steps::SurveyBlueprint;

    fn step(key: &str) -> StepDefinition {
        SurveyBlueprint::standard()
            .steps()
            .iter()
            .find(|step| step.key == key)
            .cloned()
            .expect("step exists")
    }

    fn stub(data_url: &str, size: u64) -> PayStub {
        PayStub {
            data_url: data_url.to_string(),
            compressed: None,
            filename: "stub".to_string(),
            size,
        }
    }

    #[test]
    fn email_shape_matches_local_at_domain_tld() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn single_choice_rejects_empty_value_with_step_message() {
        let record = LeadRecord::default();
        let result = validate_step(&step("budget"), &record);
        assert!(!result.valid);
        assert!(result.message.unwrap_or_default().contains("budget"));
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut record = LeadRecord::default();
        record.set(FieldKey::DateOfBirth, "   ".to_string());
        assert!(!validate_step(&step("date_of_birth"), &record).valid);
    }

    #[test]
    fn optional_steps_always_pass() {
        let record = LeadRecord::default();
        assert!(validate_step(&step("desired_vehicle"), &record).valid);
        assert!(validate_step(&step("pay_stub"), &record).valid);
    }

    #[test]
    fn multi_field_names_the_missing_parts() {
        let mut record = LeadRecord::default();
        record.set(FieldKey::StreetAddress, "1 Main St".to_string());
        record.set(FieldKey::City, "London".to_string());
        let result = validate_step(&step("address"), &record);
        assert_eq!(
            result.message.as_deref(),
            Some("Please enter your province and postal code")
        );
    }

    #[test]
    fn contact_step_reports_email_format_when_rest_is_filled() {
        let mut record = LeadRecord::default();
        record.set(FieldKey::FullName, "Jane Doe".to_string());
        record.set(FieldKey::Phone, "5195551234".to_string());
        record.set(FieldKey::Email, "not-an-email".to_string());
        let result = validate_step(&step("contact"), &record);
        assert!(!result.valid);
        assert!(result.message.unwrap_or_default().contains("valid email"));

        record.set(FieldKey::Email, "a@b.com".to_string());
        assert!(validate_step(&step("contact"), &record).valid);
    }

    #[test]
    fn submission_validation_lists_every_missing_field() {
        let errors = validate_submission(&LeadRecord::default()).expect_err("empty record fails");
        assert_eq!(errors.len(), REQUIRED_FIELDS.len());
        assert!(errors.contains(&"Budget is required".to_string()));
        assert!(!errors.contains(&"Invalid email format".to_string()));
    }

    #[test]
    fn submission_validation_flags_bad_email() {
        let mut record = LeadRecord::default();
        record.set(FieldKey::Email, "nope".to_string());
        let errors = validate_submission(&record).expect_err("record fails");
        assert!(errors.contains(&"Invalid email format".to_string()));
    }

    #[test]
    fn padded_email_is_rejected_as_entered() {
        let mut record = LeadRecord::default();
        record.set(FieldKey::FullName, "Jane Doe".to_string());
        record.set(FieldKey::Phone, "5195551234".to_string());
        record.set(FieldKey::Email, " a@b.com".to_string());
        assert!(!validate_step(&step("contact"), &record).valid);
        let errors = validate_submission(&record).expect_err("record fails");
        assert!(errors.contains(&"Invalid email format".to_string()));
    }

    #[test]
    fn pay_stub_accepts_images_and_pdf() {
        let png = decode_pay_stub(&stub("data:image/png;base64,iVBORw0KGgo=", 8))
            .expect("png accepted");
        assert_eq!(png.mime.type_(), mime::IMAGE);
        assert_eq!(png.bytes.len(), 8);
        assert!(decode_pay_stub(&stub("data:application/pdf;base64,JVBERi0=", 5)).is_ok());
    }

    #[test]
    fn pay_stub_rejects_other_types_and_oversized_files() {
        assert!(matches!(
            decode_pay_stub(&stub("data:text/plain;base64,aGk=", 2)),
            Err(PayStubError::UnsupportedType(_))
        ));
        assert_eq!(
            decode_pay_stub(&stub("data:image/png;base64,aGk=", PAY_STUB_MAX_BYTES + 1)),
            Err(PayStubError::TooLarge)
        );
        assert_eq!(
            decode_pay_stub(&stub("paystub.png", 2)),
            Err(PayStubError::Malformed)
        );
    }
}
