use super::domain::{FieldKey, LeadRecord, PayStub};
use super::steps::{StepDefinition, SurveyBlueprint};
use super::validation::{decode_pay_stub, validate_step, PayStubError};
use crate::places::StructuredAddress;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyCursor {
    Step(usize),
    Complete,
}

/// Outcome of an attempt to move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { to: usize },
    Completed,
    /// Validation failed; the UI should shake/alert and show the message.
    Rejected { message: String },
}

/// Outcome of a field write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Recorded,
    Advanced(Advance),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("survey already completed; start a new session to change answers")]
    SessionComplete,
    #[error(transparent)]
    PayStub(#[from] PayStubError),
}

/// Per-session survey state: one record, one cursor, one error slot.
#[derive(Debug)]
pub struct SurveyController {
    blueprint: SurveyBlueprint,
    record: LeadRecord,
    cursor: SurveyCursor,
    validation_error: Option<String>,
}

impl Default for SurveyController {
    fn default() -> Self {
        Self::new(SurveyBlueprint::standard())
    }
}

impl SurveyController {
    pub fn new(blueprint: SurveyBlueprint) -> Self {
        let cursor = if blueprint.is_empty() {
            SurveyCursor::Complete
        } else {
            SurveyCursor::Step(0)
        };
        Self {
            blueprint,
            record: LeadRecord::default(),
            cursor,
            validation_error: None,
        }
    }

    pub fn record(&self) -> &LeadRecord {
        &self.record
    }

    pub fn cursor(&self) -> SurveyCursor {
        self.cursor
    }

    pub fn current_step(&self) -> Option<&StepDefinition> {
        match self.cursor {
            SurveyCursor::Step(index) => self.blueprint.step(index),
            SurveyCursor::Complete => None,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.blueprint.len()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == SurveyCursor::Complete
    }

    pub fn progress_percent(&self) -> u8 {
        let total = self.total_steps().max(1);
        let done = match self.cursor {
            SurveyCursor::Step(index) => index + 1,
            SurveyCursor::Complete => total,
        };
        ((done * 100) / total).min(100) as u8
    }

    pub fn progress_label(&self) -> String {
        match self.cursor {
            SurveyCursor::Step(index) => format!("Step {} of {}", index + 1, self.total_steps()),
            SurveyCursor::Complete => "Complete".to_string(),
        }
    }

    /// Write a field. Choosing an option on an auto-advance step moves on immediately.
    pub fn update_field(
        &mut self,
        field: FieldKey,
        value: impl Into<String>,
    ) -> Result<FieldUpdate, SurveyError> {
        self.ensure_open()?;
        let value = value.into();
        self.validation_error = None;

        let auto_advance = self
            .current_step()
            .map(|step| step.auto_advance && step.touches(field) && step.accepts_option(&value))
            .unwrap_or(false);

        self.record.set(field, value);

        if auto_advance {
            Ok(FieldUpdate::Advanced(self.advance()))
        } else {
            Ok(FieldUpdate::Recorded)
        }
    }

    /// Fill the address step from a resolved place in one go.
    pub fn apply_address(&mut self, address: &StructuredAddress) -> Result<(), SurveyError> {
        self.ensure_open()?;
        self.validation_error = None;
        self.record
            .set(FieldKey::StreetAddress, address.street_address.clone());
        self.record.set(FieldKey::City, address.city.clone());
        self.record.set(FieldKey::Province, address.province.clone());
        self.record
            .set(FieldKey::PostalCode, address.postal_code.clone());
        Ok(())
    }

    pub fn attach_pay_stub(&mut self, stub: PayStub) -> Result<(), SurveyError> {
        self.ensure_open()?;
        decode_pay_stub(&stub)?;
        self.validation_error = None;
        self.record.documents.pay_stub = Some(stub);
        Ok(())
    }

    pub fn remove_pay_stub(&mut self) -> Result<(), SurveyError> {
        self.ensure_open()?;
        self.validation_error = None;
        self.record.documents.pay_stub = None;
        Ok(())
    }

    /// Validate the current step and move forward on success.
    pub fn go_next(&mut self) -> Advance {
        let Some(step) = self.current_step() else {
            return Advance::Completed;
        };

        let outcome = validate_step(step, &self.record);
        if !outcome.valid {
            let message = outcome
                .message
                .unwrap_or_else(|| "Please answer this question".to_string());
            self.validation_error = Some(message.clone());
            return Advance::Rejected { message };
        }

        self.advance()
    }

    pub fn go_previous(&mut self) {
        self.validation_error = None;
        if let SurveyCursor::Step(index) = self.cursor {
            if index > 0 {
                self.cursor = SurveyCursor::Step(index - 1);
            }
        }
    }

    /// Hand the finished record over for submission.
    pub fn into_record(self) -> LeadRecord {
        self.record
    }

    fn advance(&mut self) -> Advance {
        self.validation_error = None;
        match self.cursor {
            SurveyCursor::Step(index) if index + 1 < self.total_steps() => {
                self.cursor = SurveyCursor::Step(index + 1);
                Advance::Moved { to: index + 1 }
            }
            _ => {
                self.cursor = SurveyCursor::Complete;
                Advance::Completed
            }
        }
    }

    fn ensure_open(&self) -> Result<(), SurveyError> {
        if self.is_complete() {
            Err(SurveyError::SessionComplete)
        } else {
            Ok(())
        }
    }
}
