//! Lead survey: record model, step table, per-step validation and the session controller.

pub mod controller;
pub mod domain;
pub mod steps;
pub mod validation;

pub use controller::{Advance, FieldUpdate, SurveyController, SurveyCursor, SurveyError};
pub use domain::{Documents, FieldKey, LeadRecord, PayStub, PersonalInfo, VehicleInfo};
pub use steps::{InputKind, StepDefinition, SurveyBlueprint};
pub use validation::{
    decode_pay_stub, is_valid_email, validate_step, validate_submission, DecodedPayStub,
    PayStubError, StepValidation,
};
