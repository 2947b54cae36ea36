pub mod config;
pub mod error;
pub mod http;
pub mod places;
pub mod submission;
pub mod survey;
pub mod telemetry;
