use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::submission::SinkKind;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub delivery: DeliveryConfig,
    pub crm: CrmConfig,
    pub email: EmailConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub places: PlacesConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timeout_ms = parse_number("SINK_TIMEOUT_MS", 5_000)?;
        let delivery = DeliveryConfig {
            order: parse_sink_list("SINK_ORDER", &SinkKind::ALL)?,
            critical: parse_sink_list("CRITICAL_SINKS", &[SinkKind::Crm, SinkKind::Email])?,
            timeout: Duration::from_millis(timeout_ms.max(100)),
            site_url: optional_var("SITE_URL")
                .unwrap_or_else(|| "https://yourdomain.com".to_string()),
        };

        let crm = CrmConfig {
            base_url: optional_var("CRM_BASE_URL")
                .unwrap_or_else(|| "https://api.leadconnectorhq.com".to_string()),
            survey_id: optional_var("CRM_SURVEY_ID"),
            direct_url: optional_var("CRM_DIRECT_URL"),
            api_key: optional_var("CRM_API_KEY"),
        };

        let smtp_port = u16::try_from(parse_number("SMTP_PORT", 587)?).map_err(|_| {
            ConfigError::InvalidNumber {
                var: "SMTP_PORT",
            }
        })?;
        let email = EmailConfig {
            smtp_host: optional_var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port,
            username: optional_var("SMTP_USER"),
            password: optional_var("SMTP_PASS"),
            admin_email: optional_var("ADMIN_EMAIL"),
            confirm_applicant: parse_flag("EMAIL_CONFIRM_APPLICANT")?,
        };

        let spreadsheet = SpreadsheetConfig {
            spreadsheet_id: optional_var("SPREADSHEET_ID"),
            range: optional_var("SPREADSHEET_RANGE").unwrap_or_else(|| "Leads!A1".to_string()),
            service_account_key: optional_var("GOOGLE_SERVICE_ACCOUNT_KEY").map(PathBuf::from),
        };

        let places = PlacesConfig {
            api_key: optional_var("GOOGLE_PLACES_API_KEY"),
            country: optional_var("PLACES_COUNTRY").unwrap_or_else(|| "ca".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            delivery,
            crm,
            email,
            spreadsheet,
            places,
        })
    }

    /// Whether the given sink has everything it needs to be wired up.
    pub fn sink_configured(&self, kind: SinkKind) -> bool {
        match kind {
            SinkKind::Crm => self.crm.is_configured(),
            SinkKind::Spreadsheet => self.spreadsheet.is_configured(),
            SinkKind::Email => self.email.is_configured(),
        }
    }

    /// Sinks with complete settings, whether or not they are in the delivery order.
    pub fn configured_sinks(&self) -> Vec<SinkKind> {
        SinkKind::ALL
            .into_iter()
            .filter(|kind| self.sink_configured(*kind))
            .collect()
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Ordering, criticality and timeouts shared by every outbound sink.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub order: Vec<SinkKind>,
    pub critical: Vec<SinkKind>,
    pub timeout: Duration,
    pub site_url: String,
}

/// Lead-intake CRM widget endpoints.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub survey_id: Option<String>,
    pub direct_url: Option<String>,
    pub api_key: Option<String>,
}

impl CrmConfig {
    pub fn is_configured(&self) -> bool {
        self.survey_id.is_some() || self.direct_url.is_some()
    }

    pub fn survey_submit_url(&self) -> Option<String> {
        self.survey_id.as_ref().map(|id| {
            format!(
                "{}/widget/survey/{}/submit",
                self.base_url.trim_end_matches('/'),
                id
            )
        })
    }

    pub fn form_submit_url(&self) -> String {
        format!("{}/widget/form/submit", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub admin_email: Option<String>,
    pub confirm_applicant: bool,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some() && self.admin_email.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SpreadsheetConfig {
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub service_account_key: Option<PathBuf>,
}

impl SpreadsheetConfig {
    pub fn is_configured(&self) -> bool {
        self.spreadsheet_id.is_some() && self.service_account_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    pub country: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidFlag { var: &'static str, value: String },
    UnknownSink { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a non-negative integer in range")
            }
            ConfigError::InvalidFlag { var, value } => {
                write!(f, "{var} must be true/false, found '{value}'")
            }
            ConfigError::UnknownSink { var, value } => write!(
                f,
                "{var} lists unknown sink '{value}' (expected crm, spreadsheet or email)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional_var(var) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = optional_var(var) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value: raw }),
    }
}

fn parse_sink_list(var: &'static str, default: &[SinkKind]) -> Result<Vec<SinkKind>, ConfigError> {
    let Some(raw) = optional_var(var) else {
        return Ok(default.to_vec());
    };

    let mut sinks = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let kind = SinkKind::parse(entry).ok_or_else(|| ConfigError::UnknownSink {
            var,
            value: entry.to_string(),
        })?;
        if !sinks.contains(&kind) {
            sinks.push(kind);
        }
    }
    Ok(sinks)
}
