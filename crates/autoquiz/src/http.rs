//! Blocking HTTP transport shared by the CRM sink and the places proxy.
//!
//! Adapters only see [`HttpTransport`]; production wiring uses [`UreqTransport`]
//! and tests substitute scripted fakes.

use std::fmt::Debug;
use std::time::Duration;

use serde_json::Value;

/// Body encodings the outbound adapters need.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }
}

/// A single outbound POST.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// Status and raw body of a completed exchange, whatever the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_str(&self.body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{kind} error: {message}")]
    Transport { kind: &'static str, message: String },
    #[error("response body could not be decoded: {0}")]
    Decode(String),
}

pub trait HttpTransport: Send + Sync + Debug {
    fn post(&self, request: &OutboundRequest) -> Result<HttpReply, TransportError>;
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpReply, TransportError>;
}

/// `ureq` agent with connect/read/write timeouts applied to every call.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<HttpReply, TransportError> {
        match result {
            Ok(response) => read_reply(response),
            Err(ureq::Error::Status(_, response)) => read_reply(response),
            Err(ureq::Error::Transport(transport)) => {
                let combined = format!("{:?} {}", transport.kind(), transport);
                Err(TransportError::Transport {
                    kind: classify_transport_error(&combined),
                    message: transport.to_string(),
                })
            }
        }
    }
}

impl HttpTransport for UreqTransport {
    fn post(&self, request: &OutboundRequest) -> Result<HttpReply, TransportError> {
        let mut call = self
            .agent
            .post(&request.url)
            .set("Content-Type", request.body.content_type());
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            RequestBody::Json(payload) => call.send_json(payload.clone()),
            RequestBody::Form(fields) => {
                let pairs: Vec<(&str, &str)> = fields
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect();
                call.send_form(&pairs)
            }
        };
        Self::finish(result)
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
        let mut call = self.agent.get(url);
        for (name, value) in query {
            call = call.query(name, value);
        }
        Self::finish(call.call())
    }
}

fn read_reply(response: ureq::Response) -> Result<HttpReply, TransportError> {
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|err| TransportError::Decode(err.to_string()))?;
    Ok(HttpReply { status, body })
}

fn classify_transport_error(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transport_failures() {
        assert_eq!(classify_transport_error("Io operation timed out"), "timeout");
        assert_eq!(classify_transport_error("Dns failed to lookup"), "dns");
        assert_eq!(
            classify_transport_error("ConnectionFailed refused"),
            "connection"
        );
        assert_eq!(classify_transport_error("BadHeader"), "transport");
    }

    #[test]
    fn reply_success_covers_2xx_only() {
        let ok = HttpReply {
            status: 204,
            body: String::new(),
        };
        let redirect = HttpReply {
            status: 302,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn form_body_declares_urlencoded_content_type() {
        let body = RequestBody::Form(vec![("a".to_string(), "b".to_string())]);
        assert_eq!(body.content_type(), "application/x-www-form-urlencoded");
    }
}
