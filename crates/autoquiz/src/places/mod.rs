//! Address lookup proxy in front of the mapping provider.

pub mod router;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::PlacesConfig;
use crate::http::{HttpTransport, TransportError};

const AUTOCOMPLETE_URL: &str = "https://maps.googleapis.com/maps/api/place/autocomplete/json";
const DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSuggestion {
    pub place_id: String,
    pub description: String,
    pub main_text: String,
    pub secondary_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Address fields in the shape the survey's address step stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAddress {
    pub street_address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

impl StructuredAddress {
    pub fn from_components(components: &[AddressComponent]) -> Self {
        let mut street_number: &str = "";
        let mut route: &str = "";
        let mut address = Self::default();

        for component in components {
            let has = |kind: &str| component.types.iter().any(|t| t == kind);
            if has("street_number") {
                street_number = component.long_name.as_str();
            }
            if has("route") {
                route = component.long_name.as_str();
            }
            if has("locality") {
                address.city = component.long_name.clone();
            }
            if has("administrative_area_level_1") {
                address.province = component.short_name.clone();
            }
            if has("postal_code") {
                address.postal_code = component.long_name.clone();
            }
        }

        address.street_address = format!("{street_number} {route}").trim().to_string();
        address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceDetails {
    /// Provider components passed through under the provider's own key.
    #[serde(rename = "address_components")]
    pub address_components: Vec<AddressComponent>,
    pub address: StructuredAddress,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("{0} is required")]
    MissingInput(&'static str),
    #[error("places API key not configured")]
    NotConfigured,
    #[error("place not found")]
    NotFound,
    #[error("places provider returned status {0}")]
    Upstream(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Thin proxy over the provider's autocomplete and details endpoints.
#[derive(Debug, Clone)]
pub struct PlacesService {
    transport: Arc<dyn HttpTransport>,
    api_key: Option<String>,
    country: String,
}

impl PlacesService {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &PlacesConfig) -> Self {
        Self {
            transport,
            api_key: config.api_key.clone(),
            country: config.country.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn autocomplete(&self, input: &str) -> Result<Vec<AddressSuggestion>, PlacesError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PlacesError::MissingInput("input"));
        }
        let key = self.api_key.as_deref().ok_or(PlacesError::NotConfigured)?;
        let components = format!("country:{}", self.country);

        let reply = self.transport.get(
            AUTOCOMPLETE_URL,
            &[
                ("input", input),
                ("components", components.as_str()),
                ("types", "address"),
                ("key", key),
            ],
        )?;
        if !reply.is_success() {
            warn!(status = reply.status, "address autocomplete failed upstream");
            return Err(PlacesError::Upstream(reply.status));
        }

        let body = reply.json()?;
        let predictions = body
            .get("predictions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(predictions.iter().map(suggestion_from_prediction).collect())
    }

    pub fn details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::MissingInput("placeId"));
        }
        let key = self.api_key.as_deref().ok_or(PlacesError::NotConfigured)?;

        let reply = self.transport.get(
            DETAILS_URL,
            &[
                ("place_id", place_id),
                ("fields", "address_components"),
                ("key", key),
            ],
        )?;
        if !reply.is_success() {
            warn!(status = reply.status, "place details failed upstream");
            return Err(PlacesError::Upstream(reply.status));
        }

        let body = reply.json()?;
        let Some(result) = body.get("result") else {
            return Err(PlacesError::NotFound);
        };
        let address_components: Vec<AddressComponent> = result
            .get("address_components")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| TransportError::Decode(err.to_string()))?
            .unwrap_or_default();

        let address = StructuredAddress::from_components(&address_components);
        Ok(PlaceDetails {
            address_components,
            address,
        })
    }
}

fn suggestion_from_prediction(prediction: &Value) -> AddressSuggestion {
    let text = |value: Option<&Value>| value.and_then(Value::as_str).unwrap_or_default().to_string();
    let formatting = prediction.get("structured_formatting");
    AddressSuggestion {
        place_id: text(prediction.get("place_id")),
        description: text(prediction.get("description")),
        main_text: text(formatting.and_then(|f| f.get("main_text"))),
        secondary_text: text(formatting.and_then(|f| f.get("secondary_text"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpReply, OutboundRequest};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct CannedTransport {
        reply: HttpReply,
        queries: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: HttpReply {
                    status,
                    body: body.to_string(),
                },
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpTransport for CannedTransport {
        fn post(&self, _request: &OutboundRequest) -> Result<HttpReply, TransportError> {
            unreachable!("places only issues GET requests")
        }

        fn get(&self, _url: &str, query: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
            self.queries.lock().expect("query mutex").push(
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            Ok(self.reply.clone())
        }
    }

    fn config(key: Option<&str>) -> PlacesConfig {
        PlacesConfig {
            api_key: key.map(str::to_string),
            country: "ca".to_string(),
        }
    }

    #[test]
    fn autocomplete_maps_predictions() {
        let transport = CannedTransport::new(
            200,
            json!({
                "predictions": [{
                    "place_id": "abc",
                    "description": "1 Main St, London, ON, Canada",
                    "structured_formatting": {
                        "main_text": "1 Main St",
                        "secondary_text": "London, ON, Canada"
                    }
                }, {
                    "place_id": "def",
                    "description": "2 King St"
                }]
            }),
        );
        let service = PlacesService::new(transport.clone(), &config(Some("key")));
        let suggestions = service.autocomplete("1 Main").expect("suggestions");
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].main_text, "1 Main St");
        assert_eq!(suggestions[1].secondary_text, "");

        let queries = transport.queries.lock().expect("query mutex");
        assert!(queries[0].contains(&("components".to_string(), "country:ca".to_string())));
    }

    #[test]
    fn autocomplete_requires_input_and_key() {
        let transport = CannedTransport::new(200, json!({}));
        let unconfigured = PlacesService::new(transport.clone(), &config(None));
        assert!(matches!(
            unconfigured.autocomplete("1 Main"),
            Err(PlacesError::NotConfigured)
        ));
        let service = PlacesService::new(transport, &config(Some("key")));
        assert!(matches!(
            service.autocomplete("  "),
            Err(PlacesError::MissingInput("input"))
        ));
        assert!(service.autocomplete("x").expect("no predictions").is_empty());
    }

    #[test]
    fn details_resolves_structured_address() {
        let transport = CannedTransport::new(
            200,
            json!({
                "result": {
                    "address_components": [
                        { "long_name": "1", "short_name": "1", "types": ["street_number"] },
                        { "long_name": "Main Street", "short_name": "Main St", "types": ["route"] },
                        { "long_name": "London", "short_name": "London", "types": ["locality", "political"] },
                        { "long_name": "Ontario", "short_name": "ON", "types": ["administrative_area_level_1"] },
                        { "long_name": "N6C 4X5", "short_name": "N6C 4X5", "types": ["postal_code"] }
                    ]
                }
            }),
        );
        let service = PlacesService::new(transport, &config(Some("key")));
        let details = service.details("abc").expect("details");
        assert_eq!(
            details.address,
            StructuredAddress {
                street_address: "1 Main Street".to_string(),
                city: "London".to_string(),
                province: "ON".to_string(),
                postal_code: "N6C 4X5".to_string(),
            }
        );
        assert_eq!(details.address_components.len(), 5);
    }

    #[test]
    fn details_without_result_is_not_found() {
        let transport = CannedTransport::new(200, json!({ "status": "INVALID_REQUEST" }));
        let service = PlacesService::new(transport, &config(Some("key")));
        assert!(matches!(service.details("zzz"), Err(PlacesError::NotFound)));
    }

    #[test]
    fn upstream_failure_is_reported() {
        let transport = CannedTransport::new(503, json!({}));
        let service = PlacesService::new(transport, &config(Some("key")));
        assert!(matches!(
            service.details("abc"),
            Err(PlacesError::Upstream(503))
        ));
    }
}
