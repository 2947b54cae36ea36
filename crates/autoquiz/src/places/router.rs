use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::error;

use super::{PlacesError, PlacesService};

pub fn places_router(service: Arc<PlacesService>) -> Router {
    Router::new()
        .route("/api/places/autocomplete", get(autocomplete_handler))
        .route("/api/places/details", get(details_handler))
        .with_state(service)
}

pub(crate) async fn autocomplete_handler(
    State(service): State<Arc<PlacesService>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let input = params.get("input").cloned().unwrap_or_default();
    let result =
        tokio::task::spawn_blocking(move || service.autocomplete(&input)).await;

    match result {
        Ok(Ok(suggestions)) => {
            (StatusCode::OK, axum::Json(json!({ "suggestions": suggestions }))).into_response()
        }
        Ok(Err(err)) => places_error_response(err, "Failed to fetch address suggestions"),
        Err(join) => {
            error!(error = %join, "address autocomplete task aborted");
            failure("Failed to fetch address suggestions")
        }
    }
}

pub(crate) async fn details_handler(
    State(service): State<Arc<PlacesService>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let place_id = params.get("placeId").cloned().unwrap_or_default();
    let result = tokio::task::spawn_blocking(move || service.details(&place_id)).await;

    match result {
        Ok(Ok(details)) => (StatusCode::OK, axum::Json(details)).into_response(),
        Ok(Err(err)) => places_error_response(err, "Failed to fetch place details"),
        Err(join) => {
            error!(error = %join, "place details task aborted");
            failure("Failed to fetch place details")
        }
    }
}

fn places_error_response(err: PlacesError, generic: &str) -> Response {
    match err {
        PlacesError::MissingInput(field) => {
            let message = match field {
                "placeId" => "Place ID is required".to_string(),
                _ => "Input is required".to_string(),
            };
            (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": message }))).into_response()
        }
        PlacesError::NotFound => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "Place not found" })),
        )
            .into_response(),
        PlacesError::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": "Places API key not configured" })),
        )
            .into_response(),
        other => {
            error!(error = %other, "places lookup failed");
            failure(generic)
        }
    }
}

fn failure(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacesConfig;
    use crate::http::{HttpReply, HttpTransport, OutboundRequest, TransportError};
    use tower::ServiceExt;

    #[derive(Debug)]
    struct OfflineTransport;

    impl HttpTransport for OfflineTransport {
        fn post(&self, _request: &OutboundRequest) -> Result<HttpReply, TransportError> {
            Err(TransportError::Transport {
                kind: "connection",
                message: "offline".to_string(),
            })
        }

        fn get(&self, _url: &str, _query: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
            Err(TransportError::Transport {
                kind: "connection",
                message: "offline".to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct CannedDetails;

    impl HttpTransport for CannedDetails {
        fn post(&self, _request: &OutboundRequest) -> Result<HttpReply, TransportError> {
            unreachable!("places only issues GET requests")
        }

        fn get(&self, _url: &str, _query: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
            let body = json!({
                "result": {
                    "address_components": [
                        { "long_name": "12", "short_name": "12", "types": ["street_number"] },
                        { "long_name": "King Street", "short_name": "King St", "types": ["route"] },
                        { "long_name": "Toronto", "short_name": "Toronto", "types": ["locality"] },
                        { "long_name": "Ontario", "short_name": "ON", "types": ["administrative_area_level_1"] }
                    ]
                }
            });
            Ok(HttpReply {
                status: 200,
                body: body.to_string(),
            })
        }
    }

    fn router(key: Option<&str>) -> Router {
        places_router(Arc::new(PlacesService::new(Arc::new(OfflineTransport), &config(key))))
    }

    fn config(key: Option<&str>) -> PlacesConfig {
        PlacesConfig {
            api_key: key.map(str::to_string),
            country: "ca".to_string(),
        }
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(
                axum::http::Request::get(uri)
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn missing_input_is_bad_request() {
        assert_eq!(
            status_of(router(Some("key")), "/api/places/autocomplete").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(router(Some("key")), "/api/places/details").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn unconfigured_or_unreachable_provider_is_server_error() {
        assert_eq!(
            status_of(router(None), "/api/places/autocomplete?input=1%20Main").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(router(Some("key")), "/api/places/details?placeId=abc").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn details_keep_provider_component_key() {
        let service = PlacesService::new(Arc::new(CannedDetails), &config(Some("key")));
        let response = places_router(Arc::new(service))
            .oneshot(
                axum::http::Request::get("/api/places/details?placeId=abc")
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let wire: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(wire["address_components"].as_array().map(Vec::len), Some(4));
        assert!(wire.get("addressComponents").is_none());
        assert_eq!(wire["address"]["streetAddress"], "12 King Street");
        assert_eq!(wire["address"]["province"], "ON");
    }
}
