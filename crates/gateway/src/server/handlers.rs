//! Axum request handlers for all service endpoints.

use attr_crypt::ConvertError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    DecodeRequest, DecodeResponse, EncodeRequest, EncodeResponse, ErrorResponse, FormatInfo,
    HealthResponse,
};
use common::ServiceError;
use tracing::warn;

use super::state::AppState;

/// `POST /encode`: encode an attribute value for storage.
///
/// Uses the format named in the request, or the configured encode format.
pub async fn encode(State(state): State<AppState>, Json(req): Json<EncodeRequest>) -> Response {
    let result = match (&req.format, &req.value) {
        (Some(tag), Some(value)) => state.converter.encode_with(value, tag).map(Some),
        (Some(tag), None) => match state.registry().lookup_by_tag(tag) {
            Some(_) => Ok(None),
            None => Err(ConvertError::UnknownFormat(tag.clone())),
        },
        (None, value) => state.converter.encode_for_storage(value.as_ref()),
    };

    match result {
        Ok(stored) => (StatusCode::OK, Json(EncodeResponse { stored })).into_response(),
        Err(e) => {
            warn!(error = %e, "encode failed");
            error_response(&e)
        }
    }
}

/// `POST /decode`: decode a stored string back to the attribute value.
pub async fn decode(State(state): State<AppState>, Json(req): Json<DecodeRequest>) -> Response {
    match state.converter.decode_from_storage(req.stored.as_deref()) {
        Ok(value) => (StatusCode::OK, Json(DecodeResponse { value })).into_response(),
        Err(e) => {
            warn!(error = %e, "decode failed");
            error_response(&e)
        }
    }
}

/// `GET /formats`: the registered format catalog.
pub async fn formats(State(state): State<AppState>) -> Json<Vec<FormatInfo>> {
    let body = state
        .registry()
        .formats()
        .map(|f| FormatInfo {
            name: f.name().to_owned(),
            tag: f.tag().to_owned(),
            algorithm: f.algorithm().map(|a| a.id().to_owned()),
            key_size_bits: f.key_size_bits(),
            degraded: f.is_degraded(),
            default: f.tag() == state.encode_tag.as_str(),
        })
        .collect();
    Json(body)
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` when every registered format has its key material.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let registry = state.registry();
    let formats_degraded = registry.degraded_count();
    let formats_ready = registry.formats().count() - formats_degraded;

    let (status_code, status_str) = if formats_degraded == 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        formats_ready,
        formats_degraded,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: &ConvertError) -> Response {
    let err = ServiceError::from(err);
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.to_response())).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use attr_crypt::{FormatRegistry, Iv, SecretError, SecretKey, SecretProvider};
    use axum::routing::{get, post};
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/encode", post(encode))
            .route("/decode", post(decode))
            .route("/formats", get(formats))
            .route("/health", get(health))
            .with_state(state)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Provider whose keystore is down.
    struct OfflineProvider;

    impl SecretProvider for OfflineProvider {
        fn key(&self, alias: &str, _bits: usize) -> Result<SecretKey, SecretError> {
            Err(SecretError::KeyUnavailable {
                alias: alias.into(),
                reason: "offline".into(),
            })
        }

        fn iv(&self, _alias: &str) -> Result<Iv, SecretError> {
            Ok(Iv::from_bytes(vec![0u8; 16]))
        }
    }

    fn degraded_state() -> AppState {
        AppState::new(Arc::new(FormatRegistry::builtin(&OfflineProvider)), "BASE64".into())
    }

    #[tokio::test]
    async fn encode_uses_default_format() {
        let app = test_router(AppState::default());
        let (status, body) = post_json(app, "/encode", json!({"value": "hello"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stored"], "BASE64:aGVsbG8=");
    }

    #[tokio::test]
    async fn encode_null_is_null() {
        let app = test_router(AppState::default());
        let (status, body) = post_json(app, "/encode", json!({"value": null})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["stored"].is_null());
    }

    #[tokio::test]
    async fn encode_with_explicit_aes_round_trips() {
        let state = AppState::default();
        let (status, body) = post_json(
            test_router(state.clone()),
            "/encode",
            json!({"value": "123-45-6789", "format": "AES1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let stored = body["stored"].as_str().unwrap().to_owned();
        assert!(stored.starts_with("AES1:"));
        assert!(!stored.contains("123-45-6789"));

        let (status, body) =
            post_json(test_router(state), "/decode", json!({"stored": stored})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], "123-45-6789");
    }

    #[tokio::test]
    async fn encode_with_pinned_format() {
        let registry = Arc::new(FormatRegistry::builtin(&attr_crypt::EphemeralSecretProvider));
        let app = test_router(AppState::new(registry, "AES1".into()));
        let (_, body) = post_json(app, "/encode", json!({"value": "x"})).await;
        assert!(body["stored"].as_str().unwrap().starts_with("AES1:"));
    }

    #[tokio::test]
    async fn encode_unknown_format_is_400() {
        let app = test_router(AppState::default());
        let (status, body) =
            post_json(app, "/encode", json!({"value": "x", "format": "ZZZZ"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn encode_null_with_unknown_format_is_400() {
        let app = test_router(AppState::default());
        let (status, _) = post_json(app, "/encode", json!({"value": null, "format": "ZZZZ"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn decode_unknown_tag_is_400() {
        let app = test_router(AppState::default());
        let (status, body) = post_json(app, "/decode", json!({"stored": "ZZZZ:abcd"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("ZZZZ"));
    }

    #[tokio::test]
    async fn decode_empty_payload() {
        let app = test_router(AppState::default());
        let (status, body) = post_json(app, "/decode", json!({"stored": "BASE64:"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], "");
    }

    #[tokio::test]
    async fn decode_forged_aes_payload_is_500_without_detail() {
        let app = test_router(AppState::default());
        let (status, body) =
            post_json(app, "/decode", json!({"stored": format!("AES1:{}", "A".repeat(64))})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "crypto operation failed");
    }

    #[tokio::test]
    async fn decode_untagged_value_does_not_echo_it() {
        let app = test_router(AppState::default());
        let (status, body) = post_json(app, "/decode", json!({"stored": "123-45-6789"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["message"].as_str().unwrap().contains("123-45-6789"));
    }

    #[tokio::test]
    async fn degraded_format_is_503() {
        let app = test_router(degraded_state());
        let (status, body) =
            post_json(app, "/encode", json!({"value": "x", "format": "AES1"})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "service_unavailable");
    }

    #[tokio::test]
    async fn formats_lists_catalog() {
        let app = test_router(AppState::default());
        let (status, body) = get_json(app, "/formats").await;
        assert_eq!(status, StatusCode::OK);
        let formats = body.as_array().unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0]["tag"], "BASE64");
        assert_eq!(formats[0]["default"], true);
        assert!(formats[0]["algorithm"].is_null());
        assert_eq!(formats[1]["tag"], "AES1");
        assert_eq!(formats[1]["algorithm"], "AES/CBC/PKCS7Padding");
        assert_eq!(formats[1]["key_size_bits"], 256);
        assert_eq!(formats[1]["default"], false);
    }

    #[tokio::test]
    async fn health_ok_when_all_formats_ready() {
        let app = test_router(AppState::default());
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["formats_ready"], 2);
    }

    #[tokio::test]
    async fn health_returns_503_when_degraded() {
        let app = test_router(degraded_state());
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["formats_degraded"], 1);
    }
}
