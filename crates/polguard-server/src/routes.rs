//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use polguard_core::ModelKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/classify", post(classify))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .fallback(fallback)
        // Enforced by the `Json` extractor so oversized bodies get a JSON 413
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Classification request. Both fields are required by policy; absent,
/// `null` and empty strings are all rejected by [`ClassifyRequest::validate`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClassifyRequest {
    #[serde(rename = "type", default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ClassifyRequest {
    /// Check fields in the order: text, type, type validity
    pub fn validate(self) -> Result<(ModelKind, String), ApiError> {
        let text = self
            .text
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingText)?;
        let model_type = self
            .model_type
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingModelType)?;
        let kind = model_type
            .parse::<ModelKind>()
            .map_err(|_| ApiError::InvalidModelType)?;
        Ok((kind, text))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub predicted_class: u8,
}

async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let result = handle_classify(&state, payload).await;

    if let Err(err) = &result {
        metrics::counter!("polguard_errors_total", "kind" => err.kind()).increment(1);
    }

    result
}

async fn handle_classify(
    state: &AppState,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from)?;
    let (kind, text) = request.validate()?;
    debug!("Classification request for model: {}", kind);

    match state.engine.classify(kind, text).await {
        Ok(prediction) => {
            let outcome = if prediction.is_positive() { "positive" } else { "negative" };
            metrics::counter!("polguard_requests_total", "model" => kind.as_str(), "outcome" => outcome)
                .increment(1);

            Ok(Json(ClassifyResponse {
                predicted_class: prediction.predicted_class,
            }))
        }
        Err(e) => {
            error!("Inference failed for model {}: {}", kind, e);
            metrics::counter!("polguard_requests_total", "model" => kind.as_str(), "outcome" => "error")
                .increment(1);
            Err(ApiError::Inference)
        }
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "models": state.engine.registry().model_kinds(),
    }))
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No text provided")]
    MissingText,

    #[error("No model type provided")]
    MissingModelType,

    #[error("Invalid model type")]
    InvalidModelType,

    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Request body too large")]
    PayloadTooLarge,

    /// Details are logged, never returned to the caller
    #[error("Internal server error")]
    Inference,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingText
            | ApiError::MissingModelType
            | ApiError::InvalidModelType
            | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Inference => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingText => "missing_text",
            ApiError::MissingModelType => "missing_model_type",
            ApiError::InvalidModelType => "invalid_model_type",
            ApiError::InvalidBody => "invalid_body",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::Inference => "inference",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::InvalidBody
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model_type: Option<&str>, text: Option<&str>) -> ClassifyRequest {
        ClassifyRequest {
            model_type: model_type.map(str::to_string),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_text_checked_before_type() {
        let err = request(None, None).validate().unwrap_err();
        assert!(matches!(err, ApiError::MissingText));

        let err = request(Some("unknown"), Some("")).validate().unwrap_err();
        assert!(matches!(err, ApiError::MissingText));
    }

    #[test]
    fn test_missing_or_empty_type() {
        let err = request(None, Some("hello")).validate().unwrap_err();
        assert!(matches!(err, ApiError::MissingModelType));

        let err = request(Some(""), Some("hello")).validate().unwrap_err();
        assert!(matches!(err, ApiError::MissingModelType));
    }

    #[test]
    fn test_invalid_type() {
        let err = request(Some("sentiment"), Some("x")).validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidModelType));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_valid_request() {
        let (kind, text) = request(Some("fake_news"), Some("czlowiek to koks"))
            .validate()
            .unwrap();
        assert_eq!(kind, ModelKind::FakeNews);
        assert_eq!(text, "czlowiek to koks");
    }

    #[test]
    fn test_request_wire_format() {
        let req: ClassifyRequest =
            serde_json::from_str(r#"{"type": "hate_speech", "text": "hej"}"#).unwrap();
        assert_eq!(req.model_type.as_deref(), Some("hate_speech"));

        let req: ClassifyRequest = serde_json::from_str(r#"{"type": null}"#).unwrap();
        assert!(req.model_type.is_none());
        assert!(req.text.is_none());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ApiError::MissingText.to_string(), "No text provided");
        assert_eq!(ApiError::MissingModelType.to_string(), "No model type provided");
        assert_eq!(ApiError::InvalidModelType.to_string(), "Invalid model type");
        assert_eq!(ApiError::Inference.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
