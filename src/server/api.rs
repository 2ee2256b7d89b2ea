use crate::auth::REALM;
use crate::publisher::{publish, PublishError};
use crate::push::{decode_push_request, DecodeError};
use crate::server::IngestState;
use crate::transform::transform;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

// API response types
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub status: &'static str,
    pub count: usize,
}

/// GET /healthz
pub async fn health_check(State(state): State<Arc<IngestState>>) -> Response {
    match state.sink.describe_stream(&state.stream_name).await {
        Ok(description) if description.status.is_active() => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                error: None,
            }),
        )
            .into_response(),
        Ok(description) => {
            let reason = format!("Delivery stream is not active: {}", description.status);
            error!(stream = %state.stream_name, status = %description.status, "{}", reason);
            degraded(reason)
        }
        Err(e) => {
            error!(stream = %state.stream_name, error = %e, "Failed to describe delivery stream");
            degraded("Failed to find delivery stream".to_string())
        }
    }
}

fn degraded(reason: String) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthResponse {
            status: "degraded",
            error: Some(reason),
        }),
    )
        .into_response()
}

/// POST /loki/api/v1/push
///
/// Credentials are checked by middleware before the body is read.
pub async fn push_logs(
    State(state): State<Arc<IngestState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PushResponse>, ApiError> {
    let content_encoding = content_encoding(&headers)?;
    let push = decode_push_request(
        &body,
        content_encoding,
        state.max_decompressed_bytes,
    )?;

    let records = transform(&push);
    if !records.is_empty() {
        publish(
            state.sink.as_ref(),
            &state.stream_name,
            &records,
            state.limits,
        )
        .await?;
    }

    Ok(Json(PushResponse {
        status: "success",
        count: records.len(),
    }))
}

fn content_encoding(headers: &HeaderMap) -> Result<Option<&str>, DecodeError> {
    headers
        .get(header::CONTENT_ENCODING)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| DecodeError::UnsupportedEncoding(format!("{:?}", value)))
        })
        .transpose()
}

// Error handling
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    InternalError(String),
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        warn!(error = %err, "Rejected push request body");
        if err.is_validation() {
            ApiError::BadRequest("Invalid request body".to_string())
        } else {
            ApiError::BadRequest("Malformed request body".to_string())
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        error!(error = %err, "Failed to publish log records");
        ApiError::InternalError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => {
                let challenge = format!("Basic realm=\"{}\"", REALM);
                let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
                return response;
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
