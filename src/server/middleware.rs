use crate::auth::BasicCredentials;
use crate::server::api::ApiError;
use crate::server::IngestState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Reject requests without valid HTTP Basic credentials.
///
/// The response never says which part of the credentials was wrong.
pub async fn require_basic_auth(
    State(state): State<Arc<IngestState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(BasicCredentials::from_header)
        .map(|supplied| state.credentials.verify(&supplied))
        .unwrap_or(false);

    if !authorized {
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// Log each request on entry and on completion, inside a per-request span.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let span = info_span!("request", request_id = %Uuid::new_v4());

    async move {
        info!("{} {}", method, path);
        let start = Instant::now();

        let response = next.run(request).await;

        let status = response.status();
        let elapsed = humanize_duration(start.elapsed());
        if status.is_server_error() {
            error!("{} {} {} {}", method, path, status.as_u16(), elapsed);
        } else if status.is_client_error() {
            warn!("{} {} {} {}", method, path, status.as_u16(), elapsed);
        } else {
            info!("{} {} {} {}", method, path, status.as_u16(), elapsed);
        }

        response
    }
    .instrument(span)
    .await
}

/// `950ms` below one second, whole seconds above, with thousands separators.
pub fn humanize_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        let secs = (millis + 500) / 1000;
        format!("{}s", group_thousands(secs))
    }
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_request_log_keeps_query_string() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn(log_requests));

        let response = app
            .oneshot(
                axum::http::Request::get("/ping?tenant=edge&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(logs_contain("GET /ping?tenant=edge&limit=5 200"));
    }

    #[test]
    fn test_humanize_millis() {
        assert_eq!(humanize_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(humanize_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn test_humanize_seconds_rounds() {
        assert_eq!(humanize_duration(Duration::from_millis(1000)), "1s");
        assert_eq!(humanize_duration(Duration::from_millis(1499)), "1s");
        assert_eq!(humanize_duration(Duration::from_millis(1500)), "2s");
    }

    #[test]
    fn test_humanize_groups_thousands() {
        assert_eq!(humanize_duration(Duration::from_secs(1_234_567)), "1,234,567s");
        assert_eq!(group_thousands(100), "100");
        assert_eq!(group_thousands(1000), "1,000");
    }
}
