use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::services::metrics_service::{MetricsService, SLOW_REQUEST_THRESHOLD};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP spans for every request
pub fn create_logging_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::DEBUG))
        .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::DEBUG))
}

/// Logs each request with a correlation id, echoed back as `x-request-id`.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        user_agent = %user_agent,
        "incoming request"
    );

    let mut response = next.run(request).await;

    let status = response.status();
    tracing::info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Records response times into the metrics service, keyed by route template.
pub async fn performance_middleware(
    State(metrics): State<Arc<MetricsService>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    metrics.record_request(&endpoint, &method, duration, !status.is_server_error());

    if duration > SLOW_REQUEST_THRESHOLD {
        tracing::warn!(
            method = %method,
            endpoint = %endpoint,
            duration_ms = duration.as_millis() as u64,
            status = status.as_u16(),
            "Slow request"
        );
    }

    response
}

fn parse_level(log_level: &str) -> Option<Level> {
    match log_level.trim().to_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" => Some(Level::ERROR),
        _ => None,
    }
}

/// `EnvFilter` directives: the crate at `log_level`, sqlx at `sql_log_level`.
pub fn filter_directives(log_level: &str, sql_log_level: &str) -> String {
    let level = parse_level(log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', defaulting to INFO", log_level);
        Level::INFO
    });
    let sql_level = parse_level(sql_log_level).unwrap_or(Level::WARN);
    format!(
        "aurum_backend={},tower_http=info,sqlx={}",
        level.as_str().to_lowercase(),
        sql_level.as_str().to_lowercase()
    )
}

/// Install the global subscriber. `log_format` is `json` or `plain`.
pub fn init_logging(
    log_level: &str,
    log_format: &str,
    sql_log_level: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // LOG_LEVEL from config always wins over RUST_LOG
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter_directives(log_level, sql_log_level))?;
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match log_format.to_lowercase().as_str() {
        "plain" | "text" => {
            let plain_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true);
            subscriber.with(plain_layer).try_init()?;
        }
        _ => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_thread_ids(true);
            subscriber.with(json_layer).try_init()?;
        }
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        "logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "test response"
    }

    #[tokio::test]
    async fn test_request_logging_echoes_request_id() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_logging_middleware));

        let request = Request::builder()
            .uri("/test")
            .header("user-agent", "test-agent")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let generated = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_performance_middleware_records_route_template() {
        let metrics = Arc::new(MetricsService::new());
        let app = Router::new()
            .route("/items/:id", get(test_handler))
            .layer(middleware::from_fn_with_state(
                metrics.clone(),
                performance_middleware,
            ));

        for id in ["1", "2"] {
            let request = Request::builder()
                .uri(format!("/items/{}", id))
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let recorded = metrics.get_endpoint_metrics("GET", "/items/:id").unwrap();
        assert_eq!(recorded.metrics.total_requests, 2);
        assert_eq!(metrics.get_endpoint_count(), 1);
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(
            filter_directives("INFO", "WARNING"),
            "aurum_backend=info,tower_http=info,sqlx=warn"
        );
        assert_eq!(
            filter_directives("debug", "nonsense"),
            "aurum_backend=debug,tower_http=info,sqlx=warn"
        );
        assert_eq!(
            filter_directives("bogus", "ERROR"),
            "aurum_backend=info,tower_http=info,sqlx=error"
        );
    }
}
