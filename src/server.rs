//! Router assembly and server loop.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application router: REST API, `/ws`, optional Swagger UI
/// and static files, plus tracing, CORS and timeout layers.
pub fn build_app(state: AppState) -> Router {
    #[cfg_attr(not(feature = "swagger-ui"), allow(unused_mut))]
    let mut router = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router = router.merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        );
    }

    let router = match &state.config.static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving static files");
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the relay on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns an I/O error if the server loop fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::RelayConfig;

    fn app() -> Router {
        build_app(AppState::new(RelayConfig::default()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let Ok(resp) = app().oneshot(request).await;
        let status = resp.status();
        let Ok(bytes) = axum::body::to_bytes(resp.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        let Ok(req) = Request::get(uri).body(Body::empty()) else {
            panic!("valid request");
        };
        req
    }

    #[tokio::test]
    async fn health_is_mounted_at_root() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn empty_relay_lists_no_channels() {
        let (status, body) = send(get("/api/v1/channels")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["channels"], Value::Array(Vec::new()));
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn invalid_channel_name_is_bad_request() {
        let (status, body) = send(get("/api/v1/channels/has%20space")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn malformed_publish_body_is_bad_request() {
        let Ok(req) = Request::post("/api/v1/events")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
        else {
            panic!("valid request");
        };
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn publish_to_empty_channel_reports_zero_attempts() {
        let Ok(req) = Request::post("/api/v1/events")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"channel":"programming","event":"message-in","payload":{"message":"hi"}}"#,
            ))
        else {
            panic!("valid request");
        };
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivery"]["attempted"], 0);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_without_static_dir() {
        let (status, _) = send(get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
