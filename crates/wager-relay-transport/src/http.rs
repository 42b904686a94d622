//! HTTP control surface.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wager_relay_core::TenantId;
use wager_relay_session::{ControllerError, SessionController};

use crate::protocol::{BOT_DISCONNECTED, BOT_STARTED, ControlRequest, ControlResponse, HealthResponse};

type Reply = (StatusCode, Json<ControlResponse>);

fn reply(status: StatusCode, body: ControlResponse) -> Reply {
    (status, Json(body))
}

/// Pull the tenant out of a control body, or answer 400.
fn tenant_from(body: Result<Json<ControlRequest>, JsonRejection>) -> Result<TenantId, Reply> {
    body.ok()
        .and_then(|Json(req)| req.tenant().ok())
        .ok_or_else(|| {
            reply(
                StatusCode::BAD_REQUEST,
                ControlResponse::error("Bot token is required"),
            )
        })
}

async fn start_bot(
    State(controller): State<Arc<SessionController>>,
    body: Result<Json<ControlRequest>, JsonRejection>,
) -> Reply {
    let tenant = match tenant_from(body) {
        Ok(tenant) => tenant,
        Err(rejected) => return rejected,
    };

    match controller.create_and_start(tenant.clone()).await {
        Ok(()) => reply(StatusCode::OK, ControlResponse::message(BOT_STARTED)),
        Err(e) => {
            tracing::error!(tenant = %tenant, error = %e, "start_bot failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ControlResponse::error(e.to_string()),
            )
        }
    }
}

async fn disconnect_bot(
    State(controller): State<Arc<SessionController>>,
    body: Result<Json<ControlRequest>, JsonRejection>,
) -> Reply {
    let tenant = match tenant_from(body) {
        Ok(tenant) => tenant,
        Err(rejected) => return rejected,
    };

    match controller.disconnect(&tenant).await {
        Ok(()) => reply(StatusCode::OK, ControlResponse::message(BOT_DISCONNECTED)),
        Err(e @ ControllerError::NotFound) => {
            reply(StatusCode::NOT_FOUND, ControlResponse::error(e.to_string()))
        }
        Err(e) => {
            tracing::error!(tenant = %tenant, error = %e, "disconnect_bot failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ControlResponse::error(e.to_string()),
            )
        }
    }
}

async fn health(State(controller): State<Arc<SessionController>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: controller.connection_count().await,
        running: controller.running_count().await,
    })
}

/// Create the control router.
///
/// # Example
/// ```ignore
/// let app = control_router(controller);
/// axum::serve(listener, app).await?;
/// ```
#[must_use]
pub fn control_router(controller: Arc<SessionController>) -> Router {
    Router::new()
        .route("/start_bot", post(start_bot))
        .route("/disconnect_bot", post(disconnect_bot))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tower::ServiceExt;
    use wager_relay_core::{
        ActionProfile, ActionResult, ChatId, IncomingCommand, WagerPayload,
        traits::{ActionClient, ActionError, ConnectError, Connector, Messenger, NotifyError},
    };
    use wager_relay_session::{
        RunnerContext, RunnerSettings, SessionRegistry, storage::MemoryResultLog,
    };

    use super::*;

    struct IdleClient;

    #[async_trait]
    impl ActionClient for IdleClient {
        async fn perform(&self, _payload: &WagerPayload) -> Result<ActionResult, ActionError> {
            std::future::pending().await
        }
    }

    struct SilentMessenger;

    #[async_trait]
    impl Messenger for SilentMessenger {
        async fn send_message(&self, _chat_id: ChatId, _text: &str) -> Result<(), NotifyError> {
            Ok(())
        }

        async fn shutdown(&self) {}
    }

    /// Accepts every token except `bad`.
    struct PickyConnector;

    #[async_trait]
    impl Connector for PickyConnector {
        async fn connect(
            &self,
            tenant: &TenantId,
            _commands: mpsc::Sender<IncomingCommand>,
        ) -> Result<Arc<dyn Messenger>, ConnectError> {
            if tenant.as_str() == "bad" {
                return Err(ConnectError::InvalidToken("Unauthorized".to_string()));
            }
            Ok(Arc::new(SilentMessenger))
        }
    }

    fn app() -> (Router, Arc<SessionController>) {
        let ctx = RunnerContext {
            profile: Arc::new(
                ActionProfile::new("http://dice.test/action", vec![WagerPayload::default()]).unwrap(),
            ),
            client: Arc::new(IdleClient),
            log: Arc::new(MemoryResultLog::new()),
            registry: Arc::new(SessionRegistry::new()),
            settings: RunnerSettings::default(),
        };
        let controller = SessionController::new(ctx, Arc::new(PickyConnector));
        (control_router(Arc::clone(&controller)), controller)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header("content-type", "application/json");
        }
        let req = req
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_start_bot_requires_token() {
        let (app, _) = app();
        for body in [Some("{}"), Some(r#"{"bot_token": ""}"#), Some("not json"), None] {
            let (status, json) = call(&app, "POST", "/start_bot", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json, json!({ "error": "Bot token is required" }));
        }
    }

    #[tokio::test]
    async fn test_start_bot_connects() {
        let (app, controller) = app();
        let (status, json) = call(&app, "POST", "/start_bot", Some(r#"{"bot_token":"good"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "message": "Bot started successfully!" }));
        assert_eq!(controller.connection_count().await, 1);

        // Starting again replaces the connection instead of failing.
        let (status, _) = call(&app, "POST", "/start_bot", Some(r#"{"bot_token":"good"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(controller.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_start_bot_construction_error_is_500() {
        let (app, controller) = app();
        let (status, json) = call(&app, "POST", "/start_bot", Some(r#"{"bot_token":"bad"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "error": "Invalid bot token: Unauthorized" }));
        assert_eq!(controller.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_bot_then_not_found() {
        let (app, controller) = app();
        call(&app, "POST", "/start_bot", Some(r#"{"bot_token":"good"}"#)).await;
        let tenant = TenantId::parse("good").unwrap();
        controller.start(&tenant, ChatId(9)).await.unwrap();

        let (status, json) = call(&app, "POST", "/disconnect_bot", Some(r#"{"bot_token":"good"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "message": "Bot disconnected successfully!" }));
        assert!(controller.registry().is_empty().await);

        let (status, json) = call(&app, "POST", "/disconnect_bot", Some(r#"{"bot_token":"good"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, json!({ "error": "No active bot found with this token" }));

        let (status, _) = call(&app, "POST", "/disconnect_bot", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let (app, controller) = app();
        call(&app, "POST", "/start_bot", Some(r#"{"bot_token":"good"}"#)).await;
        controller
            .start(&TenantId::parse("good").unwrap(), ChatId(1))
            .await
            .unwrap();

        let (status, json) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "status": "ok", "connections": 1, "running": 1 }));
    }
}
