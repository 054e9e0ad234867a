use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::command::parse_command;
use crate::config::Config;
use crate::handlers;
use crate::store::RecordStore;
use crate::whatsapp::{parse_webhook_payload, Gateway, InboundMessage};

/// Shared application state: read-only configuration plus the two external
/// collaborators, injected so tests can substitute doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub gateway: Arc<dyn Gateway>,
}

#[derive(Serialize)]
struct WebhookResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(handle_webhook))
        .with_state(state)
}

/// Bind the configured port and serve until shutdown.
pub async fn run(state: AppState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

/// WhatsApp Cloud API subscription handshake: echo `hub.challenge` when the
/// verify token matches, 403 otherwise.
async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match verification_challenge(&params, &state.config.whatsapp.verify_token) {
        Some(challenge) => challenge.into_response(),
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

fn verification_challenge(
    params: &HashMap<String, String>,
    verify_token: &str,
) -> Option<String> {
    if params.get("hub.mode").map(String::as_str) != Some("subscribe") {
        return None;
    }
    if params.get("hub.verify_token").map(String::as_str) != Some(verify_token) {
        return None;
    }
    params.get("hub.challenge").cloned()
}

/// One webhook invocation yields exactly one of two outcomes: a success
/// acknowledgment, or an error acknowledgment with a message. Every failure
/// in the parse-dispatch-send pipeline converges here; nothing is retried.
async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<WebhookResponse>) {
    if state.config.server.debug {
        debug!("Webhook payload: {}", payload);
    }

    match process_webhook(&state, &payload).await {
        Ok(()) => (
            StatusCode::OK,
            Json(WebhookResponse {
                status: "success",
                message: None,
            }),
        ),
        Err(e) => {
            error!("Webhook processing failed: {:#}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    status: "error",
                    message: Some(format!("{e:#}")),
                }),
            )
        }
    }
}

async fn process_webhook(state: &AppState, payload: &serde_json::Value) -> Result<()> {
    let Some(message) = parse_webhook_payload(payload)? else {
        // delivery/read-status callbacks carry no user message
        return Ok(());
    };

    log_message(&message);

    let (keyword, args) = parse_command(&message)?;
    let reply = handlers::dispatch(state, &keyword, args).await?;
    state.gateway.send(&message.from_number, &reply).await?;
    Ok(())
}

/// Best-effort inbound logging. A tracing event cannot fail, so this can
/// never abort request processing.
fn log_message(message: &InboundMessage) {
    info!(
        from = %message.from_number,
        at = %message.received_at,
        has_media = message.media_url.is_some(),
        "Incoming message: {}",
        message.text
    );
}
