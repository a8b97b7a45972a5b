//! Webhook HTTP server: Slack Events API intake on a single port.

use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::events::SlackEnvelope;
use crate::gateway::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::notion::NotionClient;
use crate::slack::SlackClient;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Largest accepted event body. Larger requests are refused with 413 before the handler runs.
pub const MAX_EVENT_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct RelayState {
    pub dispatcher: Dispatcher,
    /// When Some, POST /slack/events must carry a valid Slack signature.
    pub signing_secret: Option<String>,
    pub port: u16,
}

impl RelayState {
    /// Build clients from the config struct alone; environment overrides are applied earlier by
    /// [`crate::config::load_config`]. Missing credentials are not fatal here: each dispatch
    /// reports them when it runs.
    pub fn from_config(config: &Config) -> Self {
        let slack_token = config::resolve_slack_token(config);
        let notion_token = config::resolve_notion_token(config);
        let database_id = config::resolve_notion_database_id(config);
        if slack_token.is_none() {
            log::warn!("SLACK_BOT_TOKEN is not set; reactions cannot be fetched");
        }
        if notion_token.is_none() || database_id.is_none() {
            log::warn!("NOTION_API_TOKEN or NOTION_DB_ID is not set; pages cannot be created");
        }
        let signing_secret = config::resolve_slack_signing_secret(config);
        if signing_secret.is_none() {
            log::warn!("no Slack signing secret configured; inbound requests are not verified");
        }
        let slack = SlackClient::new(slack_token, config.slack.api_base_url.clone());
        let notion = NotionClient::new(
            notion_token,
            database_id,
            config::resolve_title_property(config),
            config.notion.api_base_url.clone(),
        );
        Self {
            dispatcher: Dispatcher::new(Arc::new(slack), Arc::new(notion)),
            signing_secret,
            port: config.server.port,
        }
    }
}

/// Routes: health check and the Slack Events API endpoint.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(
            "/slack/events",
            post(slack_events).layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES)),
        )
        .with_state(state)
}

/// Bind to the configured address and serve until SIGINT/SIGTERM.
pub async fn run_server(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("server started on {}", bind_addr);
    serve(listener, config).await
}

/// Serve on an already bound listener (tests bind port 0 and pass it in).
pub async fn serve(listener: TcpListener, config: Config) -> Result<()> {
    let mut state = RelayState::from_config(&config);
    if let Ok(addr) = listener.local_addr() {
        state.port = addr.port();
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited")?;
    log::info!("server stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM. In-flight dispatch tasks are not awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST /slack/events: echoes the URL verification challenge, otherwise schedules
/// `reaction_added` events for relay and acknowledges immediately.
///
/// A body that cannot be read is rejected by the `Bytes` extractor: 413 above
/// [`MAX_EVENT_BODY_BYTES`], 400 otherwise. Invalid JSON is 400.
async fn slack_events(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(ref secret) = state.signing_secret {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let timestamp = header_str(TIMESTAMP_HEADER);
        let sig = header_str(SIGNATURE_HEADER);
        let now = chrono::Utc::now().timestamp();
        if !signature::verify_signature(secret, &timestamp, &body, &sig, now) {
            log::debug!("rejecting request with invalid slack signature");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    // The handshake must answer even if the rest of the payload has an unexpected shape.
    if let Some(challenge) = value.get("challenge").and_then(|c| c.as_str()) {
        if !challenge.is_empty() {
            return (
                [(header::CONTENT_TYPE, "text/plain")],
                challenge.to_string(),
            )
                .into_response();
        }
    }

    // A bare `null` body carries no event.
    let envelope: SlackEnvelope = if value.is_null() {
        SlackEnvelope::default()
    } else {
        match serde_json::from_value(value) {
            Ok(e) => e,
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        }
    };

    if envelope.is_reaction_added() {
        log::debug!(
            "reaction_added :{}: by {} on {} {}",
            envelope.event.reaction,
            envelope.event.user,
            envelope.event.item.channel,
            envelope.event.item.ts
        );
        state.dispatcher.spawn(envelope);
    }
    StatusCode::OK.into_response()
}

/// GET / returns a simple health JSON (for liveness checks).
async fn health_http(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
