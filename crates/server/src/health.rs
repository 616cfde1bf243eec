use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use leadvox_agent::context::ContextStore;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    store: Arc<ContextStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub detail: String,
    pub active_conversations: usize,
    pub checked_at: String,
}

pub fn router(store: Arc<ContextStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn spawn(bind_address: &str, port: u16, store: Arc<ContextStore>) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(store)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    // Counting active conversations doubles as a TTL sweep.
    let active_conversations = state.store.active_count();

    let payload = HealthResponse {
        status: "ready",
        detail: "leadvox-server runtime initialized".to_string(),
        active_conversations,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use leadvox_agent::context::ContextStore;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_ready_with_conversation_count() {
        let store = Arc::new(ContextStore::from_ttl_minutes(120));
        store.note_lead(1, 42, None);
        store.note_lead(2, 7, None);

        let (status, Json(payload)) = health(State(HealthState { store })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.active_conversations, 2);
    }
}
