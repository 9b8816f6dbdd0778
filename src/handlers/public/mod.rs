// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None (paths are on the authenticator's bypass list)
// Routes: / and /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Bypass patterns for the public routes
pub const PUBLIC_BYPASS_PATTERNS: &[&str] = &["^/$", "^/health$"];

/// GET / - service information
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Dev Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "whoami": "/api/auth/whoami (protected)",
            "dev": "/dev?action=<tag> (development only, unauthenticated)",
        }
    }))
}

/// GET /health - store connectivity; 503 while the store is unreachable
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.stores.accounts.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "store": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                })),
            )
        }
    }
}
