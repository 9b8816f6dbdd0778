// server.rs - Router composition and serving

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, Environment};
use crate::handlers::{dev, public};
use crate::middleware::{authenticate, Authenticator};
use crate::routes;
use crate::services::{StoreError, Stores};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no authenticator configured (set SECURITY_JWT_SECRET)")]
    AuthenticatorMissing,

    #[error("invalid bypass pattern '{0}': {1}")]
    InvalidBypassPattern(String, #[source] regex::Error),

    #[error("the /dev gateway cannot be enabled in production")]
    DevGatewayInProduction,

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {0}: {1}")]
    Bind(String, #[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Compose the full application: authenticator, bypass list, routes, layers
pub fn build_app(config: &AppConfig, stores: Stores) -> Result<Router, StartupError> {
    let mut authenticator = Authenticator::from_config(&config.security);

    if let Some(authn) = authenticator.as_mut() {
        for pattern in public::PUBLIC_BYPASS_PATTERNS {
            authn
                .exempt(pattern)
                .map_err(|e| StartupError::InvalidBypassPattern(pattern.to_string(), e))?;
        }
    }

    if config.dev.enabled {
        if config.environment == Environment::Production {
            return Err(StartupError::DevGatewayInProduction);
        }
        dev::register_exemption(authenticator.as_mut())?;
        tracing::warn!("Development gateway enabled at {} without authentication", dev::DEV_PATH);
    }

    let authenticator = authenticator.ok_or(StartupError::AuthenticatorMissing)?;
    let state = AppState::new(config, stores);

    let mut router = routes::draw(config.dev.enabled, routes::application_routes)
        .into_router()
        .layer(from_fn_with_state(Arc::new(authenticator), authenticate))
        .layer(TraceLayer::new_for_http());

    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    Ok(router.with_state(state))
}

/// Connect the stores, compose the router and serve until shutdown
pub async fn serve(config: &AppConfig) -> Result<(), StartupError> {
    let stores = Stores::connect(&config.database).await?;
    let app = build_app(config, stores)?;

    let bind_addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| StartupError::Bind(bind_addr.clone(), e))?;

    tracing::info!("Dev gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
