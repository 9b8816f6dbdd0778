use tracing_subscriber::EnvFilter;

use dev_gateway::{config, server};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting dev gateway in {:?} mode", config.environment);

    if let Err(e) = server::serve(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
