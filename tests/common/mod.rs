#![allow(dead_code)]

use anyhow::Result;
use tokio::task::JoinHandle;

use dev_gateway::client::DevClient;
use dev_gateway::config::AppConfig;
use dev_gateway::server::build_app;
use dev_gateway::services::Stores;

/// A gateway served in-process on an ephemeral port, backed by the memory store
pub struct TestServer {
    pub base_url: String,
    pub client: DevClient,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_server() -> Result<TestServer> {
    start_server_with(AppConfig::development()).await
}

pub async fn start_server_with(config: AppConfig) -> Result<TestServer> {
    let app = build_app(&config, Stores::memory())?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let base_url = format!("http://{}", addr);
    let client = DevClient::new(&base_url)?;

    Ok(TestServer {
        base_url,
        client,
        handle,
    })
}
