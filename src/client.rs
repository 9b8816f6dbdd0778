// client.rs - HTTP client for the /dev gateway
//
// Used by the `devctl` binary and by the integration tests to seed accounts
// and secrets.

use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::services::{CreatedAccount, PurgeSummary};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Gateway { status: StatusCode, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Gateway { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DevClient {
    http: reqwest::Client,
    dev_url: Url,
}

impl DevClient {
    /// `base_url` is the service root; the gateway is resolved relative to it
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            dev_url: base.join("dev")?,
        })
    }

    /// Gateway URL for `action` with `params` encoded into the query string
    pub fn url_for(&self, action: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.dev_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("action", action);
        }
        url
    }

    /// Raw call: status and body text, whatever the outcome
    pub async fn call(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<(StatusCode, String), ClientError> {
        let reply = self.send(action, params).await?;
        Ok((reply.status, reply.body))
    }

    async fn send(&self, action: &str, params: &[(&str, &str)]) -> Result<Reply, ClientError> {
        let url = self.url_for(action, params);
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let body = response.text().await?;

        Ok(Reply { status, json, body })
    }

    async fn request(&self, action: &str, params: &[(&str, &str)]) -> Result<String, ClientError> {
        self.send(action, params).await?.check()
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let body = self.request(action, params).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_accounts(&self) -> Result<Vec<String>, ClientError> {
        self.request_json("list_accounts", &[]).await
    }

    pub async fn create_account(&self, id: &str) -> Result<CreatedAccount, ClientError> {
        self.request_json("create_account", &[("id", id)]).await
    }

    pub async fn destroy_account(&self, id: &str) -> Result<(), ClientError> {
        self.request("destroy_account", &[("id", id)]).await.map(drop)
    }

    pub async fn retrieve_api_key(&self, role_id: &str) -> Result<String, ClientError> {
        self.request("retrieve_api_key", &[("role_id", role_id)]).await
    }

    pub async fn get_secret(
        &self,
        resource_id: &str,
        version: Option<u32>,
    ) -> Result<String, ClientError> {
        match version {
            Some(v) => {
                let v = v.to_string();
                self.request("get_secret", &[("resource_id", resource_id), ("version", v.as_str())])
                    .await
            }
            None => self.request("get_secret", &[("resource_id", resource_id)]).await,
        }
    }

    pub async fn create_secret(&self, resource_id: &str, value: &str) -> Result<(), ClientError> {
        self.request("create_secret", &[("resource_id", resource_id), ("value", value)])
            .await
            .map(drop)
    }

    pub async fn load_policy(&self, resource_id: &str, policy: &str) -> Result<(), ClientError> {
        self.request("load_policy", &[("resource_id", resource_id), ("value", policy)])
            .await
            .map(drop)
    }

    pub async fn purge(&self) -> Result<PurgeSummary, ClientError> {
        self.request_json("purge", &[]).await
    }
}

/// One gateway response
struct Reply {
    status: StatusCode,
    /// `application/json` body; plain-text values (API keys, secrets) never carry errors
    json: bool,
    body: String,
}

impl Reply {
    /// Turn both error renderings into `ClientError::Gateway`: non-2xx statuses,
    /// and legacy-mode `200 {"error": "..."}` JSON bodies.
    fn check(self) -> Result<String, ClientError> {
        let Reply { status, json, body } = self;
        if !status.is_success() {
            return Err(ClientError::Gateway {
                status,
                message: error_message(&body).unwrap_or(body),
            });
        }

        if json {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&body) {
                if let Some(Value::String(message)) = map.get("error") {
                    return Err(ClientError::Gateway {
                        status,
                        message: message.clone(),
                    });
                }
            }
        }

        Ok(body)
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
