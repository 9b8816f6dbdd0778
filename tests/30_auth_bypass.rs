mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use dev_gateway::auth::{generate_jwt, Claims};
use dev_gateway::config::{AppConfig, ErrorMode};
use dev_gateway::types::RoleId;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::start_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "ok");
    Ok(())
}

#[tokio::test]
async fn dev_needs_no_credentials_but_the_api_does() -> Result<()> {
    let server = common::start_server().await?;
    let http = reqwest::Client::new();

    let res = http.get(server.url("/dev?action=list_accounts")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, serde_json::json!([]));

    let res = http.get(server.url("/api/auth/whoami")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let config = AppConfig::development();
    let role = RoleId::new("cucumber", "user", "alice");
    let token = generate_jwt(&Claims::new(&role, 1), &config.security.jwt_secret)?;
    let res = http
        .get(server.url("/api/auth/whoami"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["role_id"], "cucumber:user:alice");
    assert_eq!(body["account"], "cucumber");
    Ok(())
}

#[tokio::test]
async fn forged_token_is_rejected() -> Result<()> {
    let server = common::start_server().await?;

    let role = RoleId::new("cucumber", "user", "alice");
    let token = generate_jwt(&Claims::new(&role, 1), "some-other-secret")?;
    let res = reqwest::Client::new()
        .get(server.url("/api/auth/whoami"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn only_the_exact_dev_path_is_routed() -> Result<()> {
    let server = common::start_server().await?;

    let res = reqwest::get(server.url("/dev.json?action=list_accounts")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = reqwest::Client::new()
        .post(server.url("/dev?action=list_accounts"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn disabled_gateway_is_absent() -> Result<()> {
    let mut config = AppConfig::development();
    config.dev.enabled = false;
    let server = common::start_server_with(config).await?;

    let res = reqwest::get(server.url("/dev?action=list_accounts")).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn legacy_mode_answers_caller_errors_with_200() -> Result<()> {
    let mut config = AppConfig::development();
    config.dev.error_mode = ErrorMode::Legacy;
    let server = common::start_server_with(config).await?;

    let (status, body) = server.client.call("bogus", &[]).await?;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body)?;
    assert_eq!(body, serde_json::json!({ "error": "action not recognized" }));

    // Collaborator failures keep their status
    let (status, _) = server.client.call("destroy_account", &[("id", "ghost")]).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The client surfaces the soft error all the same
    let err = server
        .client
        .create_secret("cucumber:variable", "v")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("malformed resource_id"));
    Ok(())
}

#[tokio::test]
async fn purge_can_be_disabled() -> Result<()> {
    let mut config = AppConfig::development();
    config.dev.allow_purge = false;
    let server = common::start_server_with(config).await?;
    server.client.create_account("cucumber").await?;

    let err = server.client.purge().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(server.client.list_accounts().await?, vec!["cucumber"]);
    Ok(())
}
