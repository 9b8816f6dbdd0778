// handlers/dev/accounts.rs - list_accounts, create_account, destroy_account
//
// Account lifecycle runs as the root identity.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::DevParams;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::ActingIdentity;

/// `action=list_accounts` - JSON array of account ids, as the store orders them
pub async fn list(state: &AppState) -> Result<Response, ApiError> {
    let accounts = state.stores.accounts.list(&ActingIdentity::Root).await?;
    Ok(Json(accounts).into_response())
}

/// The `id` parameter; it becomes the first segment of every role and
/// resource id in the account, so it cannot contain `:`.
fn account_id(params: &DevParams) -> Result<&str, ApiError> {
    let id = params.require("id")?;
    if id.contains(':') {
        return Err(ApiError::bad_request("malformed id"));
    }
    Ok(id)
}

/// `action=create_account&id=<account>` - 201 with the new admin API key
pub async fn create(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let id = account_id(params)?;

    let created = state.stores.accounts.create(&ActingIdentity::Root, id).await?;
    tracing::info!("Created account '{}'", created.id);

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `action=destroy_account&id=<account>` - 204
pub async fn destroy(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let id = account_id(params)?;

    state.stores.accounts.destroy(&ActingIdentity::Root, id).await?;
    tracing::info!("Destroyed account '{}'", id);

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{dispatch, DevRequest};
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> DevParams {
        DevRequest::parse(query(pairs), true).unwrap().params
    }

    #[tokio::test]
    async fn create_then_list_then_destroy() {
        let state = memory_state();

        let response = create(&state, &params(&[("action", "create_account"), ("id", "cucumber")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["id"], "cucumber");
        assert_eq!(body["api_key"].as_str().unwrap().len(), 64);

        let response = list(&state).await.unwrap();
        assert_eq!(body_string(response).await, r#"["cucumber"]"#);

        let response = destroy(&state, &params(&[("action", "destroy_account"), ("id", "cucumber")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = list(&state).await.unwrap();
        assert_eq!(body_string(response).await, "[]");
    }

    #[tokio::test]
    async fn list_returns_store_order_unfiltered() {
        let state = memory_state();
        for id in ["zeta", "alpha", "mid"] {
            dispatch(&state, query(&[("action", "create_account"), ("id", id)]))
                .await
                .unwrap();
        }

        let response = dispatch(&state, query(&[("action", "list_accounts")])).await.unwrap();
        assert_eq!(body_string(response).await, r#"["zeta","alpha","mid"]"#);
    }

    #[tokio::test]
    async fn destroying_a_missing_account_is_not_found() {
        let state = memory_state();
        let err = destroy(&state, &params(&[("action", "destroy_account"), ("id", "ghost")]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn duplicate_account_is_a_conflict() {
        let state = memory_state();
        let p = params(&[("action", "create_account"), ("id", "dup")]);
        create(&state, &p).await.unwrap();
        assert_eq!(create(&state, &p).await.unwrap_err().status_code(), 409);
    }

    #[tokio::test]
    async fn account_ids_cannot_contain_colons() {
        let state = unreachable_state();
        for action in ["create_account", "destroy_account"] {
            let err = dispatch(&state, query(&[("action", action), ("id", "a:b")]))
                .await
                .unwrap_err();
            assert!(err.is_caller_error());
            assert_eq!(err.message(), "malformed id");
        }
    }
}
