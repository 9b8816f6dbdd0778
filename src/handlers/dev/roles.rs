// handlers/dev/roles.rs - retrieve_api_key

use axum::response::{IntoResponse, Response};

use super::DevParams;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::RoleId;

/// `action=retrieve_api_key&role_id=<account>:<kind>:<id>` - the key as plain text.
///
/// A direct lookup; no identity is involved.
pub async fn retrieve_api_key(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let role_id: RoleId = params
        .require("role_id")?
        .parse()
        .map_err(|_| ApiError::bad_request("malformed role_id"))?;

    let role = state
        .stores
        .roles
        .find_by_id(&role_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("role '{}' not found", role_id)))?;

    Ok(role.api_key.into_response())
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use super::super::testing::*;
    use axum::http::{header, StatusCode};

    #[tokio::test]
    async fn returns_the_admin_key_as_plain_text() {
        let state = memory_state();
        let created = dispatch(&state, query(&[("action", "create_account"), ("id", "cucumber")]))
            .await
            .unwrap();
        let created: serde_json::Value =
            serde_json::from_str(&body_string(created).await).unwrap();

        let response = dispatch(
            &state,
            query(&[("action", "retrieve_api_key"), ("role_id", "cucumber:user:admin")]),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_string(response).await, created["api_key"].as_str().unwrap());
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let state = memory_state();
        let err = match dispatch(
            &state,
            query(&[("action", "retrieve_api_key"), ("role_id", "cucumber:user:alice")]),
        )
        .await
        {
            Ok(_) => panic!("missing role was found"),
            Err(err) => err,
        };
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_caller_error());
    }
}
