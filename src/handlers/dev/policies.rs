// handlers/dev/policies.rs - load_policy
//
// The document is kept as a new version of the policy resource, and every
// `!user`/`!host` it declares gets a role with an API key. Both run as the
// account's admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::DevParams;
use crate::error::ApiError;
use crate::policy::declared_roles;
use crate::state::AppState;
use crate::types::ActingIdentity;

/// `action=load_policy&resource_id=<account>:policy:<id>&value=<yaml>` - 201, empty body.
///
/// The document may also be passed as `policy`; `value` wins when both are set.
pub async fn load(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let resource = params.resource()?;
    let document = match params.get("value") {
        Some(value) => value,
        None => params
            .get("policy")
            .ok_or_else(|| ApiError::bad_request("value required"))?,
    };

    let roles = declared_roles(resource, document).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let actor = ActingIdentity::admin_of(&resource.account);
    state.stores.secrets.create(&actor, resource, document).await?;
    for role_id in &roles {
        state.stores.roles.provision(&actor, role_id).await?;
    }

    tracing::info!("Loaded policy '{}' with {} role(s) as {}", resource, roles.len(), actor);
    Ok(StatusCode::CREATED.into_response())
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use super::super::testing::*;
    use super::*;

    async fn state_with_account(account: &str) -> AppState {
        let state = memory_state();
        dispatch(&state, query(&[("action", "create_account"), ("id", account)]))
            .await
            .unwrap();
        state
    }

    async fn api_key(state: &AppState, role_id: &str) -> Result<String, ApiError> {
        let response = dispatch(state, query(&[("action", "retrieve_api_key"), ("role_id", role_id)]))
            .await?;
        Ok(body_string(response).await)
    }

    async fn get_secret(state: &AppState, resource_id: &str) -> String {
        let response = dispatch(state, query(&[("action", "get_secret"), ("resource_id", resource_id)]))
            .await
            .unwrap();
        body_string(response).await
    }

    #[tokio::test]
    async fn declared_roles_get_api_keys() {
        let state = state_with_account("cucumber").await;

        let response = dispatch(
            &state,
            query(&[
                ("action", "load_policy"),
                ("resource_id", "cucumber:policy:root"),
                ("policy", "- !variable meow\n- !user alice\n- !host bob\n"),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let alice = api_key(&state, "cucumber:user:alice").await.unwrap();
        let bob = api_key(&state, "cucumber:host:bob").await.unwrap();
        assert_eq!(alice.len(), 64);
        assert_ne!(alice, bob);

        // Reloading keeps the keys already handed out
        dispatch(
            &state,
            query(&[
                ("action", "load_policy"),
                ("resource_id", "cucumber:policy:root"),
                ("value", "- !user alice\n- !user carol\n"),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(api_key(&state, "cucumber:user:alice").await.unwrap(), alice);
        assert!(api_key(&state, "cucumber:user:carol").await.is_ok());
        assert_eq!(
            api_key(&state, "cucumber:user:dave").await.unwrap_err().status_code(),
            404
        );
    }

    #[tokio::test]
    async fn document_is_stored_as_the_policy_value() {
        let state = state_with_account("cucumber").await;
        let policy = "- !variable meow\n- !user alice\n";

        dispatch(
            &state,
            query(&[
                ("action", "load_policy"),
                ("resource_id", "cucumber:policy:root"),
                ("policy", policy),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(get_secret(&state, "cucumber:policy:root").await, policy);
    }

    #[tokio::test]
    async fn value_wins_over_policy() {
        let state = state_with_account("cucumber").await;
        dispatch(
            &state,
            query(&[
                ("action", "load_policy"),
                ("resource_id", "cucumber:policy:root"),
                ("policy", "- !user ignored"),
                ("value", "- !user used"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(get_secret(&state, "cucumber:policy:root").await, "- !user used");
        assert!(api_key(&state, "cucumber:user:used").await.is_ok());
        assert!(api_key(&state, "cucumber:user:ignored").await.is_err());
    }

    #[tokio::test]
    async fn invalid_documents_change_nothing() {
        let state = unreachable_state();
        for document in ["- !user [unclosed", "- !host\n  annotations: {}\n", "- !user a:b"] {
            let err = match dispatch(
                &state,
                query(&[
                    ("action", "load_policy"),
                    ("resource_id", "cucumber:policy:root"),
                    ("value", document),
                ]),
            )
            .await
            {
                Ok(_) => panic!("{document:?} was accepted"),
                Err(err) => err,
            };
            assert!(err.is_caller_error(), "{document:?} gave {err}");
        }
    }

    #[tokio::test]
    async fn policy_in_unknown_account_is_not_found() {
        let state = memory_state();
        let err = match dispatch(
            &state,
            query(&[
                ("action", "load_policy"),
                ("resource_id", "ghost:policy:root"),
                ("value", "- !user alice"),
            ]),
        )
        .await
        {
            Ok(_) => panic!("policy loaded into a missing account"),
            Err(err) => err,
        };
        assert_eq!(err.status_code(), 404);
    }
}
