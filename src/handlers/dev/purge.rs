// handlers/dev/purge.rs - purge

use axum::response::{IntoResponse, Json, Response};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::ActingIdentity;

/// `action=purge` - destroy every account, with its roles and secrets
pub async fn purge(state: &AppState) -> Result<Response, ApiError> {
    let summary = state.stores.accounts.purge(&ActingIdentity::Root).await?;
    tracing::warn!("Purged {} accounts", summary.purged_accounts);
    Ok(Json(summary).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use super::super::testing::*;

    #[tokio::test]
    async fn purge_empties_the_store() {
        let state = memory_state();
        for id in ["a", "b"] {
            dispatch(&state, query(&[("action", "create_account"), ("id", id)]))
                .await
                .unwrap();
        }

        let response = dispatch(&state, query(&[("action", "purge")])).await.unwrap();
        assert_eq!(body_string(response).await, r#"{"purged_accounts":2}"#);

        let response = dispatch(&state, query(&[("action", "list_accounts")])).await.unwrap();
        assert_eq!(body_string(response).await, "[]");
    }
}
