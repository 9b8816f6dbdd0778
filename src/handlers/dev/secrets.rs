// handlers/dev/secrets.rs - get_secret, create_secret
//
// Secret operations run as `<account>:user:admin` of the account named in
// `resource_id`, never as root.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::DevParams;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::ActingIdentity;

/// `action=get_secret&resource_id=<account>:<kind>:<id>[&version=<n>]` - value as plain text
pub async fn show(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let resource = params.resource()?;
    let version = match params.get("version") {
        Some(raw) => Some(parse_version(raw)?),
        None => None,
    };

    let actor = ActingIdentity::admin_of(&resource.account);
    let value = state.stores.secrets.show(&actor, resource, version).await?;

    Ok(value.into_response())
}

/// `action=create_secret&resource_id=...&value=...` - 201, empty body
pub async fn create(state: &AppState, params: &DevParams) -> Result<Response, ApiError> {
    let resource = params.resource()?;
    let value = params.require("value")?;

    let actor = ActingIdentity::admin_of(&resource.account);
    state.stores.secrets.create(&actor, resource, value).await?;
    tracing::info!("Stored new value for '{}' as {}", resource, actor);

    Ok(StatusCode::CREATED.into_response())
}

fn parse_version(raw: &str) -> Result<u32, ApiError> {
    match raw.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ApiError::bad_request("version must be a positive integer")),
    }
}
