// handlers/dev/mod.rs - GET /dev diagnostic gateway
//
// Development-only endpoint that runs privileged account, secret and role
// operations from plain query parameters, without a JWT:
//
//   GET /dev?action=list_accounts
//   GET /dev?action=create_account&id=cucumber
//   GET /dev?action=create_secret&resource_id=cucumber:variable:db/password&value=hello
//   GET /dev?action=get_secret&resource_id=cucumber:variable:db/password
//   GET /dev?action=retrieve_api_key&role_id=cucumber:user:admin
//
// Security Level: None (path is on the authenticator's bypass list)
// Route: registered ahead of the application routes by routes::draw

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::config::ErrorMode;
use crate::error::ApiError;
use crate::middleware::Authenticator;
use crate::server::StartupError;
use crate::state::AppState;
use crate::types::ResourceId;

pub mod accounts; // list_accounts, create_account, destroy_account
pub mod policies; // load_policy
pub mod purge;    // purge
pub mod roles;    // retrieve_api_key
pub mod secrets;  // get_secret, create_secret, load_policy

/// Path of the gateway route
pub const DEV_PATH: &str = "/dev";

/// Bypass pattern covering the gateway route
pub const DEV_BYPASS_PATTERN: &str = "^/dev";

/// Put the gateway route on the authenticator's bypass list.
///
/// Composition must supply an authenticator; without one there is no way to
/// tell whether `/dev` would end up authenticated, so startup is aborted.
pub fn register_exemption(authenticator: Option<&mut Authenticator>) -> Result<(), StartupError> {
    let authenticator = authenticator.ok_or(StartupError::AuthenticatorMissing)?;

    let added = authenticator
        .exempt(DEV_BYPASS_PATTERN)
        .map_err(|e| StartupError::InvalidBypassPattern(DEV_BYPASS_PATTERN.to_string(), e))?;

    if added {
        tracing::info!("Authentication bypass registered for {}", DEV_BYPASS_PATTERN);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevAction {
    ListAccounts,
    CreateAccount,
    DestroyAccount,
    RetrieveApiKey,
    GetSecret,
    CreateSecret,
    /// Stores the document like `CreateSecret`, then provisions its users and hosts
    LoadPolicy,
    Purge,
}

impl DevAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevAction::ListAccounts => "list_accounts",
            DevAction::CreateAccount => "create_account",
            DevAction::DestroyAccount => "destroy_account",
            DevAction::RetrieveApiKey => "retrieve_api_key",
            DevAction::GetSecret => "get_secret",
            DevAction::CreateSecret => "create_secret",
            DevAction::LoadPolicy => "load_policy",
            DevAction::Purge => "purge",
        }
    }
}

impl FromStr for DevAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list_accounts" => Ok(DevAction::ListAccounts),
            "create_account" => Ok(DevAction::CreateAccount),
            "destroy_account" => Ok(DevAction::DestroyAccount),
            "retrieve_api_key" => Ok(DevAction::RetrieveApiKey),
            "get_secret" => Ok(DevAction::GetSecret),
            "create_secret" => Ok(DevAction::CreateSecret),
            "load_policy" => Ok(DevAction::LoadPolicy),
            "purge" => Ok(DevAction::Purge),
            _ => Err(ApiError::bad_request("action not recognized")),
        }
    }
}

impl fmt::Display for DevAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of one gateway request, with `resource_id` decomposed
#[derive(Debug, Clone, Default)]
pub struct DevParams {
    values: HashMap<String, String>,
    resource: Option<ResourceId>,
}

impl DevParams {
    /// Non-empty parameter value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::bad_request(format!("{} required", name)))
    }

    pub fn resource(&self) -> Result<&ResourceId, ApiError> {
        self.resource
            .as_ref()
            .ok_or_else(|| ApiError::bad_request("resource_id required"))
    }
}

/// A parsed gateway request: exactly one action plus its parameters
#[derive(Debug, Clone)]
pub struct DevRequest {
    pub action: DevAction,
    pub params: DevParams,
}

impl DevRequest {
    pub fn parse(values: HashMap<String, String>, allow_purge: bool) -> Result<Self, ApiError> {
        let action = values
            .get("action")
            .filter(|a| !a.is_empty())
            .cloned()
            .ok_or_else(|| ApiError::bad_request("action required"))?;

        let resource = match values.get("resource_id") {
            Some(raw) => Some(
                raw.parse::<ResourceId>()
                    .map_err(|_| ApiError::bad_request("malformed resource_id"))?,
            ),
            None => None,
        };

        let action: DevAction = action.parse()?;
        if action == DevAction::Purge && !allow_purge {
            return Err(ApiError::bad_request("action not recognized"));
        }

        Ok(Self {
            action,
            params: DevParams { values, resource },
        })
    }
}

/// GET /dev - run one diagnostic action
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match dispatch(&state, query).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("Dev request failed: {}", err);
            render_error(err, state.gateway.error_mode)
        }
    }
}

/// Parse the request and hand it to exactly one operation handler
pub async fn dispatch(
    state: &AppState,
    query: HashMap<String, String>,
) -> Result<Response, ApiError> {
    let DevRequest { action, params } = DevRequest::parse(query, state.gateway.allow_purge)?;

    tracing::info!(
        action = %action,
        resource = ?params.resource.as_ref().map(ToString::to_string),
        "Dev request"
    );

    match action {
        DevAction::ListAccounts => accounts::list(state).await,
        DevAction::CreateAccount => accounts::create(state, &params).await,
        DevAction::DestroyAccount => accounts::destroy(state, &params).await,
        DevAction::RetrieveApiKey => roles::retrieve_api_key(state, &params).await,
        DevAction::GetSecret => secrets::show(state, &params).await,
        DevAction::CreateSecret => secrets::create(state, &params).await,
        DevAction::LoadPolicy => policies::load(state, &params).await,
        DevAction::Purge => purge::purge(state).await,
    }
}

/// Legacy deployments answer caller errors with 200 and `{ "error": ... }`
fn render_error(err: ApiError, mode: ErrorMode) -> Response {
    match mode {
        ErrorMode::Legacy if err.is_caller_error() => {
            (StatusCode::OK, Json(err.to_legacy_json())).into_response()
        }
        _ => err.into_response(),
    }
}
