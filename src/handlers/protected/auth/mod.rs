use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};

use crate::middleware::AuthUser;

/// GET /api/auth/whoami - the role the bearer token was issued to
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "role_id": auth_user.role_id,
        "account": auth_user.account,
    }))
}
