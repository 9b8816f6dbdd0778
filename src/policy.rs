// policy.rs - Role declarations in a policy document
//
// Only the records that own an API key are read: `!user` and `!host`,
// including those nested in `!policy` bodies. Everything else in the
// document (variables, groups, grants, permits) is kept as text only.

use serde_yaml::Value;

use crate::types::{ResourceId, RoleId};

/// Identifier of the policy every account starts with
pub const ROOT_POLICY: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("malformed policy: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("!{0} record without an id")]
    MissingId(String),

    #[error("invalid {kind} id '{id}'")]
    InvalidId { kind: String, id: String },
}

/// Roles declared by `document` when loaded into the policy `target`.
///
/// Ids are qualified by the enclosing policy path: users as `alice@db-app`,
/// hosts as `db/app/bob`. Nothing is qualified under the root policy.
pub fn declared_roles(target: &ResourceId, document: &str) -> Result<Vec<RoleId>, PolicyError> {
    let statements: Value = serde_yaml::from_str(document)?;

    let path = if target.identifier == ROOT_POLICY {
        String::new()
    } else {
        target.identifier.clone()
    };

    let mut roles = Vec::new();
    collect(&target.account, &path, &statements, &mut roles)?;
    Ok(roles)
}

fn collect(
    account: &str,
    path: &str,
    statements: &Value,
    roles: &mut Vec<RoleId>,
) -> Result<(), PolicyError> {
    let Value::Sequence(statements) = statements else {
        return Ok(());
    };

    for statement in statements {
        let Value::Tagged(record) = statement else {
            continue;
        };
        let tag = record.tag.to_string();
        let kind = tag.trim_start_matches('!');

        match kind {
            "user" | "host" => {
                let id = record_id(kind, &record.value)?;
                roles.push(RoleId {
                    account: account.to_string(),
                    kind: kind.to_string(),
                    id: qualify(kind, path, &id),
                });
            }
            "policy" => {
                let id = record_id(kind, &record.value)?;
                let nested = if path.is_empty() { id } else { format!("{}/{}", path, id) };
                if let Some(body) = record.value.get("body") {
                    collect(account, &nested, body, roles)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// `!user alice` or `!user { id: alice, ... }`
fn record_id(kind: &str, value: &Value) -> Result<String, PolicyError> {
    let id = match value {
        Value::String(id) => id.as_str(),
        Value::Mapping(_) => value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PolicyError::MissingId(kind.to_string()))?,
        _ => return Err(PolicyError::MissingId(kind.to_string())),
    };

    if id.is_empty() || id.contains(':') {
        return Err(PolicyError::InvalidId {
            kind: kind.to_string(),
            id: id.to_string(),
        });
    }
    Ok(id.to_string())
}

fn qualify(kind: &str, path: &str, id: &str) -> String {
    match (kind, path.is_empty()) {
        (_, true) => id.to_string(),
        ("user", false) => format!("{}@{}", id, path.replace('/', "-")),
        _ => format!("{}/{}", path, id),
    }
}
