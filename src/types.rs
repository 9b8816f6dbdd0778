/// Shared identifier and identity types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role kind that owns an account's administrative rights
pub const ADMIN_KIND: &str = "user";
/// Identifier of the administrative user provisioned with every account
pub const ADMIN_ID: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 'account:kind:identifier', got '{0}'")]
pub struct MalformedId(pub String);

/// Split `account:kind:identifier` into exactly three non-empty parts.
fn split_triple(raw: &str) -> Result<(String, String, String), MalformedId> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [account, kind, id] if !account.is_empty() && !kind.is_empty() && !id.is_empty() => {
            Ok((account.to_string(), kind.to_string(), id.to_string()))
        }
        _ => Err(MalformedId(raw.to_string())),
    }
}

/// A secret (or other resource) address, e.g. `cucumber:variable:db/password`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub account: String,
    pub kind: String,
    pub identifier: String,
}

impl FromStr for ResourceId {
    type Err = MalformedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, kind, identifier) = split_triple(s)?;
        Ok(Self { account, kind, identifier })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account, self.kind, self.identifier)
    }
}

/// A role address, e.g. `cucumber:user:alice` or `cucumber:host:bob`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId {
    pub account: String,
    pub kind: String,
    pub id: String,
}

impl RoleId {
    pub fn new(account: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// The `<account>:user:admin` role
    pub fn admin_of(account: &str) -> Self {
        Self::new(account, ADMIN_KIND, ADMIN_ID)
    }
}

impl FromStr for RoleId {
    type Err = MalformedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, kind, id) = split_triple(s)?;
        Ok(Self { account, kind, id })
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account, self.kind, self.id)
    }
}

/// Identity a service call is performed as.
///
/// Passed explicitly to every store operation that checks privileges. The
/// gateway builds one per request and drops it with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActingIdentity {
    /// Unrestricted, used for account lifecycle operations
    Root,
    /// Administrator scoped to a single account
    AccountAdmin(RoleId),
}

impl ActingIdentity {
    pub fn admin_of(account: &str) -> Self {
        ActingIdentity::AccountAdmin(RoleId::admin_of(account))
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ActingIdentity::Root)
    }

    /// Whether this identity may manage resources inside `account`.
    pub fn administers(&self, account: &str) -> bool {
        match self {
            ActingIdentity::Root => true,
            ActingIdentity::AccountAdmin(role) => role.account == account,
        }
    }
}

impl fmt::Display for ActingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActingIdentity::Root => write!(f, "!root"),
            ActingIdentity::AccountAdmin(role) => write!(f, "{}", role),
        }
    }
}
