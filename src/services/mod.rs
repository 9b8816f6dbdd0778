// services/mod.rs - Account, role and secret services
//
// The gateway never talks to storage directly. Every operation goes through
// one of the store traits below, and every privileged call carries the
// identity it is performed as.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::types::{ActingIdentity, ResourceId, RoleId};

pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{actor} is not allowed to {action}")]
    Forbidden { actor: String, action: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    DatabaseManager(#[from] crate::database::DatabaseError),
}

impl StoreError {
    pub(crate) fn forbidden(actor: &ActingIdentity, action: impl Into<String>) -> Self {
        StoreError::Forbidden {
            actor: actor.to_string(),
            action: action.into(),
        }
    }
}

/// A role together with its current API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub api_key: String,
}

/// Result of provisioning an account: its id and the admin user's API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAccount {
    pub id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
    pub purged_accounts: u64,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// All account ids, oldest first
    async fn list(&self, actor: &ActingIdentity) -> Result<Vec<String>, StoreError>;

    /// Create an account and its `<account>:user:admin` role
    async fn create(&self, actor: &ActingIdentity, id: &str) -> Result<CreatedAccount, StoreError>;

    /// Destroy an account with all of its roles and secrets
    async fn destroy(&self, actor: &ActingIdentity, id: &str) -> Result<(), StoreError>;

    /// Destroy every account
    async fn purge(&self, actor: &ActingIdentity) -> Result<PurgeSummary, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, role_id: &RoleId) -> Result<Option<Role>, StoreError>;

    /// Create the role with a fresh API key; an existing role keeps its key
    async fn provision(&self, actor: &ActingIdentity, role_id: &RoleId) -> Result<Role, StoreError>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Latest value, or a specific 1-based version
    async fn show(
        &self,
        actor: &ActingIdentity,
        resource: &ResourceId,
        version: Option<u32>,
    ) -> Result<String, StoreError>;

    /// Append a new version of the secret value
    async fn create(
        &self,
        actor: &ActingIdentity,
        resource: &ResourceId,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// Handles to the three services, shared by all request handlers
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub roles: Arc<dyn RoleStore>,
    pub secrets: Arc<dyn SecretStore>,
}

impl Stores {
    /// Use one backend for all three services
    pub fn from_backend<T>(backend: Arc<T>) -> Self
    where
        T: AccountStore + RoleStore + SecretStore + 'static,
    {
        Self {
            accounts: backend.clone(),
            roles: backend.clone(),
            secrets: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    /// Postgres when a database URL is configured, in-memory otherwise
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        match &config.url {
            Some(url) => {
                let store = PgStore::connect(url, config.max_connections).await?;
                tracing::info!("Using postgres store");
                Ok(Self::from_backend(Arc::new(store)))
            }
            None => {
                tracing::info!("DATABASE_URL not set, using in-memory store");
                Ok(Self::memory())
            }
        }
    }
}

/// Random 64 character hex API key
pub fn generate_api_key() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("{:x}", hasher.finalize())
}
