// services/memory_store.rs - In-process account, role and secret store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    generate_api_key, AccountStore, CreatedAccount, PurgeSummary, Role, RoleStore, SecretStore,
    StoreError,
};
use crate::types::{ActingIdentity, ResourceId, RoleId};

#[derive(Default)]
struct State {
    /// Creation order is the listing order
    accounts: Vec<String>,
    roles: HashMap<RoleId, String>,
    secrets: HashMap<ResourceId, Vec<String>>,
}

impl State {
    fn has_account(&self, id: &str) -> bool {
        self.accounts.iter().any(|a| a == id)
    }
}

/// Process-local store for development servers and tests
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn list(&self, _actor: &ActingIdentity) -> Result<Vec<String>, StoreError> {
        Ok(self.state.read().await.accounts.clone())
    }

    async fn create(&self, actor: &ActingIdentity, id: &str) -> Result<CreatedAccount, StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, format!("create account '{}'", id)));
        }

        let mut state = self.state.write().await;
        if state.has_account(id) {
            return Err(StoreError::Conflict(format!("account '{}'", id)));
        }

        let api_key = generate_api_key();
        state.accounts.push(id.to_string());
        state.roles.insert(RoleId::admin_of(id), api_key.clone());

        Ok(CreatedAccount {
            id: id.to_string(),
            api_key,
        })
    }

    async fn destroy(&self, actor: &ActingIdentity, id: &str) -> Result<(), StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, format!("destroy account '{}'", id)));
        }

        let mut state = self.state.write().await;
        if !state.has_account(id) {
            return Err(StoreError::NotFound(format!("account '{}'", id)));
        }

        state.accounts.retain(|a| a != id);
        state.roles.retain(|role, _| role.account != id);
        state.secrets.retain(|resource, _| resource.account != id);
        Ok(())
    }

    async fn purge(&self, actor: &ActingIdentity) -> Result<PurgeSummary, StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, "purge accounts"));
        }

        let mut state = self.state.write().await;
        let purged_accounts = state.accounts.len() as u64;
        *state = State::default();
        Ok(PurgeSummary { purged_accounts })
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_id(&self, role_id: &RoleId) -> Result<Option<Role>, StoreError> {
        let state = self.state.read().await;
        Ok(state.roles.get(role_id).map(|api_key| Role {
            id: role_id.clone(),
            api_key: api_key.clone(),
        }))
    }

    async fn provision(&self, actor: &ActingIdentity, role_id: &RoleId) -> Result<Role, StoreError> {
        if !actor.administers(&role_id.account) {
            return Err(StoreError::forbidden(actor, format!("create role '{}'", role_id)));
        }

        let mut state = self.state.write().await;
        if !state.has_account(&role_id.account) {
            return Err(StoreError::NotFound(format!("account '{}'", role_id.account)));
        }

        let api_key = state
            .roles
            .entry(role_id.clone())
            .or_insert_with(generate_api_key)
            .clone();

        Ok(Role {
            id: role_id.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn show(
        &self,
        actor: &ActingIdentity,
        resource: &ResourceId,
        version: Option<u32>,
    ) -> Result<String, StoreError> {
        if !actor.administers(&resource.account) {
            return Err(StoreError::forbidden(actor, format!("read '{}'", resource)));
        }

        let state = self.state.read().await;
        let versions = state
            .secrets
            .get(resource)
            .ok_or_else(|| StoreError::NotFound(format!("secret '{}'", resource)))?;

        let value = match version {
            None => versions.last(),
            Some(v) => (v as usize).checked_sub(1).and_then(|idx| versions.get(idx)),
        };

        value.cloned().ok_or_else(|| match version {
            Some(v) => StoreError::NotFound(format!("version {} of secret '{}'", v, resource)),
            None => StoreError::NotFound(format!("secret '{}'", resource)),
        })
    }

    async fn create(
        &self,
        actor: &ActingIdentity,
        resource: &ResourceId,
        value: &str,
    ) -> Result<(), StoreError> {
        if !actor.administers(&resource.account) {
            return Err(StoreError::forbidden(actor, format!("update '{}'", resource)));
        }

        let mut state = self.state.write().await;
        if !state.has_account(&resource.account) {
            return Err(StoreError::NotFound(format!("account '{}'", resource.account)));
        }

        state
            .secrets
            .entry(resource.clone())
            .or_default()
            .push(value.to_string());
        Ok(())
    }
}
