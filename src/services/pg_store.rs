// services/pg_store.rs - Postgres account, role and secret store

use async_trait::async_trait;
use sqlx::Row;

use super::{
    generate_api_key, AccountStore, CreatedAccount, PurgeSummary, Role, RoleStore, SecretStore,
    StoreError,
};
use crate::database::{DatabaseError, DatabaseManager};
use crate::types::{ActingIdentity, ResourceId, RoleId};

/// Postgres-backed account, role and secret store
pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let db = DatabaseManager::connect(database_url, max_connections).await?;
        Ok(Self { db })
    }

    async fn account_exists(&self, id: &str) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 > 0)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn list(&self, _actor: &ActingIdentity) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT id FROM accounts ORDER BY created_at, id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("id")).collect())
    }

    async fn create(&self, actor: &ActingIdentity, id: &str) -> Result<CreatedAccount, StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, format!("create account '{}'", id)));
        }

        let api_key = generate_api_key();
        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query("INSERT INTO accounts (id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("account '{}'", id)));
        }

        sqlx::query("INSERT INTO roles (role_id, account, api_key) VALUES ($1, $2, $3)")
            .bind(RoleId::admin_of(id).to_string())
            .bind(id)
            .bind(&api_key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CreatedAccount {
            id: id.to_string(),
            api_key,
        })
    }

    async fn destroy(&self, actor: &ActingIdentity, id: &str) -> Result<(), StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, format!("destroy account '{}'", id)));
        }

        // roles and secrets go with the account (ON DELETE CASCADE)
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account '{}'", id)));
        }
        Ok(())
    }

    async fn purge(&self, actor: &ActingIdentity) -> Result<PurgeSummary, StoreError> {
        if !actor.is_root() {
            return Err(StoreError::forbidden(actor, "purge accounts"));
        }

        let deleted = sqlx::query("DELETE FROM accounts")
            .execute(self.db.pool())
            .await?;

        Ok(PurgeSummary {
            purged_accounts: deleted.rows_affected(),
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.health_check().await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_by_id(&self, role_id: &RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT api_key FROM roles WHERE role_id = $1")
            .bind(role_id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Role {
            id: role_id.clone(),
            api_key: row.get("api_key"),
        }))
    }

    async fn provision(&self, actor: &ActingIdentity, role_id: &RoleId) -> Result<Role, StoreError> {
        if !actor.administers(&role_id.account) {
            return Err(StoreError::forbidden(actor, format!("create role '{}'", role_id)));
        }

        if !self.account_exists(&role_id.account).await? {
            return Err(StoreError::NotFound(format!("account '{}'", role_id.account)));
        }

        sqlx::query(
            "INSERT INTO roles (role_id, account, api_key) VALUES ($1, $2, $3) ON CONFLICT (role_id) DO NOTHING",
        )
        .bind(role_id.to_string())
        .bind(&role_id.account)
        .bind(generate_api_key())
        .execute(self.db.pool())
        .await?;

        let row = sqlx::query("SELECT api_key FROM roles WHERE role_id = $1")
            .bind(role_id.to_string())
            .fetch_one(self.db.pool())
            .await?;

        Ok(Role {
            id: role_id.clone(),
            api_key: row.get("api_key"),
        })
    }
}

#[async_trait]
impl SecretStore for PgStore {
    async fn show(
        &self,
        actor: &ActingIdentity,
        resource: &ResourceId,
        version: Option<u32>,
    ) -> Result<String, StoreError> {
        if !actor.administers(&resource.account) {
            return Err(StoreError::forbidden(actor, format!("read '{}'", resource)));
        }

        let row = match version {
            Some(v) => {
                // Versions past the column range were never written
                let Ok(v) = i32::try_from(v) else {
                    return Err(StoreError::NotFound(format!(
                        "version {} of secret '{}'",
                        v, resource
                    )));
                };
                sqlx::query("SELECT value FROM secrets WHERE resource_id = $1 AND version = $2")
                    .bind(resource.to_string())
                    .bind(v)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            None => {
                sqlx::query(
                    "SELECT value FROM secrets WHERE resource_id = $1 ORDER BY version DESC LIMIT 1",
                )
                .bind(resource.to_string())
                .fetch_optional(self.db.pool())
                .await?
            }
        };

        row.map(|row| row.get::<String, _>("value")).ok_or_else(|| match version {
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

        if !self.account_exists(&resource.account).await? {
            return Err(StoreError::NotFound(format!("account '{}'", resource.account)));
        }

        let mut tx = self.db.pool().begin().await?;

        // Writers of one resource take turns picking the next version
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(resource.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO secrets (resource_id, account, version, value)
            SELECT $1, $2, COALESCE(MAX(version), 0) + 1, $3
            FROM secrets
            WHERE resource_id = $1
            "#,
        )
        .bind(resource.to_string())
        .bind(&resource.account)
        .bind(value)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store against `DATABASE_URL`, or `None` when no database is configured
    async fn store() -> Option<PgStore> {
        let _ = dotenvy::dotenv();
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(PgStore::connect(&url, 5).await.expect("connect to DATABASE_URL"))
    }

    fn unique_account() -> String {
        format!("pg-{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn concurrent_writers_get_distinct_versions() {
        let Some(store) = store().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let store = std::sync::Arc::new(store);
        let account = unique_account();
        AccountStore::create(&*store, &ActingIdentity::Root, &account).await.unwrap();

        let admin = ActingIdentity::admin_of(&account);
        let resource: ResourceId = format!("{}:variable:db/password", account).parse().unwrap();

        let writers: Vec<_> = (1..=8)
            .map(|n| {
                let store = store.clone();
                let admin = admin.clone();
                let resource = resource.clone();
                tokio::spawn(async move {
                    SecretStore::create(&*store, &admin, &resource, &format!("v{}", n)).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        for version in 1..=8 {
            assert!(store.show(&admin, &resource, Some(version)).await.is_ok());
        }
        assert!(matches!(
            store.show(&admin, &resource, Some(u32::MAX)).await,
            Err(StoreError::NotFound(_))
        ));

        store.destroy(&ActingIdentity::Root, &account).await.unwrap();
    }

    #[tokio::test]
    async fn provision_is_idempotent() {
        let Some(store) = store().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let account = unique_account();
        AccountStore::create(&store, &ActingIdentity::Root, &account).await.unwrap();

        let admin = ActingIdentity::admin_of(&account);
        let alice: RoleId = format!("{}:user:alice", account).parse().unwrap();
        let first = store.provision(&admin, &alice).await.unwrap();
        let again = store.provision(&admin, &alice).await.unwrap();
        assert_eq!(first.api_key, again.api_key);
        assert_eq!(store.find_by_id(&alice).await.unwrap(), Some(first));

        store.destroy(&ActingIdentity::Root, &account).await.unwrap();
    }
}
