//! SQLite storage backend.
//!
//! Writes are single-statement upserts (`ON CONFLICT ... DO UPDATE`) keyed by the
//! record's natural key, so concurrent writers replace whole rows and readers never
//! observe a half-written record. Creating a workspace is the one exception: the
//! `workspace_keys` claim and the first wrapped key commit together in a transaction.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use envseal_storage::{
    Environment, IntegrationAuthorization, IntegrationId, IntegrationStore, Principal,
    PrincipalDirectory, PrincipalId, SecretLocator, SecretRecord, SecretRepository, SecretScope,
    StoreError, Visibility, WorkspaceId, WrappedKeyRecord, WrappedKeyStore,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

fn parse_environment(s: &str) -> Result<Environment, StoreError> {
    s.parse::<Environment>().map_err(backend)
}

fn from_timestamp(ts: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| backend(format!("invalid timestamp {}", ts)))
}

fn owner_column(scope: &SecretScope) -> String {
    scope.owner().map(|o| o.to_string()).unwrap_or_default()
}

type SecretRow = (String, String, String, String, String, Vec<u8>, Vec<u8>, i64);

fn secret_from_row(row: SecretRow) -> Result<SecretRecord, StoreError> {
    let (workspace_id, environment, visibility, owner_id, name, nonce, ciphertext, updated_at) =
        row;
    let scope = match visibility.parse::<Visibility>()? {
        Visibility::Shared => SecretScope::Shared,
        Visibility::Personal => SecretScope::Personal {
            owner_id: PrincipalId(parse_uuid(&owner_id)?),
        },
    };
    SecretRecord::from_parts(
        SecretLocator {
            workspace_id: WorkspaceId(parse_uuid(&workspace_id)?),
            environment: parse_environment(&environment)?,
            scope,
            name,
        },
        nonce,
        ciphertext,
        from_timestamp(updated_at)?,
    )
}

type WrappedKeyRow = (String, String, String, Vec<u8>, Vec<u8>, i64);

fn wrapped_key_from_row(row: WrappedKeyRow) -> Result<WrappedKeyRecord, StoreError> {
    let (workspace_id, recipient_id, sender_id, ciphertext, nonce, created_at) = row;
    Ok(WrappedKeyRecord {
        workspace_id: WorkspaceId(parse_uuid(&workspace_id)?),
        recipient_id: PrincipalId(parse_uuid(&recipient_id)?),
        sender_id: PrincipalId(parse_uuid(&sender_id)?),
        ciphertext,
        nonce,
        created_at: from_timestamp(created_at)?,
    })
}

type IntegrationRow = (String, String, String, String, String, Vec<u8>, bool, i64);

fn integration_from_row(row: IntegrationRow) -> Result<IntegrationAuthorization, StoreError> {
    let (id, workspace_id, environment, provider, target, credentials, is_active, created_at) =
        row;
    Ok(IntegrationAuthorization {
        id: IntegrationId(parse_uuid(&id)?),
        workspace_id: WorkspaceId(parse_uuid(&workspace_id)?),
        environment: parse_environment(&environment)?,
        provider,
        target,
        credentials,
        is_active,
        created_at: from_timestamp(created_at)?,
    })
}

impl SqliteStore {
    /// `~/.envseal/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".envseal");
        Self::open_path(&dir.join("store.db")).await
    }

    /// Open (or create) a database file, creating its parent directory with 0700 perms on unix.
    pub async fn open_path(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(backend)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                    .map_err(backend)?;
            }
        }
        let url = format!("sqlite://{}", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(backend)?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl WrappedKeyStore for SqliteStore {
    async fn put(&self, record: &WrappedKeyRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO wrapped_keys(workspace_id,recipient_id,sender_id,ciphertext,nonce,created_at)
             VALUES(?,?,?,?,?,?)
             ON CONFLICT(workspace_id,recipient_id)
             DO UPDATE SET sender_id=excluded.sender_id,
                           ciphertext=excluded.ciphertext,
                           nonce=excluded.nonce,
                           created_at=excluded.created_at",
        )
        .bind(record.workspace_id.to_string())
        .bind(record.recipient_id.to_string())
        .bind(record.sender_id.to_string())
        .bind(&record.ciphertext)
        .bind(&record.nonce)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn put_first(&self, record: &WrappedKeyRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let claimed = sqlx::query(
            "INSERT INTO workspace_keys(workspace_id,created_by,created_at) VALUES(?,?,?)
             ON CONFLICT(workspace_id) DO NOTHING",
        )
        .bind(record.workspace_id.to_string())
        .bind(record.sender_id.to_string())
        .bind(record.created_at.timestamp())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(backend)?;
            return Err(StoreError::Conflict(format!(
                "workspace {} already has a key",
                record.workspace_id
            )));
        }

        sqlx::query(
            "INSERT INTO wrapped_keys(workspace_id,recipient_id,sender_id,ciphertext,nonce,created_at)
             VALUES(?,?,?,?,?,?)",
        )
        .bind(record.workspace_id.to_string())
        .bind(record.recipient_id.to_string())
        .bind(record.sender_id.to_string())
        .bind(&record.ciphertext)
        .bind(&record.nonce)
        .bind(record.created_at.timestamp())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn get(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<Option<WrappedKeyRecord>, StoreError> {
        let row = sqlx::query_as::<_, WrappedKeyRow>(
            "SELECT workspace_id,recipient_id,sender_id,ciphertext,nonce,created_at
             FROM wrapped_keys WHERE workspace_id=? AND recipient_id=?",
        )
        .bind(workspace_id.to_string())
        .bind(recipient_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(wrapped_key_from_row).transpose()
    }

    async fn delete(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM wrapped_keys WHERE workspace_id=? AND recipient_id=?")
            .bind(workspace_id.to_string())
            .bind(recipient_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<WrappedKeyRecord>, StoreError> {
        let rows = sqlx::query_as::<_, WrappedKeyRow>(
            "SELECT workspace_id,recipient_id,sender_id,ciphertext,nonce,created_at
             FROM wrapped_keys WHERE workspace_id=? ORDER BY recipient_id",
        )
        .bind(workspace_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(wrapped_key_from_row).collect()
    }
}

#[async_trait::async_trait]
impl SecretRepository for SqliteStore {
    async fn put_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let locator = record.locator();
        sqlx::query(
            "INSERT INTO secrets(workspace_id,environment,visibility,owner_id,name,nonce,ciphertext,updated_at)
             VALUES(?,?,?,?,?,?,?,?)
             ON CONFLICT(workspace_id,environment,visibility,owner_id,name)
             DO UPDATE SET nonce=excluded.nonce,
                           ciphertext=excluded.ciphertext,
                           updated_at=excluded.updated_at",
        )
        .bind(locator.workspace_id.to_string())
        .bind(locator.environment.slug())
        .bind(locator.scope.visibility().as_str())
        .bind(owner_column(&locator.scope))
        .bind(&locator.name)
        .bind(record.nonce())
        .bind(record.ciphertext())
        .bind(record.updated_at().timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn get_secret(
        &self,
        locator: &SecretLocator,
    ) -> Result<Option<SecretRecord>, StoreError> {
        let row = sqlx::query_as::<_, SecretRow>(
            "SELECT workspace_id,environment,visibility,owner_id,name,nonce,ciphertext,updated_at
             FROM secrets
             WHERE workspace_id=? AND environment=? AND visibility=? AND owner_id=? AND name=?",
        )
        .bind(locator.workspace_id.to_string())
        .bind(locator.environment.slug())
        .bind(locator.scope.visibility().as_str())
        .bind(owner_column(&locator.scope))
        .bind(&locator.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(secret_from_row).transpose()
    }

    async fn list_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        requester_id: &PrincipalId,
    ) -> Result<Vec<SecretRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SecretRow>(
            "SELECT workspace_id,environment,visibility,owner_id,name,nonce,ciphertext,updated_at
             FROM secrets
             WHERE workspace_id=? AND environment=?
               AND (visibility='shared' OR (visibility='personal' AND owner_id=?))
             ORDER BY name, visibility",
        )
        .bind(workspace_id.to_string())
        .bind(environment.slug())
        .bind(requester_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(secret_from_row).collect()
    }

    async fn delete_secret(&self, locator: &SecretLocator) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM secrets
             WHERE workspace_id=? AND environment=? AND visibility=? AND owner_id=? AND name=?",
        )
        .bind(locator.workspace_id.to_string())
        .bind(locator.environment.slug())
        .bind(locator.scope.visibility().as_str())
        .bind(owner_column(&locator.scope))
        .bind(&locator.name)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete_personal_secrets(
        &self,
        workspace_id: &WorkspaceId,
        owner_id: &PrincipalId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM secrets WHERE workspace_id=? AND visibility='personal' AND owner_id=?",
        )
        .bind(workspace_id.to_string())
        .bind(owner_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl IntegrationStore for SqliteStore {
    async fn put_integration(
        &self,
        integration: &IntegrationAuthorization,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO integrations(id,workspace_id,environment,provider,target,credentials,is_active,created_at)
             VALUES(?,?,?,?,?,?,?,?)
             ON CONFLICT(id)
             DO UPDATE SET environment=excluded.environment,
                           provider=excluded.provider,
                           target=excluded.target,
                           credentials=excluded.credentials,
                           is_active=excluded.is_active",
        )
        .bind(integration.id.to_string())
        .bind(integration.workspace_id.to_string())
        .bind(integration.environment.slug())
        .bind(&integration.provider)
        .bind(&integration.target)
        .bind(&integration.credentials)
        .bind(integration.is_active)
        .bind(integration.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<IntegrationAuthorization, StoreError> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            "SELECT id,workspace_id,environment,provider,target,credentials,is_active,created_at
             FROM integrations WHERE id=?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => integration_from_row(row),
        }
    }

    async fn list_integrations(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<IntegrationAuthorization>, StoreError> {
        let rows = sqlx::query_as::<_, IntegrationRow>(
            "SELECT id,workspace_id,environment,provider,target,credentials,is_active,created_at
             FROM integrations WHERE workspace_id=? ORDER BY id",
        )
        .bind(workspace_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(integration_from_row).collect()
    }

    async fn set_integration_active(
        &self,
        id: &IntegrationId,
        is_active: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE integrations SET is_active=? WHERE id=?")
            .bind(is_active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PrincipalDirectory for SqliteStore {
    async fn register_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO principals(id,name,public_key,created_at) VALUES(?,?,?,?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(principal.id.to_string())
        .bind(&principal.name)
        .bind(&principal.public_key)
        .bind(principal.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let stored = self.get_principal(&principal.id).await?;
        if stored.public_key != principal.public_key {
            return Err(StoreError::Conflict(format!(
                "principal {} already registered with another key",
                principal.id
            )));
        }
        Ok(())
    }

    async fn get_principal(&self, id: &PrincipalId) -> Result<Principal, StoreError> {
        let row = sqlx::query_as::<_, (String, String, Vec<u8>, i64)>(
            "SELECT id,name,public_key,created_at FROM principals WHERE id=?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((id, name, public_key, created_at)) => Ok(Principal {
                id: PrincipalId(parse_uuid(&id)?),
                name,
                public_key,
                created_at: from_timestamp(created_at)?,
            }),
        }
    }
}
