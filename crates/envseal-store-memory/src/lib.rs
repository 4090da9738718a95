//! In-memory storage backend using concurrent hash maps.
//!
//! This implementation is suitable for:
//! - Tests and local development
//! - Embedding envseal in a single process that does not need durability
//!
//! Each map entry is replaced atomically, which gives per-key last-write-wins
//! without any read-modify-write on the caller side.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use envseal_storage::{
    Environment, IntegrationAuthorization, IntegrationId, IntegrationStore, Principal,
    PrincipalDirectory, PrincipalId, SecretLocator, SecretRecord, SecretRepository, StoreError,
    WorkspaceId, WrappedKeyRecord, WrappedKeyStore,
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    wrapped_keys: Arc<DashMap<(WorkspaceId, PrincipalId), WrappedKeyRecord>>,
    // workspace -> creator
    workspaces: Arc<DashMap<WorkspaceId, PrincipalId>>,
    secrets: Arc<DashMap<SecretLocator, SecretRecord>>,
    integrations: Arc<DashMap<IntegrationId, IntegrationAuthorization>>,
    principals: Arc<DashMap<PrincipalId, Principal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WrappedKeyStore for MemoryStore {
    async fn put(&self, record: &WrappedKeyRecord) -> Result<(), StoreError> {
        self.wrapped_keys.insert(
            (record.workspace_id.clone(), record.recipient_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn put_first(&self, record: &WrappedKeyRecord) -> Result<(), StoreError> {
        // The vacant entry holds the shard lock until the record is in place.
        match self.workspaces.entry(record.workspace_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "workspace {} already has a key",
                record.workspace_id
            ))),
            Entry::Vacant(slot) => {
                self.wrapped_keys.insert(
                    (record.workspace_id.clone(), record.recipient_id.clone()),
                    record.clone(),
                );
                slot.insert(record.sender_id.clone());
                Ok(())
            }
        }
    }

    async fn get(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<Option<WrappedKeyRecord>, StoreError> {
        Ok(self
            .wrapped_keys
            .get(&(workspace_id.clone(), recipient_id.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn delete(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<(), StoreError> {
        self.wrapped_keys
            .remove(&(workspace_id.clone(), recipient_id.clone()));
        Ok(())
    }

    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<WrappedKeyRecord>, StoreError> {
        let mut records: Vec<WrappedKeyRecord> = self
            .wrapped_keys
            .iter()
            .filter(|entry| &entry.key().0 == workspace_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.recipient_id.cmp(&b.recipient_id));
        Ok(records)
    }
}

#[async_trait]
impl SecretRepository for MemoryStore {
    async fn put_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        self.secrets
            .insert(record.locator().clone(), record.clone());
        Ok(())
    }

    async fn get_secret(
        &self,
        locator: &SecretLocator,
    ) -> Result<Option<SecretRecord>, StoreError> {
        Ok(self.secrets.get(locator).map(|entry| entry.value().clone()))
    }

    async fn list_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        requester_id: &PrincipalId,
    ) -> Result<Vec<SecretRecord>, StoreError> {
        let mut records: Vec<SecretRecord> = self
            .secrets
            .iter()
            .filter(|entry| {
                let locator = entry.key();
                &locator.workspace_id == workspace_id
                    && locator.environment == environment
                    && locator.scope.is_visible_to(requester_id)
            })
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then(a.scope().visibility().as_str().cmp(b.scope().visibility().as_str()))
        });
        Ok(records)
    }

    async fn delete_secret(&self, locator: &SecretLocator) -> Result<(), StoreError> {
        self.secrets.remove(locator);
        Ok(())
    }

    async fn delete_personal_secrets(
        &self,
        workspace_id: &WorkspaceId,
        owner_id: &PrincipalId,
    ) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        self.secrets.retain(|locator, _| {
            let owned =
                &locator.workspace_id == workspace_id && locator.scope.owner() == Some(owner_id);
            if owned {
                removed += 1;
            }
            !owned
        });
        Ok(removed)
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn put_integration(
        &self,
        integration: &IntegrationAuthorization,
    ) -> Result<(), StoreError> {
        self.integrations
            .insert(integration.id.clone(), integration.clone());
        Ok(())
    }

    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<IntegrationAuthorization, StoreError> {
        self.integrations
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list_integrations(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<IntegrationAuthorization>, StoreError> {
        let mut integrations: Vec<IntegrationAuthorization> = self
            .integrations
            .iter()
            .filter(|entry| &entry.value().workspace_id == workspace_id)
            .map(|entry| entry.value().clone())
            .collect();
        integrations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(integrations)
    }

    async fn set_integration_active(
        &self,
        id: &IntegrationId,
        is_active: bool,
    ) -> Result<(), StoreError> {
        let mut entry = self.integrations.get_mut(id).ok_or(StoreError::NotFound)?;
        entry.is_active = is_active;
        Ok(())
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryStore {
    async fn register_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        match self.principals.entry(principal.id.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().public_key == principal.public_key {
                    Ok(())
                } else {
                    Err(StoreError::Conflict(format!(
                        "principal {} already registered with another key",
                        principal.id
                    )))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(principal.clone());
                Ok(())
            }
        }
    }

    async fn get_principal(&self, id: &PrincipalId) -> Result<Principal, StoreError> {
        self.principals
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }
}
