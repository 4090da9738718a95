//! The storage traits backends implement.
//!
//! Every write is a per-key upsert or delete; callers never read-modify-write,
//! so concurrent writers cannot lose each other's updates.

use crate::types::*;
use crate::StoreError;

/// Persisted (workspace, recipient) → wrapped key mapping.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait WrappedKeyStore: Send + Sync {
    /// Insert or replace the record for `(record.workspace_id, record.recipient_id)`.
    async fn put(&self, record: &WrappedKeyRecord) -> Result<(), StoreError>;

    /// Claim `record.workspace_id` and store its first record in one atomic step.
    ///
    /// Fails with [`StoreError::Conflict`] if the workspace was already claimed;
    /// nothing is written in that case.
    async fn put_first(&self, record: &WrappedKeyRecord) -> Result<(), StoreError>;

    /// `None` means the recipient was never granted access (or was revoked).
    async fn get(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<Option<WrappedKeyRecord>, StoreError>;

    /// Remove a recipient's record. Deleting a missing record is not an error.
    async fn delete(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<(), StoreError>;

    /// All current records of a workspace.
    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<WrappedKeyRecord>, StoreError>;
}

/// Persisted encrypted secrets, scoped by workspace, environment, and visibility.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait SecretRepository: Send + Sync {
    /// Insert or replace the record at `record.locator()`.
    async fn put_secret(&self, record: &SecretRecord) -> Result<(), StoreError>;

    async fn get_secret(&self, locator: &SecretLocator)
        -> Result<Option<SecretRecord>, StoreError>;

    /// Shared records plus the personal records owned by `requester_id`, ordered by name.
    async fn list_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        requester_id: &PrincipalId,
    ) -> Result<Vec<SecretRecord>, StoreError>;

    /// Remove one record. Deleting a missing record is not an error.
    async fn delete_secret(&self, locator: &SecretLocator) -> Result<(), StoreError>;

    /// Remove every personal record `owner_id` holds in a workspace.
    /// Returns the number of deleted records.
    async fn delete_personal_secrets(
        &self,
        workspace_id: &WorkspaceId,
        owner_id: &PrincipalId,
    ) -> Result<u64, StoreError>;
}

/// Persisted integration authorizations.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn put_integration(&self, integration: &IntegrationAuthorization)
        -> Result<(), StoreError>;

    async fn get_integration(
        &self,
        id: &IntegrationId,
    ) -> Result<IntegrationAuthorization, StoreError>;

    async fn list_integrations(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<IntegrationAuthorization>, StoreError>;

    async fn set_integration_active(
        &self,
        id: &IntegrationId,
        is_active: bool,
    ) -> Result<(), StoreError>;
}

/// Public identities of principals.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Publish a principal. Re-registering the same id with a different key is a conflict.
    async fn register_principal(&self, principal: &Principal) -> Result<(), StoreError>;

    async fn get_principal(&self, id: &PrincipalId) -> Result<Principal, StoreError>;
}

/// Everything a full backend provides.
pub trait Store: WrappedKeyStore + SecretRepository + IntegrationStore + PrincipalDirectory {}

impl<T> Store for T where
    T: WrappedKeyStore + SecretRepository + IntegrationStore + PrincipalDirectory
{
}
