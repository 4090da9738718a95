use std::sync::Arc;

use chrono::Utc;
use envseal_crypto::{public_key_from_bytes, WorkspaceKey};
use envseal_storage::{
    Environment, IntegrationAuthorization, IntegrationId, Principal, PrincipalId, SecretLocator,
    SecretRecord, SecretScope, Store, StoreError, Visibility, WorkspaceId, WrappedKeyRecord,
};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{
    BatchReport, FetchError, IntegrationError, OnboardError, PolicyError, PushError, SecretError,
    UnlockError,
};
use crate::keys::{bootstrap_workspace, unlock_workspace_key, Identity};
use crate::onboard::{MembershipOnboarder, Recipient};
use crate::policy::{AccessPolicy, Action, KeyHolderPolicy};
use crate::secrets::{effective_secrets, open_secret, seal_secret, RevealedSecret, SecretEntry};
use crate::sync::{IntegrationSyncPipeline, PushReport};

/// Everything one principal can do against a store.
///
/// The workspace key is unlocked from the principal's own wrapped record at the start
/// of each operation that needs it and dropped when the operation returns.
///
/// Those operations unlock before consulting the [`AccessPolicy`]: a principal without
/// a usable record gets a `KeyUnavailable` error, and `Conflict` means the policy
/// refused a principal that does hold the key.
pub struct Client<S, P = KeyHolderPolicy<S>> {
    store: Arc<S>,
    policy: P,
    identity: Identity,
    pipeline: IntegrationSyncPipeline,
}

impl<S: Store> Client<S, KeyHolderPolicy<S>> {
    pub fn new(store: Arc<S>, identity: Identity) -> Self {
        let policy = KeyHolderPolicy::new(store.clone());
        Self::with_policy(store, identity, policy)
    }
}

impl<S, P> Client<S, P>
where
    S: Store,
    P: AccessPolicy,
{
    pub fn with_policy(store: Arc<S>, identity: Identity, policy: P) -> Self {
        Self {
            store,
            policy,
            identity,
            pipeline: IntegrationSyncPipeline::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: IntegrationSyncPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn principal_id(&self) -> &PrincipalId {
        self.identity.principal_id()
    }

    async fn authorize(
        &self,
        workspace_id: &WorkspaceId,
        action: Action,
    ) -> Result<(), PolicyError> {
        self.policy
            .authorize(workspace_id, self.identity.principal_id(), action)
            .await
    }

    async fn unlock(&self, workspace_id: &WorkspaceId) -> Result<WorkspaceKey, UnlockError> {
        unlock_workspace_key(self.store.as_ref(), workspace_id, &self.identity).await
    }

    fn locator(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        name: &str,
        visibility: Visibility,
    ) -> SecretLocator {
        SecretLocator {
            workspace_id: workspace_id.clone(),
            environment,
            scope: SecretScope::for_principal(visibility, self.identity.principal_id()),
            name: name.to_string(),
        }
    }

    // ── identities ──────────────────────────────────────────────────────────

    /// Publish this client's public key in the principal directory.
    pub async fn register_self(&self, name: &str) -> Result<(), OnboardError> {
        let id = self.identity.principal_id().clone();
        let public_key = self.identity.public_key_bytes();
        self.register_principal(&id, name, &public_key).await
    }

    pub async fn register_principal(
        &self,
        id: &PrincipalId,
        name: &str,
        public_key: &[u8],
    ) -> Result<(), OnboardError> {
        public_key_from_bytes(public_key)?;
        self.store
            .register_principal(&Principal {
                id: id.clone(),
                name: name.to_string(),
                public_key: public_key.to_vec(),
                created_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    // ── membership ──────────────────────────────────────────────────────────

    /// Generate the workspace key and self-wrap it for this principal.
    pub async fn create_workspace(&self, workspace_id: &WorkspaceId) -> Result<(), OnboardError> {
        bootstrap_workspace(self.store.as_ref(), workspace_id, &self.identity).await
    }

    /// Whether this principal can currently unlock the workspace key.
    pub async fn has_workspace_key(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<bool, StoreError> {
        match self.unlock(workspace_id).await {
            Ok(_) => Ok(true),
            Err(UnlockError::Unavailable(_)) => Ok(false),
            Err(UnlockError::Store(e)) => Err(e),
        }
    }

    /// Wrap the workspace key for `recipient_id`, acting as this client's principal.
    pub async fn onboard_member(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
        recipient_public_key: &[u8],
    ) -> Result<(), OnboardError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::GrantAccess).await?;
        MembershipOnboarder::new(self.store.as_ref(), workspace_id, &key, &self.identity)
            .onboard(recipient_id, recipient_public_key)
            .await?;
        Ok(())
    }

    /// [`Self::onboard_member`] with the recipient's key taken from the principal directory.
    pub async fn grant_access(
        &self,
        workspace_id: &WorkspaceId,
        recipient_id: &PrincipalId,
    ) -> Result<(), OnboardError> {
        let recipient = self.store.get_principal(recipient_id).await?;
        self.onboard_member(workspace_id, recipient_id, &recipient.public_key)
            .await
    }

    /// Onboard many recipients under one unlock. The outer error means nobody was
    /// onboarded; per-recipient failures are in the report.
    pub async fn onboard_members(
        &self,
        workspace_id: &WorkspaceId,
        recipients: &[Recipient],
    ) -> Result<BatchReport<PrincipalId, OnboardError>, OnboardError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::GrantAccess).await?;
        Ok(
            MembershipOnboarder::new(self.store.as_ref(), workspace_id, &key, &self.identity)
                .onboard_all(recipients)
                .await,
        )
    }

    /// Remove a member's wrapped key and their personal secrets in the workspace.
    /// Returns how many personal secrets were deleted.
    pub async fn revoke_member(
        &self,
        workspace_id: &WorkspaceId,
        principal_id: &PrincipalId,
    ) -> Result<u64, OnboardError> {
        self.authorize(workspace_id, Action::RevokeAccess).await?;
        self.store.delete(workspace_id, principal_id).await?;
        let removed = self
            .store
            .delete_personal_secrets(workspace_id, principal_id)
            .await?;

        info!(
            workspace_id = %workspace_id,
            principal_id = %principal_id,
            removed_personal_secrets = removed,
            "member revoked"
        );
        Ok(removed)
    }

    pub async fn list_members(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<WrappedKeyRecord>, FetchError> {
        self.authorize(workspace_id, Action::ReadSecrets).await?;
        Ok(self.store.list_for_workspace(workspace_id).await?)
    }

    // ── secrets ─────────────────────────────────────────────────────────────

    pub async fn set_secret(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        name: &str,
        value: &str,
        visibility: Visibility,
    ) -> Result<(), SecretError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::WriteSecrets).await?;
        let locator = self.locator(workspace_id, environment, name, visibility);
        self.store
            .put_secret(&seal_secret(&key, locator, value)?)
            .await?;

        debug!(
            workspace_id = %workspace_id,
            environment = %environment,
            visibility = %visibility,
            "secret saved"
        );
        Ok(())
    }

    /// Save every entry under one unlock, reporting per entry name.
    pub async fn set_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        entries: &[SecretEntry],
    ) -> Result<BatchReport<String, SecretError>, SecretError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::WriteSecrets).await?;

        let mut report = BatchReport::default();
        for entry in entries {
            let locator = self.locator(workspace_id, environment, &entry.name, entry.visibility);
            let outcome = match seal_secret(&key, locator, &entry.value) {
                Ok(record) => self.store.put_secret(&record).await.map_err(SecretError::from),
                Err(e) => Err(SecretError::from(e)),
            };
            report.record(entry.name.clone(), outcome);
        }

        debug!(
            workspace_id = %workspace_id,
            environment = %environment,
            saved = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk save finished"
        );
        Ok(report)
    }

    /// Encrypted records visible to this principal: shared plus its own personal ones.
    pub async fn get_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
    ) -> Result<Vec<SecretRecord>, FetchError> {
        self.authorize(workspace_id, Action::ReadSecrets).await?;
        Ok(self
            .store
            .list_secrets(workspace_id, environment, self.identity.principal_id())
            .await?)
    }

    /// [`Self::get_secrets`], decrypted.
    pub async fn reveal_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
    ) -> Result<Vec<RevealedSecret>, FetchError> {
        let key = self.unlock(workspace_id).await?;
        let records = self.get_secrets(workspace_id, environment).await?;

        records
            .iter()
            .map(|record| -> Result<RevealedSecret, FetchError> {
                Ok(RevealedSecret {
                    name: record.name().to_string(),
                    scope: record.scope().clone(),
                    value: open_secret(&key, record)?,
                })
            })
            .collect()
    }

    /// The effective value of `name`: this principal's personal record if any, else the
    /// shared one.
    pub async fn reveal_secret(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        name: &str,
    ) -> Result<Zeroizing<String>, SecretError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::ReadSecrets).await?;
        let records = self
            .store
            .list_secrets(workspace_id, environment, self.identity.principal_id())
            .await?;
        let record = effective_secrets(records, self.identity.principal_id())
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;

        Ok(open_secret(&key, &record)?)
    }

    /// Personal deletes only ever touch this principal's own record.
    pub async fn delete_secret(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        name: &str,
        visibility: Visibility,
    ) -> Result<(), SecretError> {
        self.authorize(workspace_id, Action::WriteSecrets).await?;
        let locator = self.locator(workspace_id, environment, name, visibility);
        self.store.delete_secret(&locator).await?;
        Ok(())
    }

    /// Move a secret between shared and this principal's personal scope.
    ///
    /// The value is re-sealed under the new scope, written, and only then is the old
    /// record removed. An existing record in the target scope is never replaced.
    pub async fn change_visibility(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        name: &str,
        from: Visibility,
        to: Visibility,
    ) -> Result<(), SecretError> {
        if from == to {
            return Ok(());
        }
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::WriteSecrets).await?;

        let old = self.locator(workspace_id, environment, name, from);
        let record = self
            .store
            .get_secret(&old)
            .await?
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;

        let new = self.locator(workspace_id, environment, name, to);
        if self.store.get_secret(&new).await?.is_some() {
            return Err(SecretError::AlreadyExists(name.to_string()));
        }

        let value = open_secret(&key, &record)?;
        self.store
            .put_secret(&seal_secret(&key, new, &value)?)
            .await?;
        self.store.delete_secret(&old).await?;

        info!(
            workspace_id = %workspace_id,
            environment = %environment,
            from = %from,
            to = %to,
            "secret visibility changed"
        );
        Ok(())
    }

    // ── integrations ────────────────────────────────────────────────────────

    pub async fn add_integration(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
        provider: &str,
        target: &str,
        credentials: Vec<u8>,
    ) -> Result<IntegrationAuthorization, IntegrationError> {
        self.authorize(workspace_id, Action::ManageIntegrations)
            .await?;
        let integration = IntegrationAuthorization {
            id: IntegrationId::new(),
            workspace_id: workspace_id.clone(),
            environment,
            provider: provider.to_string(),
            target: target.to_string(),
            credentials,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.put_integration(&integration).await?;

        info!(
            workspace_id = %workspace_id,
            environment = %environment,
            integration_id = %integration.id,
            provider = %provider,
            "integration added"
        );
        Ok(integration)
    }

    pub async fn list_integrations(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<IntegrationAuthorization>, IntegrationError> {
        self.authorize(workspace_id, Action::ManageIntegrations)
            .await?;
        Ok(self.store.list_integrations(workspace_id).await?)
    }

    /// Pause or resume an integration of `workspace_id`. Ids belonging to another
    /// workspace are reported as not found.
    pub async fn set_integration_active(
        &self,
        workspace_id: &WorkspaceId,
        id: &IntegrationId,
        is_active: bool,
    ) -> Result<(), IntegrationError> {
        self.authorize(workspace_id, Action::ManageIntegrations)
            .await?;
        let integration = self.store.get_integration(id).await?;
        if &integration.workspace_id != workspace_id {
            return Err(StoreError::NotFound.into());
        }
        self.store.set_integration_active(id, is_active).await?;

        info!(
            workspace_id = %workspace_id,
            integration_id = %id,
            is_active,
            "integration toggled"
        );
        Ok(())
    }

    /// Decrypt this principal's effective view of `environment` and deliver it to the
    /// environment's active integrations.
    pub async fn push_secrets(
        &self,
        workspace_id: &WorkspaceId,
        environment: Environment,
    ) -> Result<PushReport, PushError> {
        let key = self.unlock(workspace_id).await?;
        self.authorize(workspace_id, Action::ReadSecrets).await?;
        self.pipeline
            .push(
                self.store.as_ref(),
                &key,
                workspace_id,
                environment,
                self.identity.principal_id(),
            )
            .await
    }
}
