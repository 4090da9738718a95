//! Membership authority seam.
//!
//! Nothing is written or revealed until an [`AccessPolicy`] has said the acting
//! principal may do so. Deployments with a real membership service plug it in
//! here; [`KeyHolderPolicy`] is the self-contained default.

use std::fmt;
use std::sync::Arc;

use envseal_storage::{PrincipalId, WorkspaceId, WrappedKeyStore};

use crate::error::{AccessDenied, PolicyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GrantAccess,
    RevokeAccess,
    WriteSecrets,
    ReadSecrets,
    ManageIntegrations,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::GrantAccess => "grant access",
            Action::RevokeAccess => "revoke access",
            Action::WriteSecrets => "write secrets",
            Action::ReadSecrets => "read secrets",
            Action::ManageIntegrations => "manage integrations",
        })
    }
}

#[async_trait::async_trait]
pub trait AccessPolicy: Send + Sync {
    /// `Ok(())` if `actor` may perform `action` in `workspace_id`.
    async fn authorize(
        &self,
        workspace_id: &WorkspaceId,
        actor: &PrincipalId,
        action: Action,
    ) -> Result<(), PolicyError>;
}

/// Authorizes every action for principals holding a wrapped key record in the workspace.
pub struct KeyHolderPolicy<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> KeyHolderPolicy<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<S> AccessPolicy for KeyHolderPolicy<S>
where
    S: WrappedKeyStore + ?Sized,
{
    async fn authorize(
        &self,
        workspace_id: &WorkspaceId,
        actor: &PrincipalId,
        action: Action,
    ) -> Result<(), PolicyError> {
        match self.store.get(workspace_id, actor).await? {
            Some(_) => Ok(()),
            None => Err(AccessDenied {
                workspace_id: workspace_id.clone(),
                principal_id: actor.clone(),
                action,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envseal_storage::{MockWrappedKeyStore, StoreError, WrappedKeyRecord};

    fn record(ws: &WorkspaceId, recipient: &PrincipalId) -> WrappedKeyRecord {
        WrappedKeyRecord {
            workspace_id: ws.clone(),
            recipient_id: recipient.clone(),
            sender_id: recipient.clone(),
            ciphertext: vec![1; 48],
            nonce: vec![2; 24],
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn key_holders_are_authorized() {
        let ws = WorkspaceId::new();
        let holder = PrincipalId::new();
        let outsider = PrincipalId::new();

        let mut store = MockWrappedKeyStore::new();
        let holder_id = holder.clone();
        store.expect_get().returning(move |ws, recipient| {
            Ok((*recipient == holder_id).then(|| record(ws, recipient)))
        });
        let policy = KeyHolderPolicy::new(Arc::new(store));

        policy
            .authorize(&ws, &holder, Action::WriteSecrets)
            .await
            .unwrap();

        let err = policy
            .authorize(&ws, &outsider, Action::GrantAccess)
            .await
            .unwrap_err();
        match err {
            PolicyError::Denied(denied) => {
                assert_eq!(denied.principal_id, outsider);
                assert_eq!(denied.action, Action::GrantAccess);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_is_not_a_denial() {
        let mut store = MockWrappedKeyStore::new();
        store
            .expect_get()
            .returning(|_, _| Err(StoreError::Backend("disk full".into())));
        let policy = KeyHolderPolicy::new(Arc::new(store));

        let err = policy
            .authorize(&WorkspaceId::new(), &PrincipalId::new(), Action::ReadSecrets)
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::Store(_)));
    }

    #[test]
    fn actions_read_as_verbs() {
        assert_eq!(Action::ManageIntegrations.to_string(), "manage integrations");
    }
}
