//! Workspace key custody on the client.
//!
//! A [`WorkspaceKey`] is only ever materialized by [`unlock_workspace_key`] (from the
//! caller's own wrapped record) or by [`bootstrap_workspace`] (fresh key, immediately
//! self-wrapped). Callers hold it for the duration of one operation and drop it.

use chrono::Utc;
use envseal_crypto::{unwrap_key, wrap_key, CryptoError, Keypair, WorkspaceKey, KEY_LEN};
use envseal_storage::{
    PrincipalDirectory, PrincipalId, StoreError, WorkspaceId, WrappedKeyRecord, WrappedKeyStore,
};
use tracing::{info, warn};

use crate::error::{KeyUnavailable, KeyUnavailableReason, OnboardError, UnlockError};

/// The acting principal: its id plus the private key held only on this client.
pub struct Identity {
    principal_id: PrincipalId,
    keypair: Keypair,
}

impl Identity {
    pub fn new(principal_id: PrincipalId, keypair: Keypair) -> Self {
        Self {
            principal_id,
            keypair,
        }
    }

    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal_id
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key_bytes(&self) -> [u8; KEY_LEN] {
        self.keypair.public_key_bytes()
    }
}

/// AAD binding a wrapped key to its workspace.
pub fn workspace_aad(workspace_id: &WorkspaceId) -> Vec<u8> {
    format!("workspace:{}", workspace_id).into_bytes()
}

/// Wrap `key` for one recipient and build the record to persist.
pub fn wrap_for_recipient(
    workspace_id: &WorkspaceId,
    key: &WorkspaceKey,
    recipient_id: &PrincipalId,
    recipient_public_key: &[u8],
    sender: &Identity,
) -> Result<WrappedKeyRecord, CryptoError> {
    let (nonce, ciphertext) = wrap_key(
        key,
        recipient_public_key,
        sender.keypair(),
        &workspace_aad(workspace_id),
    )?;

    Ok(WrappedKeyRecord {
        workspace_id: workspace_id.clone(),
        recipient_id: recipient_id.clone(),
        sender_id: sender.principal_id().clone(),
        ciphertext: ciphertext.0,
        nonce: nonce.0.to_vec(),
        created_at: Utc::now(),
    })
}

/// Recover the workspace key from `identity`'s own wrapped record.
///
/// Self-wrapped records (sender == recipient) use the identity's own public key;
/// otherwise the sender's public key comes from the principal directory.
pub(crate) async fn unlock_workspace_key<S>(
    store: &S,
    workspace_id: &WorkspaceId,
    identity: &Identity,
) -> Result<WorkspaceKey, UnlockError>
where
    S: WrappedKeyStore + PrincipalDirectory + ?Sized,
{
    let unavailable = |reason| {
        UnlockError::Unavailable(KeyUnavailable {
            workspace_id: workspace_id.clone(),
            principal_id: identity.principal_id().clone(),
            reason,
        })
    };

    let Some(record) = store.get(workspace_id, identity.principal_id()).await? else {
        return Err(unavailable(KeyUnavailableReason::MissingRecord));
    };

    let sender_public = if record.sender_id == *identity.principal_id() {
        identity.public_key_bytes().to_vec()
    } else {
        match store.get_principal(&record.sender_id).await {
            Ok(sender) => sender.public_key,
            Err(StoreError::NotFound) => {
                return Err(unavailable(KeyUnavailableReason::UnknownSender(
                    record.sender_id.clone(),
                )))
            }
            Err(e) => return Err(e.into()),
        }
    };

    unwrap_key(
        &record.ciphertext,
        &record.nonce,
        &sender_public,
        identity.keypair(),
        &workspace_aad(workspace_id),
    )
    .map_err(|e| {
        warn!(
            workspace_id = %workspace_id,
            principal_id = %identity.principal_id(),
            sender_id = %record.sender_id,
            "wrapped workspace key failed to open"
        );
        unavailable(KeyUnavailableReason::Unwrap(e))
    })
}

/// Create the first key of a workspace and self-wrap it for `creator`.
///
/// The store claims the workspace atomically, so of several concurrent creators
/// exactly one succeeds and the rest see [`OnboardError::WorkspaceExists`].
pub(crate) async fn bootstrap_workspace<S>(
    store: &S,
    workspace_id: &WorkspaceId,
    creator: &Identity,
) -> Result<(), OnboardError>
where
    S: WrappedKeyStore + ?Sized,
{
    let key = WorkspaceKey::generate();
    let record = wrap_for_recipient(
        workspace_id,
        &key,
        creator.principal_id(),
        &creator.public_key_bytes(),
        creator,
    )?;
    match store.put_first(&record).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(OnboardError::WorkspaceExists(workspace_id.clone()))
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        workspace_id = %workspace_id,
        principal_id = %creator.principal_id(),
        "workspace key created"
    );
    Ok(())
}
