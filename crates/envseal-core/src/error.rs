use envseal_crypto::CryptoError;
use envseal_storage::{PrincipalId, StoreError, WorkspaceId};
use thiserror::Error;

use crate::policy::Action;

/// The membership authority refused an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("principal {principal_id} may not {action} in workspace {workspace_id}")]
pub struct AccessDenied {
    pub workspace_id: WorkspaceId,
    pub principal_id: PrincipalId,
    pub action: Action,
}

/// Outcome of consulting an [`AccessPolicy`](crate::AccessPolicy) that did not authorize.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum KeyUnavailableReason {
    #[error("no wrapped key record")]
    MissingRecord,
    #[error("sender {0} is not in the principal directory")]
    UnknownSender(PrincipalId),
    #[error("wrapped key does not open: {0}")]
    Unwrap(#[source] CryptoError),
}

/// The acting principal cannot produce the workspace key.
#[derive(Debug, Error)]
#[error("workspace key unavailable to {principal_id} in workspace {workspace_id}: {reason}")]
pub struct KeyUnavailable {
    pub workspace_id: WorkspaceId,
    pub principal_id: PrincipalId,
    pub reason: KeyUnavailableReason,
}

#[derive(Debug, Error)]
pub enum UnlockError {
    #[error(transparent)]
    Unavailable(#[from] KeyUnavailable),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure sealing or opening a single secret value.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("secret '{name}': {source}")]
    Crypto {
        name: String,
        #[source]
        source: CryptoError,
    },
    #[error("secret '{0}' is not valid UTF-8")]
    InvalidUtf8(String),
    #[error(transparent)]
    Record(#[from] StoreError),
}

/// Errors from membership changes: bootstrap, onboarding, and revocation.
#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("conflict: {0}")]
    Conflict(AccessDenied),
    #[error("conflict: workspace {0} already has key holders")]
    WorkspaceExists(WorkspaceId),
    #[error(transparent)]
    KeyUnavailable(KeyUnavailable),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("conflict: {0}")]
    Conflict(AccessDenied),
    #[error(transparent)]
    KeyUnavailable(KeyUnavailable),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("conflict: {0}")]
    Conflict(AccessDenied),
    #[error(transparent)]
    KeyUnavailable(KeyUnavailable),
    #[error("secret '{0}' not found")]
    NotFound(String),
    #[error("secret '{0}' already exists in the target scope")]
    AlreadyExists(String),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("conflict: {0}")]
    Conflict(AccessDenied),
    #[error(transparent)]
    KeyUnavailable(KeyUnavailable),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("conflict: {0}")]
    Conflict(AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}

macro_rules! from_policy_error {
    ($($err:ident),+) => {$(
        impl From<PolicyError> for $err {
            fn from(e: PolicyError) -> Self {
                match e {
                    PolicyError::Denied(denied) => $err::Conflict(denied),
                    PolicyError::Store(e) => $err::Store(e),
                }
            }
        }
    )+};
}

macro_rules! from_unlock_error {
    ($($err:ident),+) => {$(
        impl From<UnlockError> for $err {
            fn from(e: UnlockError) -> Self {
                match e {
                    UnlockError::Unavailable(k) => $err::KeyUnavailable(k),
                    UnlockError::Store(e) => $err::Store(e),
                }
            }
        }
    )+};
}

from_policy_error!(OnboardError, FetchError, SecretError, PushError, IntegrationError);
from_unlock_error!(OnboardError, FetchError, SecretError, PushError);

/// Per-item outcome of a batch operation. Successes are already committed.
#[derive(Debug)]
pub struct BatchReport<K, E> {
    pub succeeded: Vec<K>,
    pub failed: Vec<(K, E)>,
}

impl<K, E> Default for BatchReport<K, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K, E> BatchReport<K, E> {
    pub fn record(&mut self, key: K, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => self.succeeded.push(key),
            Err(e) => self.failed.push((key, e)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Err` when at least one item failed, so callers can retry just those.
    pub fn into_result(self) -> Result<Vec<K>, PartialBatchError<K, E>> {
        if self.failed.is_empty() {
            Ok(self.succeeded)
        } else {
            Err(PartialBatchError {
                succeeded: self.succeeded,
                failed: self.failed,
            })
        }
    }
}

#[derive(Debug, Error)]
#[error("{} of {} items failed", .failed.len(), .succeeded.len() + .failed.len())]
pub struct PartialBatchError<K, E> {
    pub succeeded: Vec<K>,
    pub failed: Vec<(K, E)>,
}
