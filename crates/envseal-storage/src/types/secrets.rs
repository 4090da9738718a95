//! Encrypted secret types. No plaintext value ever appears here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Environment, PrincipalId, WorkspaceId};
use crate::StoreError;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Personal,
    Shared,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Personal => "personal",
            Visibility::Shared => "shared",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Visibility::Personal),
            "shared" => Ok(Visibility::Shared),
            other => Err(StoreError::InvalidRecord(format!(
                "unknown visibility '{}'",
                other
            ))),
        }
    }
}

/// Who can see a secret. Personal secrets always carry their owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "lowercase")]
pub enum SecretScope {
    Shared,
    Personal { owner_id: PrincipalId },
}

impl SecretScope {
    /// Scope for `visibility` as seen by `principal`.
    pub fn for_principal(visibility: Visibility, principal: &PrincipalId) -> Self {
        match visibility {
            Visibility::Shared => SecretScope::Shared,
            Visibility::Personal => SecretScope::Personal {
                owner_id: principal.clone(),
            },
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            SecretScope::Shared => Visibility::Shared,
            SecretScope::Personal { .. } => Visibility::Personal,
        }
    }

    pub fn owner(&self) -> Option<&PrincipalId> {
        match self {
            SecretScope::Shared => None,
            SecretScope::Personal { owner_id } => Some(owner_id),
        }
    }

    pub fn is_visible_to(&self, requester: &PrincipalId) -> bool {
        match self {
            SecretScope::Shared => true,
            SecretScope::Personal { owner_id } => owner_id == requester,
        }
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretScope::Shared => f.write_str("shared"),
            SecretScope::Personal { owner_id } => write!(f, "personal:{}", owner_id),
        }
    }
}

/// Upsert identity of a secret: (workspace, environment, scope, name).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretLocator {
    pub workspace_id: WorkspaceId,
    pub environment: Environment,
    pub scope: SecretScope,
    pub name: String,
}

impl SecretLocator {
    /// Additional authenticated data binding a value's ciphertext to this locator.
    pub fn aad(&self) -> Vec<u8> {
        format!(
            "secret:{}:{}:{}:{}",
            self.workspace_id, self.environment, self.scope, self.name
        )
        .into_bytes()
    }
}

/// Encrypted secret row, validated on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRecord {
    locator: SecretLocator,
    nonce: Vec<u8>,      // 24 bytes (XChaCha20 nonce)
    ciphertext: Vec<u8>, // AEAD ciphertext under the workspace key
    updated_at: DateTime<Utc>,
}

impl SecretRecord {
    pub fn new(
        locator: SecretLocator,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
    ) -> Result<Self, StoreError> {
        Self::from_parts(locator, nonce, ciphertext, Utc::now())
    }

    /// Rebuild a record read back from a backend.
    pub fn from_parts(
        locator: SecretLocator,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        if locator.name.trim().is_empty() {
            return Err(StoreError::InvalidRecord("secret name is empty".into()));
        }
        if nonce.len() != NONCE_LEN {
            return Err(StoreError::InvalidRecord(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        if ciphertext.len() < TAG_LEN {
            return Err(StoreError::InvalidRecord(
                "ciphertext shorter than authentication tag".into(),
            ));
        }
        Ok(Self {
            locator,
            nonce,
            ciphertext,
            updated_at,
        })
    }

    pub fn locator(&self) -> &SecretLocator {
        &self.locator
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.locator.workspace_id
    }

    pub fn environment(&self) -> Environment {
        self.locator.environment
    }

    pub fn scope(&self) -> &SecretScope {
        &self.locator.scope
    }

    pub fn name(&self) -> &str {
        &self.locator.name
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
