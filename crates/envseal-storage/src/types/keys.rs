//! Wrapped workspace key types.

use chrono::{DateTime, Utc};

use super::{PrincipalId, WorkspaceId};

/// One member's copy of the workspace key, sealed for their public key.
///
/// At most one current record exists per (workspace, recipient). Records are
/// replaced wholesale, never edited in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedKeyRecord {
    pub workspace_id: WorkspaceId,
    pub recipient_id: PrincipalId,
    pub sender_id: PrincipalId,
    pub ciphertext: Vec<u8>, // workspace key sealed under ECDH(sender, recipient)
    pub nonce: Vec<u8>,      // 24-byte nonce for wrapping
    pub created_at: DateTime<Utc>,
}
