//! Principal (member identity) types.

use chrono::{DateTime, Utc};

use super::PrincipalId;

/// A member's public identity as published to the directory.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub public_key: Vec<u8>, // X25519 public key (32 bytes)
    pub created_at: DateTime<Utc>,
}
