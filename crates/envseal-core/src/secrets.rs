//! Sealing secret values into records and opening them again.

use std::collections::BTreeMap;

use envseal_crypto::{decrypt_value, encrypt_value, WorkspaceKey};
use envseal_storage::{PrincipalId, SecretLocator, SecretRecord, SecretScope, Visibility};
use zeroize::Zeroizing;

use crate::error::ValueError;

/// One entry of a bulk save.
#[derive(Clone)]
pub struct SecretEntry {
    pub name: String,
    pub value: Zeroizing<String>,
    pub visibility: Visibility,
}

impl SecretEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            value: Zeroizing::new(value.into()),
            visibility,
        }
    }
}

/// A decrypted secret. Only ever exists on the client.
pub struct RevealedSecret {
    pub name: String,
    pub scope: SecretScope,
    pub value: Zeroizing<String>,
}

pub fn seal_secret(
    key: &WorkspaceKey,
    locator: SecretLocator,
    value: &str,
) -> Result<SecretRecord, ValueError> {
    let (nonce, ciphertext) =
        encrypt_value(value.as_bytes(), key, &locator.aad()).map_err(|source| {
            ValueError::Crypto {
                name: locator.name.clone(),
                source,
            }
        })?;
    Ok(SecretRecord::new(locator, nonce.0.to_vec(), ciphertext.0)?)
}

pub fn open_secret(
    key: &WorkspaceKey,
    record: &SecretRecord,
) -> Result<Zeroizing<String>, ValueError> {
    let plaintext = decrypt_value(
        record.ciphertext(),
        record.nonce(),
        key,
        &record.locator().aad(),
    )
    .map_err(|source| ValueError::Crypto {
        name: record.name().to_string(),
        source,
    })?;

    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| ValueError::InvalidUtf8(record.name().to_string()))?;
    Ok(Zeroizing::new(text.to_string()))
}

/// The requester's effective view of an environment: every shared record, with the
/// requester's own personal record replacing a shared one of the same name.
/// Other principals' personal records are dropped.
pub fn effective_secrets(records: Vec<SecretRecord>, requester: &PrincipalId) -> Vec<SecretRecord> {
    let mut by_name: BTreeMap<String, SecretRecord> = BTreeMap::new();
    for record in records {
        match record.scope() {
            SecretScope::Shared => {
                by_name.entry(record.name().to_string()).or_insert(record);
            }
            SecretScope::Personal { owner_id } if owner_id == requester => {
                by_name.insert(record.name().to_string(), record);
            }
            SecretScope::Personal { .. } => {}
        }
    }
    by_name.into_values().collect()
}
