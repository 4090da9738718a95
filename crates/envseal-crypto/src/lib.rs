//! Cryptographic primitives for envseal.
//!
//! Two layers live here:
//!
//! - key wrapping: a workspace key is sealed for one recipient using static
//!   X25519 ECDH between the sender's private key and the recipient's public key,
//!   followed by XChaCha20-Poly1305.
//! - value encryption: individual secret values are sealed with XChaCha20-Poly1305
//!   directly under the workspace key.
//!
//! Every seal draws a fresh 24-byte nonce from the OS RNG. Nothing in this crate
//! holds state, so all functions are safe to call concurrently.

use chacha20poly1305::{aead::Aead, KeyInit};
use rand_core::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of workspace keys and X25519 keys.
pub const KEY_LEN: usize = 32;

/// Length of an XChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 24;

const WRAP_DOMAIN: &[u8] = b"envseal/workspace-key-wrap/v1";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("public key is a low-order point")]
    NonContributory,
    #[error("workspace key must not be all zeroes")]
    ZeroKey,
    #[error("AEAD encryption failed")]
    SealFailed(chacha20poly1305::aead::Error),
    #[error("AEAD authentication failed")]
    AuthenticationFailed(chacha20poly1305::aead::Error),
}

fn check_len(what: &'static str, expected: usize, bytes: &[u8]) -> Result<(), CryptoError> {
    if bytes.len() != expected {
        return Err(CryptoError::InvalidLength {
            what,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────────
// Workspace key
// ──────────────────────────────────────────────────────────────────────────────

/// Symmetric key protecting every secret value in one workspace.
///
/// Neither `Clone` nor `Debug`. Wiped on drop.
#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct WorkspaceKey(Zeroizing<[u8; KEY_LEN]>);

impl WorkspaceKey {
    /// Generate a fresh random workspace key.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand_core::OsRng.fill_bytes(key.as_mut());
        Self(key)
    }

    /// Rebuild a key from unwrapped bytes. Rejects wrong lengths and the all-zero key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        check_len("workspace key", KEY_LEN, bytes)?;
        if bytes.iter().all(|b| *b == 0) {
            return Err(CryptoError::ZeroKey);
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Random nonce carried next to every ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    fn random() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand_core::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        check_len("nonce", NONCE_LEN, bytes)?;
        let mut array = [0u8; NONCE_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

pub struct Ciphertext(pub Vec<u8>);

fn seal(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Nonce, Ciphertext), CryptoError> {
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&chacha20poly1305::Key::from(*key));
    let nonce = Nonce::random();

    let ct = cipher
        .encrypt(
            &chacha20poly1305::XNonce::from(nonce.0),
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(CryptoError::SealFailed)?;

    Ok((nonce, Ciphertext(ct)))
}

fn open(
    key: &[u8; KEY_LEN],
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let nonce = Nonce::from_slice(nonce)?;
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&chacha20poly1305::Key::from(*key));

    // Tag verification inside the AEAD is constant-time.
    let pt = cipher
        .decrypt(
            &chacha20poly1305::XNonce::from(nonce.0),
            chacha20poly1305::aead::Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(CryptoError::AuthenticationFailed)?;

    Ok(Zeroizing::new(pt))
}

// ──────────────────────────────────────────────────────────────────────────────
// SecretCipher
// ──────────────────────────────────────────────────────────────────────────────

/// Encrypt one secret value under the workspace key.
pub fn encrypt_value(
    plaintext: &[u8],
    key: &WorkspaceKey,
    aad: &[u8],
) -> Result<(Nonce, Ciphertext), CryptoError> {
    seal(key.as_bytes(), plaintext, aad)
}

/// Decrypt one secret value. Fails on a wrong key, tampered ciphertext, or AAD mismatch.
pub fn decrypt_value(
    ciphertext: &[u8],
    nonce: &[u8],
    key: &WorkspaceKey,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    open(key.as_bytes(), ciphertext, nonce, aad)
}

// ──────────────────────────────────────────────────────────────────────────────
// X25519 identity keypairs
// ──────────────────────────────────────────────────────────────────────────────

/// Long-lived identity keypair of a principal. The private half never leaves the client.
pub struct Keypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl Keypair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand_core::OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Construct keypair from secret key bytes (e.g., from config file)
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        check_len("private key", KEY_LEN, bytes)?;
        let mut array = Zeroizing::new([0u8; KEY_LEN]);
        array.copy_from_slice(bytes);
        let secret = StaticSecret::from(*array);
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Secret key bytes for local persistence.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; KEY_LEN]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_bytes(&self) -> [u8; KEY_LEN] {
        *self.public.as_bytes()
    }

    /// Derive the symmetric wrapping key shared with `their_public`.
    fn wrapping_key(&self, their_public: &PublicKey) -> Result<WrappingKey, CryptoError> {
        let shared = self.secret.diffie_hellman(their_public);
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }

        let mut hasher = Sha256::new();
        hasher.update(WRAP_DOMAIN);
        hasher.update(shared.as_bytes());
        Ok(WrappingKey(Zeroizing::new(hasher.finalize().into())))
    }
}

impl zeroize::ZeroizeOnDrop for Keypair {}

#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
struct WrappingKey(Zeroizing<[u8; KEY_LEN]>);

/// Construct a public key from bytes (e.g., from the principal directory)
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    check_len("public key", KEY_LEN, bytes)?;
    let mut array = [0u8; KEY_LEN];
    array.copy_from_slice(bytes);
    Ok(PublicKey::from(array))
}

// ──────────────────────────────────────────────────────────────────────────────
// KeyCodec
// ──────────────────────────────────────────────────────────────────────────────

/// Wrap a workspace key for `recipient_public` on behalf of `sender`.
pub fn wrap_key(
    key: &WorkspaceKey,
    recipient_public: &[u8],
    sender: &Keypair,
    aad: &[u8],
) -> Result<(Nonce, Ciphertext), CryptoError> {
    let recipient = public_key_from_bytes(recipient_public)?;
    let wrapping = sender.wrapping_key(&recipient)?;
    seal(&wrapping.0, key.as_bytes(), aad)
}

/// Unwrap a workspace key sealed by the holder of `sender_public` for `recipient`.
///
/// Any mismatch (other recipient, other sender, flipped byte, wrong AAD) surfaces
/// as [`CryptoError::AuthenticationFailed`].
pub fn unwrap_key(
    ciphertext: &[u8],
    nonce: &[u8],
    sender_public: &[u8],
    recipient: &Keypair,
    aad: &[u8],
) -> Result<WorkspaceKey, CryptoError> {
    let sender = public_key_from_bytes(sender_public)?;
    let wrapping = recipient.wrapping_key(&sender)?;
    let plaintext = open(&wrapping.0, ciphertext, nonce, aad)?;
    WorkspaceKey::from_bytes(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const AAD: &[u8] = b"workspace:ws-123";

    // Resolves to the inherent method only when `T: Debug`.
    struct DebugCheck<T>(std::marker::PhantomData<T>);
    trait NotDebug {
        fn implements_debug(&self) -> bool {
            false
        }
    }
    impl<T> NotDebug for DebugCheck<T> {}
    impl<T: std::fmt::Debug> DebugCheck<T> {
        fn implements_debug(&self) -> bool {
            true
        }
    }

    #[test]
    fn sensitive_types_impl_zeroize_and_hide_debug() {
        fn assert_zeroize<T: zeroize::Zeroize>() {}
        assert_zeroize::<WorkspaceKey>();

        assert!(!DebugCheck::<WorkspaceKey>(std::marker::PhantomData).implements_debug());
        assert!(!DebugCheck::<Keypair>(std::marker::PhantomData).implements_debug());
        assert!(DebugCheck::<Nonce>(std::marker::PhantomData).implements_debug());
    }

    // ───────────────────────────── KeyCodec ─────────────────────────────

    #[test]
    fn wrap_unwrap_roundtrip() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();

        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();
        let unwrapped =
            unwrap_key(&wrapped.0, &nonce.0, &alice.public_key_bytes(), &bob, AAD).unwrap();

        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn self_wrap_roundtrip() {
        let alice = Keypair::generate();
        let key = WorkspaceKey::generate();

        let (nonce, wrapped) = wrap_key(&key, &alice.public_key_bytes(), &alice, AAD).unwrap();
        let unwrapped =
            unwrap_key(&wrapped.0, &nonce.0, &alice.public_key_bytes(), &alice, AAD).unwrap();

        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn unwrap_fails_for_other_recipient() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let eve = Keypair::generate();
        let key = WorkspaceKey::generate();

        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();
        let err = unwrap_key(&wrapped.0, &nonce.0, &alice.public_key_bytes(), &eve, AAD)
            .err()
            .unwrap();

        assert!(matches!(err, CryptoError::AuthenticationFailed(_)));
    }

    #[test]
    fn unwrap_fails_for_wrong_claimed_sender() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let mallory = Keypair::generate();
        let key = WorkspaceKey::generate();

        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();

        assert!(
            unwrap_key(&wrapped.0, &nonce.0, &mallory.public_key_bytes(), &bob, AAD).is_err()
        );
    }

    #[test]
    fn unwrap_fails_on_any_flipped_byte() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();
        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();

        for i in 0..wrapped.0.len() {
            let mut tampered = wrapped.0.clone();
            tampered[i] ^= 0x01;
            assert!(
                unwrap_key(&tampered, &nonce.0, &alice.public_key_bytes(), &bob, AAD).is_err(),
                "flipping byte {} should fail authentication",
                i
            );
        }
    }

    #[test]
    fn unwrap_fails_with_wrong_aad() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();
        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();

        assert!(unwrap_key(
            &wrapped.0,
            &nonce.0,
            &alice.public_key_bytes(),
            &bob,
            b"workspace:other"
        )
        .is_err());
    }

    #[test]
    fn wrap_rejects_malformed_public_keys() {
        let alice = Keypair::generate();
        let key = WorkspaceKey::generate();

        let err = wrap_key(&key, &[7u8; 31], &alice, AAD).err().unwrap();
        assert!(matches!(
            err,
            CryptoError::InvalidLength {
                expected: 32,
                actual: 31,
                ..
            }
        ));

        // The identity point yields an all-zero shared secret.
        let err = wrap_key(&key, &[0u8; 32], &alice, AAD).err().unwrap();
        assert!(matches!(err, CryptoError::NonContributory));
    }

    #[test]
    fn unwrap_rejects_bad_nonce_length() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();
        let (_, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();

        let err = unwrap_key(&wrapped.0, &[0u8; 12], &alice.public_key_bytes(), &bob, AAD)
            .err()
            .unwrap();
        assert!(matches!(err, CryptoError::InvalidLength { what: "nonce", .. }));
    }

    #[test]
    fn unwrap_rejects_truncated_ciphertext() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();
        let (nonce, wrapped) = wrap_key(&key, &bob.public_key_bytes(), &alice, AAD).unwrap();

        let sender = alice.public_key_bytes();
        assert!(unwrap_key(&wrapped.0[..10], &nonce.0, &sender, &bob, AAD).is_err());
        assert!(unwrap_key(&[], &nonce.0, &sender, &bob, AAD).is_err());
    }

    #[test]
    fn keypair_from_secret_bytes_restores_public_key() {
        let kp = Keypair::generate();
        let restored = Keypair::from_secret_bytes(&*kp.secret_key_bytes()).unwrap();
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());

        assert!(Keypair::from_secret_bytes(&[1u8; 16]).is_err());
    }

    #[test]
    fn public_key_from_bytes_validates_length() {
        assert!(public_key_from_bytes(&[0u8; 31]).is_err());
        assert!(public_key_from_bytes(&[0u8; 33]).is_err());
        assert!(public_key_from_bytes(&[9u8; 32]).is_ok());
    }

    #[test]
    fn wrap_nonces_never_repeat() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let key = WorkspaceKey::generate();
        let recipient = bob.public_key_bytes();

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let (nonce, _) = wrap_key(&key, &recipient, &alice, AAD).unwrap();
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }

    // ───────────────────────────── SecretCipher ─────────────────────────────

    #[test]
    fn value_roundtrip() {
        let key = WorkspaceKey::generate();
        let aad = b"secret:ws:dev:shared:DB_PASSWORD";

        let (nonce, ct) = encrypt_value(b"s3cr3t", &key, aad).unwrap();
        let pt = decrypt_value(&ct.0, &nonce.0, &key, aad).unwrap();

        assert_eq!(&pt[..], b"s3cr3t");
    }

    #[test]
    fn value_decrypt_fails_with_other_key() {
        let key = WorkspaceKey::generate();
        let other = WorkspaceKey::generate();
        let (nonce, ct) = encrypt_value(b"hello", &key, b"aad").unwrap();

        let err = decrypt_value(&ct.0, &nonce.0, &other, b"aad").err().unwrap();
        assert!(matches!(err, CryptoError::AuthenticationFailed(_)));
    }

    #[test]
    fn value_decrypt_fails_on_tamper() {
        let key = WorkspaceKey::generate();
        let (nonce, mut ct) = encrypt_value(b"hello", &key, b"aad").unwrap();
        ct.0[0] ^= 0x01;
        assert!(decrypt_value(&ct.0, &nonce.0, &key, b"aad").is_err());

        let (nonce, ct) = encrypt_value(b"hello", &key, b"aad").unwrap();
        let mut bad_nonce = nonce;
        bad_nonce.0[0] ^= 0x01;
        assert!(decrypt_value(&ct.0, &bad_nonce.0, &key, b"aad").is_err());
        assert!(decrypt_value(&ct.0, &nonce.0, &key, b"other").is_err());
    }

    #[test]
    fn empty_value_ok() {
        let key = WorkspaceKey::generate();
        let (nonce, ct) = encrypt_value(b"", &key, b"aad").unwrap();
        let pt = decrypt_value(&ct.0, &nonce.0, &key, b"aad").unwrap();
        assert!(pt.is_empty());
    }

    #[test]
    fn value_nonces_never_repeat() {
        let key = WorkspaceKey::generate();

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let (nonce, _) = encrypt_value(b"v", &key, b"aad").unwrap();
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }

    #[test]
    fn workspace_key_from_bytes_validates() {
        assert!(matches!(
            WorkspaceKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::ZeroKey)
        ));
        assert!(WorkspaceKey::from_bytes(&[1u8; 31]).is_err());
        assert!(WorkspaceKey::from_bytes(&[1u8; 32]).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_key_survives_wrap_unwrap(bytes in any::<[u8; 32]>()) {
            prop_assume!(bytes.iter().any(|b| *b != 0));
            let key = WorkspaceKey::from_bytes(&bytes).unwrap();
            let sender = Keypair::generate();
            let recipient = Keypair::generate();

            let (nonce, wrapped) =
                wrap_key(&key, &recipient.public_key_bytes(), &sender, AAD).unwrap();
            let unwrapped =
                unwrap_key(&wrapped.0, &nonce.0, &sender.public_key_bytes(), &recipient, AAD)
                    .unwrap();

            prop_assert_eq!(unwrapped.as_bytes(), &bytes);
        }

        #[test]
        fn any_value_survives_encrypt_decrypt(value in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = WorkspaceKey::generate();
            let (nonce, ct) = encrypt_value(&value, &key, b"aad").unwrap();
            let pt = decrypt_value(&ct.0, &nonce.0, &key, b"aad").unwrap();
            prop_assert_eq!(&pt[..], &value[..]);
        }
    }
}
