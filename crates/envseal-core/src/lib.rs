//! Client-side core of envseal.
//!
//! Everything that touches plaintext (the workspace key, secret values, private keys)
//! lives here and runs on a trusted client. Storage backends only receive ciphertext
//! and wrap metadata through the `envseal-storage` traits.

mod client;
mod error;
mod keys;
mod onboard;
mod policy;
mod secrets;
mod sync;

pub use client::Client;
pub use error::{
    AccessDenied, BatchReport, FetchError, IntegrationError, KeyUnavailable, KeyUnavailableReason,
    OnboardError, PartialBatchError, PolicyError, PushError, SecretError, ValueError,
};
pub use keys::{workspace_aad, wrap_for_recipient, Identity};
pub use onboard::{MembershipOnboarder, Recipient};
pub use policy::{AccessPolicy, Action, KeyHolderPolicy};
pub use secrets::{effective_secrets, open_secret, seal_secret, RevealedSecret, SecretEntry};
pub use sync::{
    IntegrationSyncPipeline, PlainSecrets, PushReport, SinkError, SinkTransport,
    DEFAULT_SINK_TIMEOUT,
};
