//! Integration authorization types.

use chrono::{DateTime, Utc};
use std::fmt;

use super::{Environment, IntegrationId, WorkspaceId};

/// Where decrypted values for one workspace environment may be forwarded.
///
/// `credentials` are opaque to envseal and only handed to the sink transport.
#[derive(Clone)]
pub struct IntegrationAuthorization {
    pub id: IntegrationId,
    pub workspace_id: WorkspaceId,
    pub environment: Environment,
    pub provider: String, // e.g. "dotenv", "heroku"
    pub target: String,   // provider-specific destination (app name, file path)
    pub credentials: Vec<u8>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl IntegrationAuthorization {
    /// Whether this integration should receive a push for `environment`.
    pub fn accepts(&self, environment: Environment) -> bool {
        self.is_active && self.environment == environment
    }
}

impl fmt::Debug for IntegrationAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationAuthorization")
            .field("id", &self.id)
            .field("workspace_id", &self.workspace_id)
            .field("environment", &self.environment)
            .field("provider", &self.provider)
            .field("target", &self.target)
            .field("credentials", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .finish()
    }
}
