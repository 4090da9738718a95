//! Pushing decrypted secrets to external integrations.
//!
//! Decryption happens here, on the client. Each active integration for the pushed
//! environment is delivered to concurrently and independently; a failing or slow
//! sink only fails its own entry in the [`PushReport`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use envseal_crypto::WorkspaceKey;
use envseal_storage::{
    Environment, IntegrationAuthorization, IntegrationId, IntegrationStore, PrincipalId,
    SecretRepository, WorkspaceId,
};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{BatchReport, PushError};
use crate::secrets::{effective_secrets, open_secret};

/// Name → plaintext value handed to a sink.
pub type PlainSecrets = BTreeMap<String, Zeroizing<String>>;

pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no transport for provider '{0}'")]
    UnsupportedProvider(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("rejected by sink: {0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Delivers a plaintext mapping to one kind of external sink.
#[async_trait::async_trait]
pub trait SinkTransport: Send + Sync {
    async fn deliver(
        &self,
        integration: &IntegrationAuthorization,
        secrets: &PlainSecrets,
    ) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub struct PushReport {
    pub workspace_id: WorkspaceId,
    pub environment: Environment,
    pub secret_count: usize,
    pub sinks: BatchReport<IntegrationId, SinkError>,
}

pub struct IntegrationSyncPipeline {
    transports: HashMap<String, Arc<dyn SinkTransport>>,
    timeout: Duration,
}

impl Default for IntegrationSyncPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_TIMEOUT)
    }
}

impl IntegrationSyncPipeline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            transports: HashMap::new(),
            timeout,
        }
    }

    /// Route integrations whose `provider` equals `provider` to `transport`.
    pub fn with_transport(
        mut self,
        provider: impl Into<String>,
        transport: Arc<dyn SinkTransport>,
    ) -> Self {
        self.transports.insert(provider.into(), transport);
        self
    }

    /// Decrypt `requester`'s effective view of `environment` and deliver it to every
    /// active integration of that environment.
    ///
    /// Any decryption failure aborts before a single sink is contacted.
    pub async fn push<S>(
        &self,
        store: &S,
        workspace_key: &WorkspaceKey,
        workspace_id: &WorkspaceId,
        environment: Environment,
        requester: &PrincipalId,
    ) -> Result<PushReport, PushError>
    where
        S: SecretRepository + IntegrationStore + ?Sized,
    {
        let records = store
            .list_secrets(workspace_id, environment, requester)
            .await?;

        let mut plain = PlainSecrets::new();
        for record in effective_secrets(records, requester) {
            let value = open_secret(workspace_key, &record)?;
            plain.insert(record.name().to_string(), value);
        }

        let integrations: Vec<_> = store
            .list_integrations(workspace_id)
            .await?
            .into_iter()
            .filter(|i| i.accepts(environment))
            .collect();

        debug!(
            workspace_id = %workspace_id,
            environment = %environment,
            secrets = plain.len(),
            sinks = integrations.len(),
            "pushing secrets"
        );

        let outcomes = join_all(
            integrations
                .iter()
                .map(|integration| self.deliver_one(integration, &plain)),
        )
        .await;

        let mut sinks = BatchReport::default();
        for (integration, outcome) in integrations.iter().zip(outcomes) {
            match &outcome {
                Ok(()) => info!(
                    workspace_id = %workspace_id,
                    environment = %environment,
                    integration_id = %integration.id,
                    provider = %integration.provider,
                    "secrets pushed"
                ),
                Err(e) => warn!(
                    workspace_id = %workspace_id,
                    environment = %environment,
                    integration_id = %integration.id,
                    provider = %integration.provider,
                    error = %e,
                    "push to integration failed"
                ),
            }
            sinks.record(integration.id.clone(), outcome);
        }

        Ok(PushReport {
            workspace_id: workspace_id.clone(),
            environment,
            secret_count: plain.len(),
            sinks,
        })
    }

    async fn deliver_one(
        &self,
        integration: &IntegrationAuthorization,
        secrets: &PlainSecrets,
    ) -> Result<(), SinkError> {
        let transport = self
            .transports
            .get(&integration.provider)
            .ok_or_else(|| SinkError::UnsupportedProvider(integration.provider.clone()))?;

        tokio::time::timeout(self.timeout, transport.deliver(integration, secrets))
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))?
    }
}
