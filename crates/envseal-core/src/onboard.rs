//! Granting members access to an unlocked workspace key.

use envseal_crypto::WorkspaceKey;
use envseal_storage::{PrincipalId, WorkspaceId, WrappedKeyRecord, WrappedKeyStore};
use futures::future::join_all;
use tracing::{info, warn};

use crate::error::{BatchReport, OnboardError};
use crate::keys::{wrap_for_recipient, Identity};

/// A principal to onboard together with its current public key.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub principal_id: PrincipalId,
    pub public_key: Vec<u8>,
}

/// Wraps one workspace key for new members on behalf of an acting member.
///
/// Borrows the unlocked key, so it cannot outlive the operation that unlocked it.
pub struct MembershipOnboarder<'a, S: ?Sized> {
    store: &'a S,
    workspace_id: &'a WorkspaceId,
    workspace_key: &'a WorkspaceKey,
    sender: &'a Identity,
}

impl<'a, S> MembershipOnboarder<'a, S>
where
    S: WrappedKeyStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        workspace_id: &'a WorkspaceId,
        workspace_key: &'a WorkspaceKey,
        sender: &'a Identity,
    ) -> Self {
        Self {
            store,
            workspace_id,
            workspace_key,
            sender,
        }
    }

    /// Wrap and persist. On any error nothing is written for the recipient.
    pub async fn onboard(
        &self,
        recipient_id: &PrincipalId,
        recipient_public_key: &[u8],
    ) -> Result<WrappedKeyRecord, OnboardError> {
        let record = wrap_for_recipient(
            self.workspace_id,
            self.workspace_key,
            recipient_id,
            recipient_public_key,
            self.sender,
        )
        .map_err(|e| {
            warn!(
                workspace_id = %self.workspace_id,
                recipient_id = %recipient_id,
                error = %e,
                "could not wrap workspace key for recipient"
            );
            e
        })?;

        self.store.put(&record).await?;

        info!(
            workspace_id = %self.workspace_id,
            recipient_id = %recipient_id,
            sender_id = %self.sender.principal_id(),
            "member onboarded"
        );
        Ok(record)
    }

    /// Onboard each recipient independently and concurrently.
    pub async fn onboard_all(
        &self,
        recipients: &[Recipient],
    ) -> BatchReport<PrincipalId, OnboardError> {
        let outcomes = join_all(recipients.iter().map(|r| async move {
            let outcome = self.onboard(&r.principal_id, &r.public_key).await;
            (r.principal_id.clone(), outcome.map(|_| ()))
        }))
        .await;

        let mut report = BatchReport::default();
        for (principal_id, outcome) in outcomes {
            report.record(principal_id, outcome);
        }
        if !report.is_complete() {
            warn!(
                workspace_id = %self.workspace_id,
                failed = report.failed.len(),
                succeeded = report.succeeded.len(),
                "bulk onboarding partially failed"
            );
        }
        report
    }
}
