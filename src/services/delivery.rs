//! Message delivery
//!
//! Each run scans the current hour's bucket of scheduled messages and sends
//! every one whose delivery time has arrived. Records are only removed after
//! a successful send, so a crash or provider outage means a later run
//! retries; delivery is at-least-once.

use std::sync::Arc;

use crate::db::StoreError;
use crate::models::time;
use crate::services::message::MessageService;
use crate::services::provider::Provider;
use crate::services::user::UserService;

/// Outcome counts for one delivery run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Scans for due messages and pushes them through the provider
pub struct DeliveryService {
    users: UserService,
    messages: MessageService,
    provider: Arc<dyn Provider>,
}

impl DeliveryService {
    pub fn new(
        users: UserService,
        messages: MessageService,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            users,
            messages,
            provider,
        }
    }

    /// One delivery pass over the current hour bucket.
    pub async fn run_once(&self) -> Result<DeliveryReport, StoreError> {
        let now = time::now();
        let bucket = time::hour_bucket(&now);
        let candidates = self.messages.due_in_bucket(&bucket).await?;
        tracing::debug!(bucket = %bucket, candidates = candidates.len(), "Delivery scan");

        let mut report = DeliveryReport::default();
        for candidate in candidates {
            // Reload by id: the scan snapshot may be stale by the time we
            // get here.
            let Some(message) = self.messages.get(&candidate.id).await? else {
                report.skipped += 1;
                continue;
            };
            if !message.is_due(&now) {
                report.skipped += 1;
                continue;
            }
            let Some(user) = self.users.get(&message.user_id).await? else {
                tracing::warn!(message = %message.id, "Skipping message with no owner");
                report.skipped += 1;
                continue;
            };

            match self
                .provider
                .send_message(&user.provider_token, &message.recipient, &message.body)
                .await
            {
                Ok(()) => {
                    self.users.remove_message(&user.id, &message.id).await?;
                    self.messages.delete(&message).await?;
                    tracing::info!(message = %message.id, "Delivered message");
                    report.sent += 1;
                }
                Err(e) => {
                    // Leave the record in place; the next run retries
                    tracing::warn!(message = %message.id, error = %e, "Delivery failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
