use async_trait::async_trait;
use thiserror::Error;

use crate::models::Report;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound notification seam for the resolve flow. Resolution proceeds even
/// when the notice cannot be sent; callers log and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn resolution_notice(&self, report: &Report) -> Result<(), NotifyError>;
}

/// Records the notice in the log stream instead of sending mail.
// TODO: replace with an SMTP/API-backed notifier once a mail account exists.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn resolution_notice(&self, report: &Report) -> Result<(), NotifyError> {
        log::info!(
            "resolution notice for report {} would be sent to {}",
            report.uid,
            report.email
        );
        Ok(())
    }
}
