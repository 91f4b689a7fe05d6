/// Invite e-mail notification
///
/// The invite authority hands an [`InviteEmail`] to an [`InviteNotifier`]
/// after the invite is committed and never waits for the outcome. Delivery
/// failures are logged by the caller and do not affect the invite.
///
/// - [`resend::ResendNotifier`] delivers through the Resend HTTP API.
/// - [`LogNotifier`] is used when no e-mail provider is configured.

pub mod resend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::Role;

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Everything needed to render an invite e-mail
#[derive(Debug, Clone, PartialEq)]
pub struct InviteEmail {
    pub to: String,
    pub company_name: String,
    pub sender_name: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Outbound channel for invite e-mails
#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send_invite_email(&self, email: InviteEmail) -> Result<(), NotifyError>;
}

/// Notifier that only records that nothing was sent
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl InviteNotifier for LogNotifier {
    async fn send_invite_email(&self, email: InviteEmail) -> Result<(), NotifyError> {
        warn!(to = %email.to, "E-mail delivery not configured, invite e-mail not sent");
        Ok(())
    }
}
