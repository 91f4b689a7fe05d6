/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, invite acceptance and the current user
/// - `companies`: Company lifecycle and tenant switching
/// - `members`: Company membership management
/// - `invites`: Invite issuance, listing, preview, rejection and cancellation

pub mod auth;
pub mod companies;
pub mod health;
pub mod invites;
pub mod members;

use serde::{Deserialize, Serialize};

/// Body for operations that only confirm success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
