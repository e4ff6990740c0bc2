//! Explicit per-call user context.

use crate::error::RentalError;
use crate::interfaces::{IdentityGateway, UserProfile};
use crate::model::UserId;

/// The user on whose behalf an operation runs.
///
/// Passed to every core operation instead of living in a process-wide
/// singleton, so callers and tests choose the identity explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: UserProfile,
}

impl Session {
    pub fn new(user: UserProfile) -> Self {
        Self { user }
    }

    /// Build a session for whoever the gateway reports as signed in.
    pub async fn from_gateway(gateway: &dyn IdentityGateway) -> Result<Self, RentalError> {
        gateway
            .current_user()
            .await
            .map(Self::new)
            .ok_or(RentalError::Unauthenticated)
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}
