//! Identity gateway interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

/// Opaque authentication provider.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    async fn current_user(&self) -> Option<UserProfile>;
}

/// Gateway that always reports the same user (or nobody).
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity {
    user: Option<UserProfile>,
}

impl FixedIdentity {
    pub fn signed_in(user: UserProfile) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl IdentityGateway for FixedIdentity {
    async fn current_user(&self) -> Option<UserProfile> {
        self.user.clone()
    }
}
