//! User-facing notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Tells an owner their book was rented.
    RentalToOwner,
    /// Tells a renter when the book is due.
    RentalToRenter,
    /// Tells a renter the owner confirmed the return.
    ReturnToRenter,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RentalToOwner => "rental_to_owner",
            Self::RentalToRenter => "rental_to_renter",
            Self::ReturnToRenter => "return_to_renter",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rental_to_owner" => Ok(Self::RentalToOwner),
            "rental_to_renter" => Ok(Self::RentalToRenter),
            "return_to_renter" => Ok(Self::ReturnToRenter),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub book_id: BookId,
    /// Timestamp of the rental transition this notification refers to.
    pub rental_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        book_id: BookId,
        rental_at: DateTime<Utc>,
        message: String,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient,
            message,
            kind,
            book_id,
            rental_at,
            created_at: Utc::now(),
            read: false,
        }
    }
}

/// Change pushed to live notification subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationChange {
    Added(Notification),
    Read {
        id: NotificationId,
        recipient: UserId,
    },
}

impl NotificationChange {
    pub fn recipient(&self) -> &UserId {
        match self {
            Self::Added(n) => &n.recipient,
            Self::Read { recipient, .. } => recipient,
        }
    }
}
