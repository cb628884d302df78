//! User lifecycle event payloads (the JSON published on the bus).
//!
//! Wire format:
//!
//! ```text
//! { "event": "UserCreated"|"UserDeleted", "datetime": "<RFC 3339 UTC>",
//!   "id": <int>, "name": "<string>", "email": "<string>",
//!   "user_type_id": <int>, "deletion_date": "<RFC 3339 UTC>" (delete only) }
//! ```
//!
//! Fields serialize in that order; absent optional fields are omitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use userhub_core::{UserId, UserRecord, UserTypeId};

/// Kind of user lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserEventKind {
    UserCreated,
    UserDeleted,
}

impl UserEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserEventKind::UserCreated => "UserCreated",
            UserEventKind::UserDeleted => "UserDeleted",
        }
    }
}

impl core::fmt::Display for UserEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable copy of a user's fields, taken before the row may disappear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type_id: Option<UserTypeId>,
}

impl From<&UserRecord> for UserSnapshot {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type_id: Some(user.user_type_id),
        }
    }
}

/// Event payload, built fresh per operation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    event: UserEventKind,
    datetime: DateTime<Utc>,
    #[serde(flatten)]
    user: UserSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deletion_date: Option<DateTime<Utc>>,
}

impl EventPayload {
    pub fn created(user: UserSnapshot) -> Self {
        Self::created_at(user, Utc::now())
    }

    pub fn created_at(user: UserSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            event: UserEventKind::UserCreated,
            datetime: now,
            user,
            deletion_date: None,
        }
    }

    pub fn deleted(user: UserSnapshot) -> Self {
        Self::deleted_at(user, Utc::now())
    }

    pub fn deleted_at(user: UserSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            event: UserEventKind::UserDeleted,
            datetime: now,
            user,
            deletion_date: Some(now),
        }
    }

    pub fn event(&self) -> UserEventKind {
        self.event
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.datetime
    }

    pub fn user(&self) -> &UserSnapshot {
        &self.user
    }

    pub fn deletion_date(&self) -> Option<DateTime<Utc>> {
        self.deletion_date
    }
}
