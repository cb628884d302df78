//! User and user type records, plus validated insert input.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{UserId, UserTypeId};

/// User type assigned when the caller does not provide one.
pub const DEFAULT_USER_TYPE_ID: UserTypeId = UserTypeId::from_i64(1);

/// Maximum length of a user type name (`user_types.name` is `VARCHAR(15)`).
pub const USER_TYPE_NAME_MAX_LEN: usize = 15;

/// A persisted row of the `users` table.
///
/// # Invariants
/// - `user_type_id` references an existing `user_types` row (enforced by the
///   store's foreign key, not by this type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub user_type_id: UserTypeId,
}

/// A persisted row of the `user_types` table. Referenced, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTypeRecord {
    pub id: UserTypeId,
    pub name: String,
}

impl UserTypeRecord {
    pub fn new(id: UserTypeId, name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("user type name must not be empty"));
        }
        if name.chars().count() > USER_TYPE_NAME_MAX_LEN {
            return Err(DomainError::invalid_argument(format!(
                "user type name must be at most {USER_TYPE_NAME_MAX_LEN} characters"
            )));
        }
        Ok(Self { id, name })
    }
}

/// Untyped user type input as it arrives from callers (JSON bodies, forms).
///
/// Coercion accepts anything that reads as an integer: integers as-is,
/// finite floats truncated toward zero, and trimmed numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawUserTypeId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawUserTypeId {
    /// Coerce to a positive `UserTypeId`.
    pub fn coerce(&self) -> DomainResult<UserTypeId> {
        let value = match self {
            RawUserTypeId::Integer(v) => *v,
            // `as` saturates, so anything outside the i64 range is rejected first.
            RawUserTypeId::Float(v) if (i64::MIN as f64..i64::MAX as f64).contains(&v.trunc()) => {
                v.trunc() as i64
            }
            RawUserTypeId::Float(_) => {
                return Err(DomainError::invalid_argument(
                    "Cannot create user. Invalid user_type_id.",
                ));
            }
            RawUserTypeId::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                DomainError::invalid_argument("Cannot create user. Invalid user_type_id.")
            })?,
        };

        if value <= 0 {
            return Err(DomainError::invalid_argument(
                "Cannot create user. user_type_id must be positive.",
            ));
        }

        Ok(UserTypeId::from_i64(value))
    }
}

impl From<i64> for RawUserTypeId {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<UserTypeId> for RawUserTypeId {
    fn from(value: UserTypeId) -> Self {
        Self::Integer(value.as_i64())
    }
}

impl From<&str> for RawUserTypeId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Validated input for inserting a user.
///
/// Foreign-key existence of `user_type_id` is deliberately not checked here;
/// the store's constraint rejects unknown types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    email: String,
    user_type_id: UserTypeId,
}

impl NewUser {
    pub fn try_new(
        name: impl Into<String>,
        email: impl Into<String>,
        user_type_id: Option<RawUserTypeId>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let email = email.into();

        if name.is_empty() || email.is_empty() {
            return Err(DomainError::invalid_argument(
                "Cannot create user. A user must have name and email.",
            ));
        }

        let user_type_id = match user_type_id {
            None => DEFAULT_USER_TYPE_ID,
            Some(raw) => raw.coerce()?,
        };

        Ok(Self {
            name,
            email,
            user_type_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn user_type_id(&self) -> UserTypeId {
        self.user_type_id
    }

    /// Attach the store-generated id.
    pub fn into_record(self, id: UserId) -> UserRecord {
        UserRecord {
            id,
            name: self.name,
            email: self.email,
            user_type_id: self.user_type_id,
        }
    }
}
