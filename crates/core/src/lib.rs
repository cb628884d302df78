//! `userhub-core`: user domain building blocks.
//!
//! This crate contains **pure domain** types (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use id::{UserId, UserTypeId};
pub use user::{
    DEFAULT_USER_TYPE_ID, NewUser, RawUserTypeId, USER_TYPE_NAME_MAX_LEN, UserRecord,
    UserTypeRecord,
};
