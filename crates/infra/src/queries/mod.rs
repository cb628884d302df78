//! Read-side operations.

pub mod read_user;

pub use read_user::UserReader;
