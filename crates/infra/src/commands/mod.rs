//! Write-side operations.

pub mod write_user;

pub use write_user::{UserWriter, WriteError};
