use serde::Deserialize;

use userhub_core::RawUserTypeId;

// -------------------------
// Request DTOs
// -------------------------

/// `POST /users` body. Missing `name`/`email` arrive as empty strings and are
/// rejected by validation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_type_id: Option<RawUserTypeId>,
}
