use serde::{Deserialize, Serialize};

use vaptrack_auth::Role;
use vaptrack_core::UserId;

/// A login identity. Created at seed/signup time; immutable afterwards
/// (password reset is not implemented).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
