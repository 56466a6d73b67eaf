use vaptrack_auth::Role;
use vaptrack_core::UserId;

/// Authenticated identity for a request.
///
/// Inserted by the auth middleware; must be present for all `/tester`
/// routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user_id: UserId,
    role: Role,
}

impl CallerContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}
