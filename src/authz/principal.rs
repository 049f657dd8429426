use uuid::Uuid;

use super::policy::{IncidentScope, Operation};
use super::role::Role;

/// The authenticated identity and role attached to a request.
///
/// Built by the auth gate from a verified token payload. The role is the
/// snapshot taken when the token was issued, not the user's current role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn can(&self, operation: Operation) -> bool {
        operation.permits(self.role)
    }

    /// Which incidents this principal may read.
    pub fn incident_scope(&self) -> IncidentScope {
        match self.role {
            Role::Crew => IncidentScope::Own(self.user_id),
            _ => IncidentScope::All,
        }
    }
}
