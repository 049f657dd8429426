use uuid::Uuid;

use super::principal::Principal;
use super::role::Role;
use crate::errors::{AppError, AppResult};

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateIncident,
    AddComment,
    SuggestAction,
    AssignAction,
    SetActionStatus,
    ListIncidents,
    ManageUsers,
    ExportReport,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::CreateIncident,
        Operation::AddComment,
        Operation::SuggestAction,
        Operation::AssignAction,
        Operation::SetActionStatus,
        Operation::ListIncidents,
        Operation::ManageUsers,
        Operation::ExportReport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateIncident => "incident.create",
            Operation::AddComment => "incident.comment",
            Operation::SuggestAction => "incident.suggest_action",
            Operation::AssignAction => "incident.assign_action",
            Operation::SetActionStatus => "incident.set_action_status",
            Operation::ListIncidents => "incident.list",
            Operation::ManageUsers => "user.manage",
            Operation::ExportReport => "report.export",
        }
    }

    /// The policy table.
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;

        match self {
            Operation::CreateIncident => &[Crew, Pilot],
            Operation::AddComment => &[Crew, Pilot],
            Operation::SuggestAction => &[Pilot, Admin, Auditor],
            Operation::AssignAction => &[Admin, Auditor],
            Operation::SetActionStatus => &[GroundStaff, Admin, Auditor],
            // crew is narrowed to its own incidents by IncidentScope
            Operation::ListIncidents => &[Crew, Pilot, Admin, GroundStaff, Auditor],
            Operation::ManageUsers => &[Admin],
            Operation::ExportReport => &[Admin, Auditor],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Row-level visibility of incidents for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentScope {
    /// Only incidents created by this user.
    Own(Uuid),
    All,
}

impl IncidentScope {
    pub fn includes(&self, created_by: Uuid) -> bool {
        match self {
            IncidentScope::Own(user_id) => *user_id == created_by,
            IncidentScope::All => true,
        }
    }
}

/// Fails with `Forbidden` unless the principal's role may perform `operation`.
pub fn authorize(principal: &Principal, operation: Operation) -> AppResult<()> {
    if principal.can(operation) {
        tracing::debug!(
            user_id = %principal.user_id,
            role = %principal.role,
            operation = operation.name(),
            "operation permitted"
        );
        return Ok(());
    }

    tracing::warn!(
        user_id = %principal.user_id,
        role = %principal.role,
        operation = operation.name(),
        "operation denied"
    );
    Err(AppError::forbidden(format!(
        "role '{}' may not perform {}",
        principal.role,
        operation.name()
    )))
}
