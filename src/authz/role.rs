use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Crew,
    Pilot,
    Admin,
    GroundStaff,
    Auditor,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Crew, Role::Pilot, Role::Admin, Role::GroundStaff, Role::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Crew => "crew",
            Role::Pilot => "pilot",
            Role::Admin => "admin",
            Role::GroundStaff => "ground_staff",
            Role::Auditor => "auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crew" => Ok(Role::Crew),
            "pilot" => Ok(Role::Pilot),
            "admin" => Ok(Role::Admin),
            "ground_staff" => Ok(Role::GroundStaff),
            "auditor" => Ok(Role::Auditor),
            other => Err(AppError::bad_request(format!("unknown role: {other}"))),
        }
    }
}
