//! Staff hierarchy: departments, teams, and the role a staff member holds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CareError;

/// Role of an admin inside their department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    DeputyManager,
    Leader,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::DeputyManager => "deputy_manager",
            Role::Leader => "leader",
            Role::Staff => "staff",
        }
    }

    /// Department-wide roles skip team scoping.
    pub fn is_department_wide(&self) -> bool {
        match self {
            Role::Manager | Role::DeputyManager => true,
            Role::Leader | Role::Staff => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(Role::Manager),
            "deputy_manager" => Ok(Role::DeputyManager),
            "leader" => Ok(Role::Leader),
            "staff" => Ok(Role::Staff),
            other => Err(CareError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// A team inside a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub department_id: i64,
    pub name: String,
    pub leader_id: i64,
    #[serde(default)]
    pub member_ids: Vec<i64>,
}

impl Team {
    pub fn has_member(&self, staff_id: i64) -> bool {
        self.leader_id == staff_id || self.member_ids.contains(&staff_id)
    }
}

/// Filter for `find_team`: the department plus at least one of leader/member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamLookup {
    pub department_id: i64,
    pub leader_id: Option<i64>,
    pub member_id: Option<i64>,
}

impl TeamLookup {
    /// Team in `department_id` that `staff_id` leads or belongs to.
    pub fn containing(department_id: i64, staff_id: i64) -> Self {
        Self {
            department_id,
            leader_id: Some(staff_id),
            member_id: Some(staff_id),
        }
    }

    pub fn matches(&self, team: &Team) -> bool {
        if team.department_id != self.department_id {
            return false;
        }
        match (self.leader_id, self.member_id) {
            (None, None) => false,
            (leader, member) => {
                leader.is_some_and(|l| team.leader_id == l)
                    || member.is_some_and(|m| team.member_ids.contains(&m))
            }
        }
    }
}

/// The authenticated caller of a read or staff action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: i64,
    pub department_id: i64,
    pub role: Role,
}
