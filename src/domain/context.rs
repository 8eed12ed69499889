//! Per-request caller identity.
//!
//! The context is built once by the request layer (after token verification)
//! and passed explicitly to every service that needs it.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Anonymous,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Anonymous => "anonymous",
        }
    }

    pub fn all() -> &'static [Role] {
        &[Self::Admin, Self::Teacher, Self::Student, Self::Anonymous]
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            "anonymous" => Ok(Self::Anonymous),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Option<UserId>,
    role: Role,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn authenticated(user_id: UserId, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Admins and anonymous callers read the system-wide listing; everyone
    /// else reads system questions merged with their own.
    pub fn sees_own_questions(&self) -> Option<UserId> {
        match self.role {
            Role::Admin | Role::Anonymous => None,
            Role::Teacher | Role::Student => self.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_their_slug() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn admin_reads_the_system_listing() {
        let ctx = RequestContext::authenticated(UserId::new(1), Role::Admin);
        assert_eq!(ctx.sees_own_questions(), None);
    }

    #[test]
    fn teacher_reads_a_personal_listing() {
        let ctx = RequestContext::authenticated(UserId::new(9), Role::Teacher);
        assert_eq!(ctx.sees_own_questions(), Some(UserId::new(9)));
        assert_eq!(RequestContext::anonymous().sees_own_questions(), None);
    }
}
