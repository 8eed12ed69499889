//! Route access policy.
//!
//! One table maps `(method, route pattern)` to the roles allowed to call it,
//! and [`authorize`] is the single place that evaluates it. Rules are checked
//! in order and the first match decides; routes without a rule are denied.
//!
//! Pattern segments: a literal matches itself, `*` matches exactly one
//! segment and a trailing `**` matches any remainder (including nothing).

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::domain::context::{RequestContext, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role `{role}` may not {method} {path}")]
    Forbidden {
        role: Role,
        method: Method,
        path: String,
    },
}

/// One row of the policy table. `method: None` matches every method.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub method: Option<Method>,
    pub pattern: &'static str,
    pub roles: &'static [Role],
}

const EVERYONE: &[Role] = &[Role::Admin, Role::Teacher, Role::Student, Role::Anonymous];
const MEMBERS: &[Role] = &[Role::Admin, Role::Teacher, Role::Student];
const AUTHORS: &[Role] = &[Role::Admin, Role::Teacher];
const ADMINS: &[Role] = &[Role::Admin];

const fn rule(method: Option<Method>, pattern: &'static str, roles: &'static [Role]) -> RouteRule {
    RouteRule {
        method,
        pattern,
        roles,
    }
}

pub const ROUTE_POLICY: &[RouteRule] = &[
    rule(Some(Method::Post), "/api/auth/login", EVERYONE),
    rule(Some(Method::Post), "/api/auth/register", EVERYONE),
    rule(Some(Method::Get), "/api/subjects", EVERYONE),
    rule(Some(Method::Get), "/api/subjects/*", EVERYONE),
    rule(Some(Method::Post), "/api/subjects", ADMINS),
    rule(Some(Method::Put), "/api/subjects/*", ADMINS),
    rule(Some(Method::Delete), "/api/subjects/*", ADMINS),
    rule(Some(Method::Get), "/api/questions", MEMBERS),
    rule(Some(Method::Get), "/api/questions/*", MEMBERS),
    rule(Some(Method::Post), "/api/questions", AUTHORS),
    rule(Some(Method::Post), "/api/questions/import", AUTHORS),
    rule(Some(Method::Put), "/api/questions/*", AUTHORS),
    rule(Some(Method::Delete), "/api/questions/*", AUTHORS),
    rule(Some(Method::Post), "/api/chat/**", MEMBERS),
    rule(None, "/api/admin/**", ADMINS),
];

/// Decide whether `ctx` may call `method path`.
pub fn authorize(ctx: &RequestContext, method: Method, path: &str) -> Result<(), AccessError> {
    authorize_with(ROUTE_POLICY, ctx, method, path)
}

/// [`authorize`] against an explicit table.
pub fn authorize_with(
    policy: &[RouteRule],
    ctx: &RequestContext,
    method: Method,
    path: &str,
) -> Result<(), AccessError> {
    let matched = policy
        .iter()
        .find(|rule| rule.method.is_none_or(|m| m == method) && pattern_matches(rule.pattern, path));

    let role = ctx.role();
    match matched {
        Some(rule) if rule.roles.contains(&role) => Ok(()),
        Some(_) if role == Role::Anonymous => Err(AccessError::Unauthenticated),
        Some(rule) => {
            debug!(%role, %method, path, pattern = rule.pattern, "Route denied by policy");
            Err(AccessError::Forbidden {
                role,
                method,
                path: path.to_string(),
            })
        }
        None => {
            debug!(%role, %method, path, "Route has no policy entry");
            Err(AccessError::Forbidden {
                role,
                method,
                path: path.to_string(),
            })
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut expected = segments(pattern);
    let mut actual = segments(path);
    loop {
        match (expected.next(), actual.next()) {
            (Some("**"), _) => return true,
            (Some("*"), Some(_)) => {}
            (Some(literal), Some(segment)) if literal == segment => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
