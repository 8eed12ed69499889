//! Cache key definitions.
//!
//! The string layout is persisted in the shared store. Changing it makes
//! every existing entry unreachable, so treat it as a wire format:
//!
//! ```text
//! q:list:sys:p<page>:s<size>:subj<subject|ALL>
//! q:list:user:<user>:p<page>:s<size>:subj<subject|ALL>
//! lock:<listing key>
//! idx:q:<question id>
//! ```

use std::fmt::{Display, Formatter};

use crate::domain::context::RequestContext;
use crate::domain::types::{QuestionId, SubjectId, UserId};

const LISTING_PREFIX: &str = "q:list";
const LOCK_PREFIX: &str = "lock:";
const INDEX_PREFIX: &str = "idx:q:";
const ALL_SUBJECTS: &str = "ALL";

/// Which visibility rules produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingScope {
    /// System questions only.
    System,
    /// System questions plus the ones owned by this user.
    User(UserId),
}

/// Everything that determines the content of one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingParams {
    pub scope: ListingScope,
    pub page: u32,
    pub size: u32,
    pub subject: Option<SubjectId>,
}

impl ListingParams {
    pub fn system(page: u32, size: u32, subject: Option<SubjectId>) -> Self {
        Self {
            scope: ListingScope::System,
            page,
            size,
            subject,
        }
    }

    pub fn for_user(user: UserId, page: u32, size: u32, subject: Option<SubjectId>) -> Self {
        Self {
            scope: ListingScope::User(user),
            page,
            size,
            subject,
        }
    }

    /// Derive the listing scope from the caller.
    pub fn for_context(
        ctx: &RequestContext,
        page: u32,
        size: u32,
        subject: Option<SubjectId>,
    ) -> Self {
        match ctx.sees_own_questions() {
            Some(user) => Self::for_user(user, page, size, subject),
            None => Self::system(page, size, subject),
        }
    }

    pub fn viewer(&self) -> Option<UserId> {
        match self.scope {
            ListingScope::System => None,
            ListingScope::User(user) => Some(user),
        }
    }

    /// Canonical cache key for this listing page.
    pub fn key(&self) -> ListingKey {
        let subject = match self.subject {
            Some(subject) => subject.to_string(),
            None => ALL_SUBJECTS.to_string(),
        };
        let raw = match self.scope {
            ListingScope::System => format!(
                "{LISTING_PREFIX}:sys:p{}:s{}:subj{subject}",
                self.page, self.size
            ),
            ListingScope::User(user) => format!(
                "{LISTING_PREFIX}:user:{user}:p{}:s{}:subj{subject}",
                self.page, self.size
            ),
        };
        ListingKey(raw)
    }
}

/// Key of a cached listing page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingKey(String);

impl ListingKey {
    /// Rehydrate a key read back from the invalidation index.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lock_key(&self) -> LockKey {
        LockKey(format!("{LOCK_PREFIX}{}", self.0))
    }
}

impl Display for ListingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of the advisory recomputation lock guarding one listing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LockKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of the set holding every listing key that contains one question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey(String);

impl IndexKey {
    pub fn for_entity(id: QuestionId) -> Self {
        Self(format!("{INDEX_PREFIX}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IndexKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
