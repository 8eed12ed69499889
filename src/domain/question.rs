//! Question summaries as served by the listing endpoints.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::types::{QuestionId, SubjectId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::FillBlank => "fill_blank",
            Self::ShortAnswer => "short_answer",
        }
    }
}

impl Display for QuestionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(Self::SingleChoice),
            "multiple_choice" => Ok(Self::MultipleChoice),
            "true_false" => Ok(Self::TrueFalse),
            "fill_blank" => Ok(Self::FillBlank),
            "short_answer" => Ok(Self::ShortAnswer),
            _ => Err(()),
        }
    }
}

/// Listing projection of a question.
///
/// `owner_id == None` marks a system question visible to everyone; otherwise
/// the question is private to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: QuestionId,
    pub subject_id: Option<SubjectId>,
    pub owner_id: Option<UserId>,
    pub stem: String,
    pub kind: QuestionKind,
    pub difficulty: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl QuestionSummary {
    pub fn is_system(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Whether `user` may see this question in a per-user listing.
    pub fn visible_to(&self, user: UserId) -> bool {
        match self.owner_id {
            None => true,
            Some(owner) => owner == user,
        }
    }
}

/// A record that can be tracked by the invalidation index.
pub trait CacheableRecord {
    fn entity_id(&self) -> QuestionId;
}

impl CacheableRecord for QuestionSummary {
    fn entity_id(&self) -> QuestionId {
        self.id
    }
}
