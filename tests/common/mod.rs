#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use exambank::application::pagination::Page;
use exambank::application::repos::{ListingQuery, QuestionCatalog, RepoError};
use exambank::cache::{CacheBackend, CacheError, MemoryBackend};
use exambank::domain::question::{QuestionKind, QuestionSummary};
use exambank::domain::types::{QuestionId, SubjectId, UserId};
use time::OffsetDateTime;

pub fn question(id: i64, subject: i64, owner: Option<i64>) -> QuestionSummary {
    QuestionSummary {
        id: QuestionId::new(id),
        subject_id: Some(SubjectId::new(subject)),
        owner_id: owner.map(UserId::new),
        stem: format!("Question {id}"),
        kind: QuestionKind::SingleChoice,
        difficulty: 1,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

/// Catalog backed by a map, counting every query that reaches it.
#[derive(Default)]
pub struct InMemoryCatalog {
    questions: Mutex<BTreeMap<i64, QuestionSummary>>,
    calls: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn with(questions: impl IntoIterator<Item = QuestionSummary>) -> Self {
        let catalog = Self::default();
        for question in questions {
            catalog.upsert(question);
        }
        catalog
    }

    pub fn upsert(&self, question: QuestionSummary) {
        self.questions
            .lock()
            .expect("catalog lock")
            .insert(question.id.get(), question);
    }

    pub fn remove(&self, id: i64) {
        self.questions.lock().expect("catalog lock").remove(&id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionCatalog for InMemoryCatalog {
    async fn list_questions(
        &self,
        query: &ListingQuery,
    ) -> Result<Page<QuestionSummary>, RepoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let questions = self.questions.lock().expect("catalog lock");
        let matching: Vec<&QuestionSummary> = questions
            .values()
            .filter(|q| query.subject.is_none_or(|subject| q.subject_id == Some(subject)))
            .filter(|q| match query.viewer {
                Some(viewer) => q.visible_to(viewer),
                None => q.is_system(),
            })
            .collect();

        let offset = usize::try_from(query.request.offset()).unwrap_or(usize::MAX);
        let records = matching
            .iter()
            .skip(offset)
            .take(query.request.size() as usize)
            .map(|q| (*q).clone())
            .collect();
        Ok(Page::new(
            records,
            matching.len() as u64,
            query.request.page(),
            query.request.size(),
        ))
    }
}

/// Backend whose every command fails, like a store that refuses connections.
pub struct FailingBackend;

impl FailingBackend {
    fn fail<T>(op: &'static str) -> Result<T, CacheError> {
        Err(CacheError::backend("failing", op, "connection refused"))
    }
}

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Self::fail("get")
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Self::fail("set")
    }

    async fn set_nx_ex(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        Self::fail("set_nx")
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Self::fail("del")
    }

    async fn add_member(
        &self,
        _key: &str,
        _member: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Self::fail("sadd")
    }

    async fn members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
        Self::fail("smembers")
    }

    async fn remove_members(&self, _key: &str, _members: &[String]) -> Result<u64, CacheError> {
        Self::fail("srem")
    }
}

/// Backend that never answers; every call relies on the client timeout.
pub struct StalledBackend;

#[async_trait]
impl CacheBackend for StalledBackend {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        std::future::pending().await
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn set_nx_ex(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        std::future::pending().await
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        std::future::pending().await
    }

    async fn add_member(
        &self,
        _key: &str,
        _member: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
        std::future::pending().await
    }

    async fn remove_members(&self, _key: &str, _members: &[String]) -> Result<u64, CacheError> {
        std::future::pending().await
    }
}

/// Backend where reads miss and page writes fail, counting index writes.
#[derive(Default)]
pub struct UnwritableBackend {
    adds: AtomicUsize,
}

impl UnwritableBackend {
    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for UnwritableBackend {
    fn name(&self) -> &'static str {
        "unwritable"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("unwritable", "set", "OOM command not allowed"))
    }

    async fn set_nx_ex(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        Ok(true)
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn add_member(
        &self,
        _key: &str,
        _member: &str,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
        Ok(Vec::new())
    }

    async fn remove_members(&self, _key: &str, _members: &[String]) -> Result<u64, CacheError> {
        Ok(0)
    }
}

/// In-memory backend whose index writes start failing after `accepted` adds.
pub struct FlakyIndexBackend {
    inner: MemoryBackend,
    accepted: usize,
    adds: AtomicUsize,
}

impl FlakyIndexBackend {
    pub fn accepting(accepted: usize) -> Self {
        Self {
            inner: MemoryBackend::new(),
            accepted,
            adds: AtomicUsize::new(0),
        }
    }

    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for FlakyIndexBackend {
    fn name(&self) -> &'static str {
        "flaky-index"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.inner.set_nx_ex(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.inner.delete(keys).await
    }

    async fn add_member(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        if self.adds.fetch_add(1, Ordering::SeqCst) >= self.accepted {
            return Err(CacheError::backend("flaky-index", "sadd", "connection reset"));
        }
        self.inner.add_member(key, member, ttl).await
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.inner.members(key).await
    }

    async fn remove_members(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        self.inner.remove_members(key, members).await
    }
}
