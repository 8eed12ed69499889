//! Live tests against a running Redis server.
//!
//! - Marked `#[ignore]`; run with `--ignored` after starting Redis.
//! - Connects to `EXAMBANK_TEST_REDIS_URL` (default `redis://127.0.0.1:6379/15`).
//! - Keys are namespaced by a random suffix, nothing is flushed.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use exambank::application::pagination::Page;
use exambank::cache::{CacheBackend, CacheConfig, ListingCache, ListingParams};
use exambank::config::RedisSettings;
use exambank::domain::question::{QuestionKind, QuestionSummary};
use exambank::domain::types::{QuestionId, SubjectId, UserId};
use exambank::infra::redis::{RedisBackend, connect};
use time::OffsetDateTime;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

fn backend() -> TestResult<RedisBackend> {
    let url = std::env::var("EXAMBANK_TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let pool = connect(&RedisSettings {
        url,
        pool_max_size: 4,
        connect_timeout: Duration::from_secs(1),
    })?;
    Ok(RedisBackend::new(pool))
}

fn unique_id() -> i64 {
    i64::from(uuid::Uuid::new_v4().as_fields().0 >> 1) + 1_000_000
}

#[tokio::test]
#[ignore]
async fn live_set_nx_honours_existing_lock() -> TestResult<()> {
    let backend = backend()?;
    let key = format!("lock:test:{}", unique_id());

    assert!(backend.set_nx_ex(&key, b"a".to_vec(), Duration::from_secs(3)).await?);
    assert!(!backend.set_nx_ex(&key, b"b".to_vec(), Duration::from_secs(3)).await?);
    assert_eq!(backend.get(&key).await?, Some(b"a".to_vec()));

    backend.delete(&[key]).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_index_membership_round_trip() -> TestResult<()> {
    let backend = backend()?;
    let key = format!("idx:q:{}", unique_id());

    backend.add_member(&key, "q:list:sys:p1:s10:subjALL", Duration::from_secs(60)).await?;
    backend.add_member(&key, "q:list:sys:p2:s10:subjALL", Duration::from_secs(60)).await?;
    let mut members = backend.members(&key).await?;
    members.sort();
    assert_eq!(members.len(), 2);

    assert_eq!(backend.remove_members(&key, &members).await?, 2);
    assert!(backend.members(&key).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_batch_registration_sets_every_index() -> TestResult<()> {
    let backend = backend()?;
    let keys: Vec<String> = (0..3).map(|_| format!("idx:q:{}", unique_id())).collect();

    backend
        .add_to_sets(&keys, "q:list:sys:p1:s10:subjALL", Duration::from_secs(60))
        .await?;
    for key in &keys {
        assert_eq!(backend.members(key).await?, vec!["q:list:sys:p1:s10:subjALL".to_string()]);
    }

    backend.delete(&keys).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_listing_invalidation() -> TestResult<()> {
    let cache = ListingCache::new(CacheConfig::default(), Arc::new(backend()?));
    let question_id = unique_id();
    // A per-user scope keeps concurrent runs apart.
    let params = ListingParams::for_user(
        UserId::new(unique_id()),
        1,
        10,
        Some(SubjectId::new(3)),
    );

    let record = QuestionSummary {
        id: QuestionId::new(question_id),
        subject_id: Some(SubjectId::new(3)),
        owner_id: None,
        stem: "Live question".to_string(),
        kind: QuestionKind::TrueFalse,
        difficulty: 1,
        created_at: OffsetDateTime::now_utc(),
    };
    cache
        .fetch_or_compute(&params, || async {
            Ok::<_, Infallible>(Page::new(vec![record.clone()], 1, 1, 10))
        })
        .await?;

    let keys = cache.index().keys_for(QuestionId::new(question_id)).await?;
    assert_eq!(keys, vec![params.key()]);

    assert_eq!(cache.on_entity_mutated(QuestionId::new(question_id)).await, 1);
    let cached = cache.store().get::<QuestionSummary>(&params.key()).await?;
    assert!(cached.is_none());
    Ok(())
}
