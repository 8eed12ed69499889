mod common;

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common::{FailingBackend, FlakyIndexBackend, UnwritableBackend, question};
use exambank::application::pagination::Page;
use exambank::cache::{CacheConfig, ListingCache, ListingParams, MemoryBackend};
use exambank::domain::types::QuestionId;
use exambank::infra::telemetry;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serial_test::serial;

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        telemetry::describe_metrics();
        snapshotter
    })
}

/// Counter totals keyed by `name` or `name{op=...}`.
fn counters() -> HashMap<String, u64> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let DebugValue::Counter(total) = value else {
                return None;
            };
            let key = composite_key.key();
            let mut name = key.name().to_string();
            for label in key.labels() {
                name.push_str(&format!("{{{}={}}}", label.key(), label.value()));
            }
            Some((name, total))
        })
        .collect()
}

fn count(before: &HashMap<String, u64>, after: &HashMap<String, u64>, name: &str) -> u64 {
    after.get(name).copied().unwrap_or(0) - before.get(name).copied().unwrap_or(0)
}

async fn fetch(cache: &ListingCache, params: &ListingParams) {
    cache
        .fetch_or_compute(params, || async {
            Ok::<_, Infallible>(Page::new(
                vec![question(101, 3, None)],
                1,
                params.page,
                params.size,
            ))
        })
        .await
        .expect("page");
}

#[tokio::test]
#[serial]
async fn listing_paths_emit_expected_metrics() {
    snapshotter();
    let before = counters();

    let cache = ListingCache::new(CacheConfig::default(), Arc::new(MemoryBackend::new()));
    let params = ListingParams::system(1, 10, None);
    cache
        .locks()
        .acquire(&params.key().lock_key(), Duration::from_secs(3))
        .await
        .expect("lock call");

    fetch(&cache, &params).await; // miss, contended lock
    fetch(&cache, &params).await; // hit
    assert_eq!(cache.on_entity_mutated(QuestionId::new(101)).await, 1);

    let after = counters();
    assert_eq!(count(&before, &after, "exambank_listing_cache_miss_total"), 1);
    assert_eq!(count(&before, &after, "exambank_listing_cache_hit_total"), 1);
    assert_eq!(count(&before, &after, "exambank_listing_lock_contended_total"), 1);
    assert_eq!(count(&before, &after, "exambank_listing_invalidated_keys_total"), 1);

    let histograms: Vec<String> = snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(_, _, _, value)| matches!(value, DebugValue::Histogram(_)))
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    assert!(histograms.iter().any(|name| name == "exambank_listing_compute_ms"));
}

#[tokio::test]
#[serial]
async fn fail_open_is_counted_per_operation() {
    snapshotter();
    let before = counters();

    let cache = ListingCache::new(CacheConfig::default(), Arc::new(FailingBackend));
    let params = ListingParams::system(1, 10, None);
    fetch(&cache, &params).await;
    assert_eq!(cache.on_entity_mutated(QuestionId::new(101)).await, 0);

    let after = counters();
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=get}"),
        1
    );
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=invalidate}"),
        1
    );
}

#[tokio::test]
#[serial]
async fn failed_page_write_is_counted_and_not_indexed() {
    snapshotter();
    let before = counters();

    let backend = Arc::new(UnwritableBackend::default());
    let cache = ListingCache::new(CacheConfig::default(), backend.clone());
    fetch(&cache, &ListingParams::system(1, 10, None)).await;

    let after = counters();
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=set}"),
        1
    );
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=index}"),
        0
    );
    assert_eq!(backend.adds(), 0);
}

#[tokio::test]
#[serial]
async fn failed_indexing_is_counted() {
    snapshotter();
    let before = counters();

    let cache = ListingCache::new(
        CacheConfig::default(),
        Arc::new(FlakyIndexBackend::accepting(0)),
    );
    fetch(&cache, &ListingParams::system(1, 10, None)).await;

    let after = counters();
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=index}"),
        1
    );
    assert_eq!(
        count(&before, &after, "exambank_listing_cache_fail_open_total{op=set}"),
        0
    );
}
