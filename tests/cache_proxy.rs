//! Integration tests for the stale-tolerant cache proxy
//!
//! Walks the freshness/fallback timeline with a manual clock and a typed
//! payload.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use govdata::cache::{CacheError, CacheOutcome, CacheProxy, Clock, ManualClock};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
struct SchoolCount {
    count: u32,
}

#[derive(Debug, Error)]
#[error("upstream timed out")]
struct UpstreamDown;

fn create_test_proxy() -> (CacheProxy<SchoolCount>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
    let proxy = CacheProxy::with_clock(Duration::from_secs(3600), clock.clone());
    (proxy, clock)
}

#[tokio::test]
async fn test_sekolah_timeline() {
    let (proxy, clock) = create_test_proxy();
    let start = clock.now();
    let calls = AtomicUsize::new(0);

    // t=0: first fetch
    let first = proxy
        .get_data("sekolah", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamDown>(SchoolCount { count: 42 })
        })
        .await
        .expect("first fetch should succeed");
    assert_eq!(*first, SchoolCount { count: 42 });
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // t=1800: served from cache
    clock.advance_secs(1800);
    let cached = proxy
        .get_data("sekolah", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamDown>(SchoolCount { count: 0 })
        })
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // t=3601: stale, refetched
    clock.advance_secs(1801);
    let refreshed = proxy
        .get_data("sekolah", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamDown>(SchoolCount { count: 50 })
        })
        .await
        .unwrap();
    assert_eq!(*refreshed, SchoolCount { count: 50 });
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let (_, fetched_at) = proxy.peek("sekolah").unwrap();
    assert_eq!(fetched_at, start + chrono::Duration::seconds(3601));

    // t=7200: entry is 3599s old, still fresh
    clock.advance_secs(3599);
    let (cached, outcome) = proxy
        .get_data_traced("sekolah", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<SchoolCount, _>(UpstreamDown)
        })
        .await
        .unwrap();
    assert_eq!(*cached, SchoolCount { count: 50 });
    assert_eq!(outcome, CacheOutcome::Fresh);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // t=7201: expired, upstream down, stale value served
    clock.advance_secs(1);
    let (stale, outcome) = proxy
        .get_data_traced("sekolah", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<SchoolCount, _>(UpstreamDown)
        })
        .await
        .expect("stale fallback must not surface an error");
    assert_eq!(*stale, SchoolCount { count: 50 });
    assert_eq!(outcome, CacheOutcome::Stale);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let (_, fetched_at) = proxy.peek("sekolah").unwrap();
    assert_eq!(fetched_at, start + chrono::Duration::seconds(3601));
}

#[tokio::test]
async fn test_unseen_key_failure_propagates() {
    let (proxy, _clock) = create_test_proxy();

    let result = proxy
        .get_data("ptk", || async { Err::<SchoolCount, _>(UpstreamDown) })
        .await;

    match result {
        Err(CacheError::NoDataAvailable { key, source }) => {
            assert_eq!(key, "ptk");
            assert_eq!(source.to_string(), "upstream timed out");
        }
        Ok(payload) => panic!("expected an error, got {:?}", payload),
    }
}

#[tokio::test]
async fn test_stale_fallback_persists_through_long_outage() {
    let (proxy, clock) = create_test_proxy();
    proxy
        .get_data("sekolah", || async { Ok::<_, UpstreamDown>(SchoolCount { count: 7 }) })
        .await
        .unwrap();

    for _ in 0..5 {
        clock.advance_secs(24 * 3600);
        let value = proxy
            .get_data("sekolah", || async { Err::<SchoolCount, _>(UpstreamDown) })
            .await
            .unwrap();
        assert_eq!(*value, SchoolCount { count: 7 });
    }
}

#[tokio::test]
async fn test_keys_do_not_share_entries() {
    let (proxy, _clock) = create_test_proxy();
    proxy
        .get_data("sekolah", || async { Ok::<_, UpstreamDown>(SchoolCount { count: 1 }) })
        .await
        .unwrap();

    let result = proxy
        .get_data("ptk", || async { Err::<SchoolCount, _>(UpstreamDown) })
        .await;

    assert!(result.is_err(), "a cached sekolah entry must not answer ptk");
    assert_eq!(proxy.len(), 1);
}

#[tokio::test]
async fn test_concurrent_refresh_without_single_flight_last_writer_wins() {
    let (proxy, clock) = create_test_proxy();
    let proxy = Arc::new(proxy);
    proxy
        .get_data("sekolah", || async { Ok::<_, UpstreamDown>(SchoolCount { count: 1 }) })
        .await
        .unwrap();
    clock.advance_secs(3601);

    let calls = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..4u32)
        .map(|i| {
            let proxy = Arc::clone(&proxy);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                proxy
                    .get_data("sekolah", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, UpstreamDown>(SchoolCount { count: 100 + i })
                    })
                    .await
                    .map(|v| v.count)
            })
        })
        .collect();

    for task in tasks {
        let count = task.await.unwrap().unwrap();
        assert!((100..104).contains(&count));
    }

    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(proxy.len(), 1);
    let (latest, _) = proxy.peek("sekolah").unwrap();
    assert!((100..104).contains(&latest.count));
}
