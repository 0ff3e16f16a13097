use crate::resolution::{Credentials, SearchEndpointError, TrackResolver, TrackResolverConfig};
use crate::test_support::{candidate, SearchMock};
use crate::{MediaId, TrackError};
use std::sync::Arc;
use std::time::Duration;

const QUERY: &str = "Robert Miles - Children";

fn credentials() -> Credentials {
    Credentials::with_api_key("key")
}

fn resolver(search: Arc<SearchMock>) -> TrackResolver {
    TrackResolver::new(search, TrackResolverConfig::default())
}

#[actix_rt::test]
async fn test_positive_result_is_cached() {
    let search = Arc::new(SearchMock::new().with_results(
        QUERY,
        vec![candidate("abc", "Robert Miles - Children", "Robert Miles")],
    ));
    let resolver = resolver(search.clone());

    for _ in 0..3 {
        assert_eq!(
            Ok(Some(MediaId::from("abc"))),
            resolver.resolve_track_id(QUERY, &credentials()).await
        );
    }
    assert_eq!(1, search.calls_for(QUERY));

    // Normalized keys share the entry.
    assert_eq!(
        Ok(Some(MediaId::from("abc"))),
        resolver
            .resolve_track_id("  robert miles - children ", &credentials())
            .await
    );
    assert_eq!(1, search.total_calls());
}

#[tokio::test(start_paused = true)]
async fn test_negative_result_is_requeried_once_after_ttl() {
    let search = Arc::new(SearchMock::new());
    let resolver = resolver(search.clone());

    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(1, search.calls_for(QUERY));

    tokio::time::advance(Duration::from_secs(60)).await;

    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(2, search.calls_for(QUERY));
}

#[actix_rt::test]
async fn test_auth_failure_is_not_retried() {
    let search = Arc::new(
        SearchMock::new().with_failures(QUERY, vec![SearchEndpointError::Unauthorized(403)]),
    );
    let resolver = resolver(search.clone());

    assert_eq!(
        Err(TrackError::Auth),
        resolver.resolve_track_id(QUERY, &credentials()).await
    );
    assert_eq!(1, search.calls_for(QUERY));
}

#[actix_rt::test]
async fn test_rejected_request_counts_as_no_result() {
    let search = Arc::new(
        SearchMock::new()
            .with_failures(QUERY, vec![SearchEndpointError::Rejected(400)])
            .with_results(QUERY, vec![candidate("abc", "Children", "Robert Miles")]),
    );
    let resolver = resolver(search.clone());

    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(1, search.calls_for(QUERY));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_with_backoff() {
    let search = Arc::new(
        SearchMock::new()
            .with_failures(
                QUERY,
                vec![
                    SearchEndpointError::Unavailable(429),
                    SearchEndpointError::Unavailable(503),
                ],
            )
            .with_results(QUERY, vec![candidate("abc", "Children", "Robert Miles")]),
    );
    let resolver = resolver(search.clone());
    let started = tokio::time::Instant::now();

    assert_eq!(
        Ok(Some(MediaId::from("abc"))),
        resolver.resolve_track_id(QUERY, &credentials()).await
    );
    assert_eq!(3, search.calls_for(QUERY));
    // 1s after the first failure, 2s after the second.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_millis(3100));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_surfaces_after_retries() {
    let search = Arc::new(SearchMock::new().with_failures(
        QUERY,
        vec![
            SearchEndpointError::Unavailable(500),
            SearchEndpointError::Network("reset".into()),
            SearchEndpointError::Timeout,
        ],
    ));
    let resolver = resolver(search.clone());

    assert_eq!(
        Err(TrackError::Timeout),
        resolver.resolve_track_id(QUERY, &credentials()).await
    );
    assert_eq!(3, search.calls_for(QUERY));

    // Errors are not cached; the next attempt searches again.
    assert_eq!(Ok(None), resolver.resolve_track_id(QUERY, &credentials()).await);
    assert_eq!(4, search.calls_for(QUERY));
}

#[actix_rt::test]
async fn test_backoff_delay_is_capped() {
    let resolver = resolver(Arc::new(SearchMock::new()));

    assert_eq!(Duration::from_secs(1), resolver.backoff_delay(0));
    assert_eq!(Duration::from_secs(2), resolver.backoff_delay(1));
    assert_eq!(Duration::from_secs(4), resolver.backoff_delay(2));
    assert_eq!(Duration::from_secs(4), resolver.backoff_delay(10));
    assert_eq!(Duration::from_secs(4), resolver.backoff_delay(u32::MAX));
}

#[tokio::test(start_paused = true)]
async fn test_resolve_many_skips_failures() {
    let search = Arc::new(
        SearchMock::new()
            .with_results("first", vec![candidate("one", "first", "x")])
            .with_results("third", vec![candidate("three", "third", "x")])
            .with_failures("fourth", vec![SearchEndpointError::Unauthorized(401)]),
    );
    let resolver = resolver(search.clone());

    let queries = vec![
        (0, "first".to_string()),
        (1, "second".to_string()),
        (2, "third".to_string()),
        (3, "fourth".to_string()),
    ];
    let resolved = resolver.resolve_many(&queries, &credentials()).await;

    assert_eq!(2, resolved.len());
    assert_eq!(Some(&MediaId::from("one")), resolved.get(&0));
    assert_eq!(Some(&MediaId::from("three")), resolved.get(&2));
    assert_eq!(4, search.total_calls());
}

#[actix_rt::test]
async fn test_evict_and_clear_force_new_search() {
    let search = Arc::new(
        SearchMock::new().with_results(QUERY, vec![candidate("abc", "Children", "x")]),
    );
    let resolver = resolver(search.clone());

    resolver.resolve_track_id(QUERY, &credentials()).await.unwrap();
    assert!(resolver.evict(QUERY));
    resolver.resolve_track_id(QUERY, &credentials()).await.unwrap();
    resolver.clear();
    resolver.resolve_track_id(QUERY, &credentials()).await.unwrap();

    assert_eq!(3, search.calls_for(QUERY));
}
