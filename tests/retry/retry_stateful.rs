use dispatch_guard_retry::{RetryError, RetryLayer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{service_fn, Layer, Service, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct HandlerError(&'static str);

fn always_failing(
    calls: Arc<AtomicUsize>,
) -> impl Service<String, Response = String, Error = HandlerError, Future: Send + 'static> + Clone + Send + 'static {
    service_fn(move |_req: String| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(HandlerError("transient"))
        }
    })
}

#[tokio::test]
async fn first_failure_rethrows_without_sleeping() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(100))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    let started = Instant::now();
    let err = service
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Inner(_)));
    assert!(started.elapsed() < Duration::from_millis(80));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn early_redelivery_waits_out_the_remaining_backoff() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(80))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    // First sighting: fails and records a due time 80ms out.
    let _ = service.ready().await.unwrap().call("k".to_string()).await;

    // Immediate redelivery must absorb roughly the full delay.
    let started = Instant::now();
    let _ = service.ready().await.unwrap().call("k".to_string()).await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(60), "waited: {waited:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn redelivery_after_the_due_time_attempts_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(20))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    let _ = service.ready().await.unwrap().call("k".to_string()).await;
    tokio::time::sleep(Duration::from_millis(40)).await;

    let started = Instant::now();
    let _ = service.ready().await.unwrap().call("k".to_string()).await;
    assert!(started.elapsed() < Duration::from_millis(20));
}

#[tokio::test]
async fn exhaustion_on_final_redelivery_carries_the_episode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(1))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    // Two redeliverable failures, then the third attempt exhausts.
    let first = service
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();
    assert!(matches!(first, RetryError::Inner(_)));

    let second = service
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();
    assert!(matches!(second, RetryError::Inner(_)));

    let third = service
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();
    match third {
        RetryError::Exhausted {
            attempts,
            last,
            suppressed,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last, HandlerError("transient"));
            assert_eq!(suppressed.len(), 2);
        }
        RetryError::Inner(_) => panic!("expected exhaustion on the final redelivery"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // The episode was cleared; the key starts fresh.
    let fresh = service
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();
    assert!(matches!(fresh, RetryError::Inner(_)));
}

#[tokio::test]
async fn success_on_redelivery_clears_the_episode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |req: String| {
        let c = Arc::clone(&c);
        async move {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(HandlerError("transient"))
            } else {
                Ok(req)
            }
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(1))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(handler);

    let _ = service.ready().await.unwrap().call("k".to_string()).await;
    let result = service.ready().await.unwrap().call("k".to_string()).await;
    assert!(result.is_ok());

    // A later failure for the same key is a first sighting again.
    let calls2 = Arc::new(AtomicUsize::new(0));
    let mut failing = layer.layer(always_failing(Arc::clone(&calls2)));
    let err = failing
        .ready()
        .await
        .unwrap()
        .call("k".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, RetryError::Inner(_)));
}

#[tokio::test]
async fn distinct_keys_track_independent_episodes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(1))
        .state_key(|req: &String| req.clone())
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    let _ = service.ready().await.unwrap().call("a".to_string()).await;
    let _ = service.ready().await.unwrap().call("b".to_string()).await;

    // Each key exhausts on its own second delivery.
    let a = service
        .ready()
        .await
        .unwrap()
        .call("a".to_string())
        .await
        .unwrap_err();
    assert!(a.is_exhausted());

    let b = service
        .ready()
        .await
        .unwrap()
        .call("b".to_string())
        .await
        .unwrap_err();
    assert!(b.is_exhausted());
}

#[tokio::test]
async fn bounded_state_forgets_the_oldest_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(1))
        .state_key(|req: &String| req.clone())
        .state_capacity(1)
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    let _ = service.ready().await.unwrap().call("a".to_string()).await;
    // Tracking "b" evicts "a".
    let _ = service.ready().await.unwrap().call("b".to_string()).await;

    // "a" lost its progress, so its redelivery is a first sighting and
    // rethrows instead of exhausting.
    let err = service
        .ready()
        .await
        .unwrap()
        .call("a".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, RetryError::Inner(_)));
}

#[tokio::test]
async fn fresh_predicate_discards_an_in_flight_episode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(1))
        .state_key(|_req: &String| "shared".to_string())
        .fresh_when(|req: &String| req == "reset")
        .build();
    let mut service = layer.layer(always_failing(Arc::clone(&calls)));

    let _ = service.ready().await.unwrap().call("m".to_string()).await;

    // The reset request drops the episode, so it rethrows as a first
    // sighting instead of exhausting the shared key.
    let err = service
        .ready()
        .await
        .unwrap()
        .call("reset".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, RetryError::Inner(_)));
}
