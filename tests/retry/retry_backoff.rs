use dispatch_guard_retry::{
    BackoffStrategy, ExponentialBackoff, FixedDelay, FnBackoff, RetryLayer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{service_fn, Layer, Service, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct HandlerError;

#[test]
fn fixed_delay_is_constant() {
    let backoff = FixedDelay::new(Duration::from_millis(250));
    assert_eq!(backoff.delay_for(0), Duration::from_millis(250));
    assert_eq!(backoff.delay_for(7), Duration::from_millis(250));
}

#[test]
fn exponential_doubles_and_caps() {
    let backoff = ExponentialBackoff::new(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(350));
    assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
    assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
    assert_eq!(backoff.delay_for(2), Duration::from_millis(350));
    assert_eq!(backoff.delay_for(10), Duration::from_millis(350));
}

#[tokio::test]
async fn layer_sleeps_the_strategy_delays() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&observed);

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |_req: String| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(HandlerError)
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(4)
        .exponential_backoff(Duration::from_millis(1))
        .on_retry(move |attempt, delay| {
            o.lock().unwrap().push((attempt, delay));
        })
        .build();
    let mut service = layer.layer(handler);

    let _ = service.ready().await.unwrap().call("m".to_string()).await;

    let observed = observed.lock().unwrap();
    assert_eq!(
        *observed,
        vec![
            (1, Duration::from_millis(1)),
            (2, Duration::from_millis(2)),
            (3, Duration::from_millis(4)),
        ]
    );
}

#[tokio::test]
async fn custom_backoff_closure_is_honored() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&observed);

    let handler = service_fn(|_req: String| async move { Err::<String, _>(HandlerError) });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .backoff(FnBackoff::new(|attempt| {
            Duration::from_millis(10 * (attempt as u64 + 1))
        }))
        .on_retry(move |_, delay| {
            o.lock().unwrap().push(delay);
        })
        .build();
    let mut service = layer.layer(handler);

    let _ = service.ready().await.unwrap().call("m".to_string()).await;

    let observed = observed.lock().unwrap();
    assert_eq!(
        *observed,
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );
}
