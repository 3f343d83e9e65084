use dispatch_guard_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer};
use dispatch_guard_core::{GuardError, Message};
use dispatch_guard_idempotency::{FirstSeenSelector, IdempotencyError, IdempotencyLayer};
use dispatch_guard_lock::{LockError, LockLayer};
use dispatch_guard_ratelimiter::{RateLimiterError, RateLimiterLayer};
use dispatch_guard_retry::{RetryError, RetryLayer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct HandlerError(&'static str);

#[tokio::test]
async fn retry_over_circuit_breaker_stops_on_open_circuit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |_req: String| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(HandlerError("boom"))
        }
    });

    let breaker: CircuitBreakerLayer<HandlerError> = CircuitBreakerLayer::builder()
        .failure_threshold(2)
        .half_open_after(Duration::from_secs(60))
        .name("payments")
        .build();

    // The retry advice treats an open circuit as non-retryable so it never
    // hammers a tripped breaker.
    let retry: RetryLayer<String, String, CircuitBreakerError<HandlerError>> =
        RetryLayer::builder()
            .max_attempts(10)
            .fixed_backoff(Duration::from_millis(1))
            .retry_on(|e: &CircuitBreakerError<HandlerError>| !e.is_circuit_open())
            .build();

    let mut service = ServiceBuilder::new()
        .layer(retry)
        .layer(breaker)
        .service(handler);

    let err = service
        .ready()
        .await
        .unwrap()
        .call("m".to_string())
        .await
        .unwrap_err();

    // Two real attempts trip the breaker; the third is rejected and the
    // retry loop propagates the rejection untouched.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    match err {
        RetryError::Inner(inner) => assert!(inner.is_circuit_open()),
        RetryError::Exhausted { .. } => panic!("open circuit must not be retried"),
    }
}

#[tokio::test]
async fn retry_recovers_before_the_breaker_trips() {
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

    let breaker: CircuitBreakerLayer<HandlerError> = CircuitBreakerLayer::builder()
        .failure_threshold(5)
        .build();
    let retry: RetryLayer<String, String, CircuitBreakerError<HandlerError>> =
        RetryLayer::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(1))
            .build();

    let mut service = ServiceBuilder::new()
        .layer(retry)
        .layer(breaker)
        .service(handler);

    let result = service.ready().await.unwrap().call("m".to_string()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn idempotency_over_lock_processes_each_message_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |msg: Message<String>| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Some(msg))
        }
    });

    let lock = LockLayer::builder(|m: &Message<String>| Some(m.payload().clone())).build();
    let dedup = IdempotencyLayer::builder(FirstSeenSelector::new(|m: &Message<String>| {
        m.payload().clone()
    }))
    .reject_with_error(true)
    .build();

    let mut service = ServiceBuilder::new().layer(dedup).layer(lock).service(handler);

    let first = service
        .ready()
        .await
        .unwrap()
        .call(Message::new("m-1".to_string()))
        .await;
    assert!(first.is_ok());

    let err = service
        .ready()
        .await
        .unwrap()
        .call(Message::new("m-1".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_rejected());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limiter_shields_the_circuit_breaker() {
    let handler =
        service_fn(|req: String| async move { Ok::<_, HandlerError>(req) });

    let breaker: CircuitBreakerLayer<HandlerError> =
        CircuitBreakerLayer::builder().failure_threshold(1).build();
    let limiter = RateLimiterLayer::builder()
        .rate(1)
        .period(Duration::from_secs(10))
        .max_delay(Duration::ZERO)
        .build();

    let mut service = ServiceBuilder::new()
        .layer(limiter)
        .layer(breaker)
        .service(handler);

    let first = service.ready().await.unwrap().call("m".to_string()).await;
    assert!(first.is_ok());

    // The limiter rejects before the breaker is consulted, so the
    // rejection does not count as a breaker failure.
    let err = service
        .ready()
        .await
        .unwrap()
        .call("m".to_string())
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn distinguished_failures_flatten_into_guard_error() {
    let duplicate: IdempotencyError<HandlerError> = IdempotencyError::DuplicateRejected;
    assert!(GuardError::from(duplicate).is_duplicate_rejected());

    let timeout: LockError<HandlerError> = LockError::AcquireTimeout {
        key: "order:1".to_string(),
    };
    match GuardError::from(timeout) {
        GuardError::LockUnavailable { key } => assert_eq!(key, "order:1"),
        other => panic!("unexpected variant: {:?}", other),
    }

    let limited: RateLimiterError<HandlerError> = RateLimiterError::RateLimited {
        required: Duration::from_millis(300),
        max_delay: Duration::from_millis(100),
    };
    match GuardError::from(limited) {
        GuardError::RateLimited { required } => {
            assert_eq!(required, Some(Duration::from_millis(300)));
        }
        other => panic!("unexpected variant: {:?}", other),
    }

    let open: CircuitBreakerError<HandlerError> = CircuitBreakerError::CircuitOpen {
        name: "payments".to_string(),
    };
    match GuardError::from(open) {
        GuardError::CircuitOpen { name } => assert_eq!(name.as_deref(), Some("payments")),
        other => panic!("unexpected variant: {:?}", other),
    }

    let exhausted: RetryError<HandlerError> = RetryError::Exhausted {
        attempts: 3,
        last: HandlerError("boom"),
        suppressed: vec![HandlerError("a"), HandlerError("b")],
    };
    match GuardError::from(exhausted) {
        GuardError::RetryExhausted {
            attempts,
            last,
            suppressed,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.application_error(), Some(HandlerError("boom")));
            assert_eq!(suppressed.len(), 2);
        }
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[tokio::test]
async fn full_message_pipeline_end_to_end() {
    // dedup -> lock -> handler, driven twice with the same message id.
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |msg: Message<String>| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Some(
                msg.with_header("processed", true),
            ))
        }
    });

    let lock = LockLayer::builder(|m: &Message<String>| Some(m.payload().clone()))
        .wait(Duration::from_secs(1))
        .name("orders-lock")
        .build();
    let dedup = IdempotencyLayer::builder(FirstSeenSelector::new(|m: &Message<String>| {
        m.payload().clone()
    }))
    .name("orders-dedup")
    .build();

    let mut service = ServiceBuilder::new().layer(dedup).layer(lock).service(handler);

    let first = service
        .ready()
        .await
        .unwrap()
        .call(Message::new("m-1".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert!(!first.is_duplicate());

    // Without a channel or rejection the duplicate is tagged and handled.
    let second = service
        .ready()
        .await
        .unwrap()
        .call(Message::new("m-1".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert!(second.is_duplicate());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
