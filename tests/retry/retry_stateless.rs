use dispatch_guard_retry::{RetryError, RetryLayer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, Layer, Service, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct HandlerError(&'static str);

#[tokio::test]
async fn succeeds_without_retry_on_first_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let handler = service_fn(move |req: String| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, HandlerError>(req)
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .build();
    let mut service = layer.layer(handler);

    let result = service.ready().await.unwrap().call("m".to_string()).await;
    assert_eq!(result.unwrap(), "m");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_until_the_handler_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let handler = service_fn(move |req: String| {
        let c = Arc::clone(&c);
        async move {
            if c.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(HandlerError("transient"))
            } else {
                Ok(req)
            }
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(2))
        .build();
    let mut service = layer.layer(handler);

    let result = service.ready().await.unwrap().call("m".to_string()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn exhaustion_reports_every_failure() {
    let handler = service_fn(|_req: String| async move {
        Err::<String, _>(HandlerError("always"))
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(4)
        .fixed_backoff(Duration::from_millis(1))
        .build();
    let mut service = layer.layer(handler);

    let err = service
        .ready()
        .await
        .unwrap()
        .call("m".to_string())
        .await
        .unwrap_err();

    match err {
        RetryError::Exhausted {
            attempts,
            last,
            suppressed,
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last, HandlerError("always"));
            // Every attempt but the final one is suppressed context.
            assert_eq!(suppressed.len(), 3);
        }
        RetryError::Inner(_) => panic!("expected exhaustion"),
    }
}

#[tokio::test]
async fn predicate_excludes_fatal_errors_from_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let handler = service_fn(move |_req: String| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(HandlerError("fatal"))
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(1))
        .retry_on(|e: &HandlerError| e.0 == "transient")
        .build();
    let mut service = layer.layer(handler);

    let err = service
        .ready()
        .await
        .unwrap()
        .call("m".to_string())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, RetryError::Inner(HandlerError("fatal"))));
}

#[tokio::test]
async fn callbacks_observe_each_attempt() {
    let retries = Arc::new(AtomicUsize::new(0));
    let successes = Arc::new(AtomicUsize::new(0));
    let (r, s) = (Arc::clone(&retries), Arc::clone(&successes));

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handler = service_fn(move |req: String| {
        let c = Arc::clone(&c);
        async move {
            if c.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(HandlerError("transient"))
            } else {
                Ok(req)
            }
        }
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(1))
        .on_retry(move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_success(move |attempts| {
            assert_eq!(attempts, 3);
            s.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let mut service = layer.layer(handler);

    service
        .ready()
        .await
        .unwrap()
        .call("m".to_string())
        .await
        .unwrap();
    assert_eq!(retries.load(Ordering::SeqCst), 2);
    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn recovery_hook_sees_the_original_request() {
    let handler = service_fn(|_req: String| async move {
        Err::<String, _>(HandlerError("always"))
    });

    let layer: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(1))
        .recover(|req, err| {
            assert!(err.is_exhausted());
            Ok(format!("fallback for {}", req))
        })
        .build();
    let mut service = layer.layer(handler);

    let result = service.ready().await.unwrap().call("m-9".to_string()).await;
    assert_eq!(result.unwrap(), "fallback for m-9");
}
