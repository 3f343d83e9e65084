//! Circuit breaker advice for message handlers.
//!
//! Tracks handler failures in a shared counter and rejects calls once the
//! count reaches a threshold, until an open window elapses. There is no
//! stored state machine: whether the circuit is open is derived per call
//! from two atomics (failure count, last-failure time), so the advice adds
//! no locking to the hot path.
//!
//! - **Closed**: fewer failures than the threshold; calls pass through.
//! - **Open**: threshold reached and the last failure is newer than
//!   `half_open_after`; calls fail fast with
//!   [`CircuitBreakerError::CircuitOpen`].
//! - **Half-open**: threshold reached but the window has elapsed; the next
//!   call probes the handler. A success resets the counter to zero, a
//!   failure re-opens the window.
//!
//! There is no single-probe permit: several concurrent calls may probe a
//! half-open circuit at once, and a call racing the tripping of the circuit
//! may still reach the handler. Both races only cost extra handler calls.
//!
//! # Examples
//!
//! ```
//! use dispatch_guard_circuitbreaker::CircuitBreakerLayer;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct HandlerError;
//! # async fn example() {
//! let breaker: CircuitBreakerLayer<HandlerError> = CircuitBreakerLayer::builder()
//!     .failure_threshold(5)
//!     .half_open_after(Duration::from_secs(30))
//!     .name("orders")
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(breaker)
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, HandlerError>(req)
//!     }));
//! # }
//! ```

mod breaker;
mod config;
mod error;
mod events;
mod layer;

pub use breaker::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

use crate::breaker::FailureTracker;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A service that fails fast while the shared circuit is open.
pub struct CircuitBreaker<S, E> {
    inner: S,
    config: Arc<CircuitBreakerConfig<E>>,
    tracker: Arc<FailureTracker>,
}

impl<S, E> CircuitBreaker<S, E> {
    pub(crate) fn new(
        inner: S,
        config: Arc<CircuitBreakerConfig<E>>,
        tracker: Arc<FailureTracker>,
    ) -> Self {
        Self {
            inner,
            config,
            tracker,
        }
    }

    /// Current derived circuit state.
    pub fn state(&self) -> CircuitState {
        self.tracker
            .state(self.config.failure_threshold, self.config.half_open_after)
    }

    /// Returns true if a call made now would be rejected.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Current failure count.
    pub fn failures(&self) -> usize {
        self.tracker.failures()
    }
}

impl<S, E> Clone for CircuitBreaker<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<S, Req, E> Service<Req> for CircuitBreaker<S, E>
where
    S: Service<Req, Error = E> + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Send + 'static,
    E: Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<E>;
    type Future = BoxFuture<'static, Result<S::Response, CircuitBreakerError<E>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let tracker = Arc::clone(&self.tracker);

        if tracker.state(config.failure_threshold, config.half_open_after) == CircuitState::Open {
            let failures = tracker.failures();
            config.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
                advice_name: config.name.clone(),
                timestamp: Instant::now(),
                failures,
            });

            #[cfg(feature = "tracing")]
            tracing::warn!(advice = %config.name, failures, "rejecting call, circuit open");

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_rejected_total", "circuitbreaker" => config.name.clone())
                .increment(1);

            let name = config.name.clone();
            return Box::pin(async move { Err(CircuitBreakerError::CircuitOpen { name }) });
        }

        config.event_listeners.emit(&CircuitBreakerEvent::CallPermitted {
            advice_name: config.name.clone(),
            timestamp: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_permitted_total", "circuitbreaker" => config.name.clone())
            .increment(1);

        let future = self.inner.call(req);
        Box::pin(async move {
            match future.await {
                Ok(response) => {
                    if tracker.record_success() {
                        config.event_listeners.emit(&CircuitBreakerEvent::CircuitReset {
                            advice_name: config.name.clone(),
                            timestamp: Instant::now(),
                        });

                        #[cfg(feature = "tracing")]
                        tracing::debug!(advice = %config.name, "success reset the circuit");
                    }
                    Ok(response)
                }
                Err(error) => {
                    let counts = config
                        .failure_predicate
                        .as_ref()
                        .map(|predicate| predicate(&error))
                        .unwrap_or(true);
                    if counts {
                        let failures = tracker.record_failure();
                        config
                            .event_listeners
                            .emit(&CircuitBreakerEvent::FailureRecorded {
                                advice_name: config.name.clone(),
                                timestamp: Instant::now(),
                                failures,
                            });

                        #[cfg(feature = "tracing")]
                        tracing::debug!(advice = %config.name, failures, "recorded handler failure");

                        #[cfg(feature = "metrics")]
                        counter!("circuitbreaker_failures_total", "circuitbreaker" => config.name.clone())
                            .increment(1);
                    }
                    Err(CircuitBreakerError::Inner(error))
                }
            }
        })
    }
}
