//! Retry advice for message handlers.
//!
//! Wraps a handler service with retry-on-failure in one of two modes:
//!
//! - **Stateless** (default): the classic in-process loop. Attempt the
//!   call; on a retryable failure, sleep per the backoff strategy and retry
//!   in the same call, up to the policy's attempt bound.
//! - **Stateful** (a [`state key`](RetryConfigBuilder::state_key) function
//!   is configured): redelivery becomes the retry driver. The first
//!   retryable failure for a key records backoff progress and rethrows
//!   immediately so an external redelivery mechanism (broker requeue,
//!   transactional rollback) brings the message back; a redelivered key
//!   sleeps only the *remaining* delay before re-attempting. This keeps a
//!   worker task from blocking through the whole backoff window, at the
//!   cost of assuming the transport resubmits the same keyed message.
//!
//! Per-key progress lives in a bounded LRU cache (default 100 keys);
//! evicting a key silently drops its progress and its next arrival starts a
//! fresh episode.
//!
//! On exhaustion the advice throws [`RetryError::Exhausted`] carrying the
//! final failure plus all prior failures as suppressed context, unless a
//! [`recovery hook`](RetryConfigBuilder::recover) produces a substitute
//! result. Non-retryable failures propagate with their identity intact.
//!
//! # Examples
//!
//! ```
//! use dispatch_guard_retry::RetryLayer;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct HandlerError;
//! # async fn example() {
//! let retry: RetryLayer<String, String, HandlerError> = RetryLayer::builder()
//!     .max_attempts(5)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .on_retry(|attempt, delay| {
//!         println!("retry {} after {:?}", attempt, delay);
//!     })
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(retry)
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, HandlerError>(req)
//!     }));
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod events;
mod layer;
mod policy;
mod state;

pub use backoff::{BackoffStrategy, ExponentialBackoff, FixedDelay, FnBackoff};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};
pub use state::DEFAULT_STATE_CAPACITY;

use crate::state::{FailureOutcome, RetryStateCache};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A service that retries failed invocations of the wrapped handler.
pub struct Retry<S, Req, Res, E> {
    inner: S,
    config: Arc<RetryConfig<Req, Res, E>>,
    states: Arc<RetryStateCache<E>>,
}

impl<S, Req, Res, E> Retry<S, Req, Res, E> {
    pub(crate) fn new(
        inner: S,
        config: Arc<RetryConfig<Req, Res, E>>,
        states: Arc<RetryStateCache<E>>,
    ) -> Self {
        Self {
            inner,
            config,
            states,
        }
    }
}

impl<S, Req, Res, E> Clone for Retry<S, Req, Res, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            states: Arc::clone(&self.states),
        }
    }
}

impl<S, Req, Res, E> Service<Req> for Retry<S, Req, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + Sync + 'static,
    Res: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Response = Res;
    type Error = RetryError<E>;
    type Future = BoxFuture<'static, Result<Res, RetryError<E>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RetryError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Cloning the inner service gives each attempt a structurally
        // independent invocation of the same downstream chain.
        let service = self.inner.clone();
        let config = Arc::clone(&self.config);
        let states = Arc::clone(&self.states);

        Box::pin(async move {
            match config.state_key.clone() {
                Some(key_fn) => {
                    let key = key_fn(&req);
                    run_stateful(service, req, key, config, states).await
                }
                None => run_stateless(service, req, config).await,
            }
        })
    }
}

fn recover_or<Req, Res, E>(
    config: &RetryConfig<Req, Res, E>,
    req: &Req,
    err: RetryError<E>,
) -> Result<Res, RetryError<E>> {
    match &config.recovery {
        Some(recovery) => recovery(req, err),
        None => Err(err),
    }
}

async fn run_stateless<S, Req, Res, E>(
    mut service: S,
    req: Req,
    config: Arc<RetryConfig<Req, Res, E>>,
) -> Result<Res, RetryError<E>>
where
    S: Service<Req, Response = Res, Error = E>,
    Req: Clone,
{
    let mut attempt = 0usize;
    let mut suppressed: Vec<E> = Vec::new();

    loop {
        match service.call(req.clone()).await {
            Ok(response) => {
                config.event_listeners.emit(&RetryEvent::Success {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt + 1,
                });
                return Ok(response);
            }
            Err(error) => {
                if !config.policy.should_retry(&error) {
                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(RetryError::Inner(error));
                }

                attempt += 1;
                if attempt >= config.policy.max_attempts() {
                    config.event_listeners.emit(&RetryEvent::Error {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_exhausted_total", "retry" => config.name.clone()).increment(1);

                    let err = RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                        suppressed,
                    };
                    return recover_or(&config, &req, err);
                }

                suppressed.push(error);
                let delay = config.policy.delay_for(attempt - 1);
                config.event_listeners.emit(&RetryEvent::Retry {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(advice = %config.name, attempt, ?delay, "retrying after backoff");

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn run_stateful<S, Req, Res, E>(
    mut service: S,
    req: Req,
    key: String,
    config: Arc<RetryConfig<Req, Res, E>>,
    states: Arc<RetryStateCache<E>>,
) -> Result<Res, RetryError<E>>
where
    S: Service<Req, Response = Res, Error = E>,
    Req: Clone,
    E: Clone,
{
    if config
        .fresh_when
        .as_ref()
        .map(|predicate| predicate(&req))
        .unwrap_or(false)
    {
        states.remove(&key);
    }

    match states.remaining_delay(&key) {
        // First sighting of this key (or its progress was evicted).
        None => match service.call(req.clone()).await {
            Ok(response) => {
                config.event_listeners.emit(&RetryEvent::Success {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: 1,
                });
                Ok(response)
            }
            Err(error) => {
                if !config.policy.should_retry(&error) {
                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(RetryError::Inner(error));
                }

                if config.policy.max_attempts() <= 1 {
                    config.event_listeners.emit(&RetryEvent::Error {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: 1,
                    });
                    let err = RetryError::Exhausted {
                        attempts: 1,
                        last: error,
                        suppressed: Vec::new(),
                    };
                    return recover_or(&config, &req, err);
                }

                let delay = config.policy.delay_for(0);
                states.begin_episode(key.clone(), error.clone(), delay);
                config.event_listeners.emit(&RetryEvent::Rescheduled {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt: 1,
                    delay,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    advice = %config.name,
                    %key,
                    ?delay,
                    "recorded retry state; rethrowing for redelivery"
                );

                // Rethrow so the transport redelivers the same key later.
                Err(RetryError::Inner(error))
            }
        },

        // Redelivery of a tracked key: honor any remaining backoff first.
        Some(remaining) => {
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }

            match service.call(req.clone()).await {
                Ok(response) => {
                    let failed_attempts = states.clear(&key).unwrap_or(0);
                    config.event_listeners.emit(&RetryEvent::Success {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: failed_attempts + 1,
                    });
                    Ok(response)
                }
                Err(error) => {
                    if !config.policy.should_retry(&error) {
                        config.event_listeners.emit(&RetryEvent::IgnoredError {
                            advice_name: config.name.clone(),
                            timestamp: Instant::now(),
                        });
                        return Err(RetryError::Inner(error));
                    }

                    match states.record_failure(&key, error.clone(), &config.policy) {
                        FailureOutcome::Rescheduled { attempt, delay } => {
                            config.event_listeners.emit(&RetryEvent::Rescheduled {
                                advice_name: config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                                delay,
                            });

                            #[cfg(feature = "metrics")]
                            counter!("retry_attempts_total", "retry" => config.name.clone())
                                .increment(1);

                            Err(RetryError::Inner(error))
                        }
                        FailureOutcome::Exhausted {
                            attempts,
                            mut failures,
                        } => {
                            config.event_listeners.emit(&RetryEvent::Error {
                                advice_name: config.name.clone(),
                                timestamp: Instant::now(),
                                attempts,
                            });

                            #[cfg(feature = "metrics")]
                            counter!("retry_exhausted_total", "retry" => config.name.clone())
                                .increment(1);

                            // The recorded copy of the final failure is
                            // dropped in favor of the original value.
                            failures.pop();
                            let err = RetryError::Exhausted {
                                attempts,
                                last: error,
                                suppressed: failures,
                            };
                            recover_or(&config, &req, err)
                        }
                    }
                }
            }
        }
    }
}
