//! Admission rate limiting advice for message handlers.
//!
//! Admits at most `rate` calls per `period`, globally across all clones of
//! the wrapped handler. Admission is blocking: a call arriving when the
//! budget is spent sleeps until its scheduled start instead of failing,
//! unless a configured [`max_delay`](RateLimiterConfigBuilder::max_delay)
//! would be exceeded, in which case it is rejected with
//! [`RateLimiterError::RateLimited`] without consuming a slot.
//!
//! Scheduling is fixed-slot: one atomic slot per admitted call in a period,
//! taken round-robin, each committed to start no earlier than one period
//! after its previous occupant. No per-key state is kept.
//!
//! # Examples
//!
//! ```
//! use dispatch_guard_ratelimiter::RateLimiterLayer;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiterLayer::builder()
//!     .rate(100)
//!     .period(Duration::from_secs(1))
//!     .max_delay(Duration::from_millis(250))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(limiter)
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, std::io::Error>(req)
//!     }));
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;
pub use layer::RateLimiterLayer;

use crate::limiter::SlotLimiter;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A service that delays or rejects calls to honor the shared admission
/// budget.
pub struct RateLimiter<S> {
    inner: S,
    config: Arc<RateLimiterConfig>,
    limiter: Arc<SlotLimiter>,
}

impl<S> RateLimiter<S> {
    pub(crate) fn new(
        inner: S,
        config: Arc<RateLimiterConfig>,
        limiter: Arc<SlotLimiter>,
    ) -> Self {
        Self {
            inner,
            config,
            limiter,
        }
    }
}

impl<S> Clone for RateLimiter<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<S, Req> Service<Req> for RateLimiter<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimiterError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, RateLimiterError<S::Error>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimiterError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);
        let limiter = Arc::clone(&self.limiter);

        Box::pin(async move {
            let wait = match limiter.reserve(config.max_delay) {
                Ok(wait) => wait,
                Err(refused) => {
                    config
                        .event_listeners
                        .emit(&RateLimiterEvent::PermitRejected {
                            advice_name: config.name.clone(),
                            timestamp: Instant::now(),
                            required: refused.required,
                        });

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        advice = %config.name,
                        required = ?refused.required,
                        "rejecting call, admission wait exceeds bound"
                    );

                    #[cfg(feature = "metrics")]
                    counter!("ratelimiter_permits_rejected_total", "ratelimiter" => config.name.clone())
                        .increment(1);

                    // max_delay is always Some here: an unbounded limiter
                    // never refuses.
                    let max_delay = config.max_delay.unwrap_or_default();
                    return Err(RateLimiterError::RateLimited {
                        required: refused.required,
                        max_delay,
                    });
                }
            };

            if !wait.is_zero() {
                #[cfg(feature = "tracing")]
                tracing::debug!(advice = %config.name, ?wait, "delaying call for admission");

                tokio::time::sleep(wait).await;
            }

            config
                .event_listeners
                .emit(&RateLimiterEvent::PermitAcquired {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                    wait,
                });

            #[cfg(feature = "metrics")]
            {
                counter!("ratelimiter_permits_acquired_total", "ratelimiter" => config.name.clone())
                    .increment(1);
                histogram!("ratelimiter_wait_seconds", "ratelimiter" => config.name.clone())
                    .record(wait.as_secs_f64());
            }

            service.call(req).await.map_err(RateLimiterError::Inner)
        })
    }
}
