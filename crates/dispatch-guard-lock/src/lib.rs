//! Keyed mutual-exclusion advice for message handlers.
//!
//! Serializes handler invocations that share a lock name. A key function
//! derives the name from each message (an order id, an aggregate key);
//! messages with different names run concurrently, messages with the same
//! name take turns. Locks come from a [`LockRegistry`], by default an
//! in-process map of lazily-created `tokio::sync::Mutex` instances.
//!
//! Acquisition waits unboundedly unless a
//! [`wait`](LockConfigBuilder::wait) bound is configured, in which case a
//! call that cannot acquire in time fails with
//! [`LockError::AcquireTimeout`] without invoking the handler. The lock is
//! held across the handler call and released when the call finishes,
//! successfully or not.
//!
//! A key function may return `None` for messages that carry no usable key.
//! Those are diverted to the discard channel when one is configured
//! (consumed, no reply), and otherwise invoke the handler without any
//! lock.
//!
//! # Examples
//!
//! ```
//! use dispatch_guard_lock::LockLayer;
//! use dispatch_guard_core::Message;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # #[derive(Clone)]
//! # struct Order { id: u64 }
//! # async fn example() {
//! let lock = LockLayer::builder(|m: &Message<Order>| Some(format!("order:{}", m.payload().id)))
//!     .wait(Duration::from_secs(5))
//!     .name("orders")
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(lock)
//!     .service(tower::service_fn(|m: Message<Order>| async move {
//!         Ok::<_, std::io::Error>(Some(m))
//!     }));
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod registry;

pub use config::{LockConfig, LockConfigBuilder};
pub use error::LockError;
pub use events::LockEvent;
pub use layer::LockLayer;
pub use registry::{InMemoryLockRegistry, LockRegistry};

use dispatch_guard_core::Message;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A service that holds a named lock across each handler invocation.
pub struct Lock<S, P> {
    inner: S,
    config: Arc<LockConfig<P>>,
}

impl<S, P> Lock<S, P> {
    pub(crate) fn new(inner: S, config: Arc<LockConfig<P>>) -> Self {
        Self { inner, config }
    }
}

impl<S, P> Clone for Lock<S, P>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, P, E> Service<Message<P>> for Lock<S, P>
where
    S: Service<Message<P>, Response = Option<Message<P>>, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    P: Send + Sync + 'static,
    E: Send + 'static,
{
    type Response = Option<Message<P>>;
    type Error = LockError<E>;
    type Future = BoxFuture<'static, Result<Option<Message<P>>, LockError<E>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(LockError::Inner)
    }

    fn call(&mut self, message: Message<P>) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let key = match (config.key_fn)(&message) {
                Some(key) => key,
                None => {
                    if let Some(channel) = &config.discard_channel {
                        let _ = channel.send(message);
                        config.event_listeners.emit(&LockEvent::NullKeyDiscarded {
                            advice_name: config.name.clone(),
                            timestamp: Instant::now(),
                        });

                        #[cfg(feature = "tracing")]
                        tracing::debug!(advice = %config.name, "discarded message without lock key");

                        return Ok(None);
                    }
                    // No key and nowhere to divert: run unlocked.
                    return service.call(message).await.map_err(LockError::Inner);
                }
            };

            let lock = config.registry.lock_for(&key);
            let started = Instant::now();
            let guard = match config.wait {
                Some(wait) => match tokio::time::timeout(wait, lock.lock_owned()).await {
                    Ok(guard) => guard,
                    Err(_) => {
                        config.event_listeners.emit(&LockEvent::AcquireTimedOut {
                            advice_name: config.name.clone(),
                            timestamp: Instant::now(),
                            key: key.clone(),
                        });

                        #[cfg(feature = "tracing")]
                        tracing::warn!(advice = %config.name, %key, "lock acquisition timed out");

                        #[cfg(feature = "metrics")]
                        counter!("lock_acquire_timeouts_total", "lock" => config.name.clone())
                            .increment(1);

                        return Err(LockError::AcquireTimeout { key });
                    }
                },
                None => lock.lock_owned().await,
            };

            let waited = started.elapsed();
            config.event_listeners.emit(&LockEvent::LockAcquired {
                advice_name: config.name.clone(),
                timestamp: Instant::now(),
                key: key.clone(),
                wait: waited,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("lock_acquisitions_total", "lock" => config.name.clone()).increment(1);
                histogram!("lock_wait_seconds", "lock" => config.name.clone())
                    .record(waited.as_secs_f64());
            }

            let result = service.call(message).await.map_err(LockError::Inner);
            drop(guard);
            result
        })
    }
}
