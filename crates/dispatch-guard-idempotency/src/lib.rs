//! Idempotent receiver advice for message handlers.
//!
//! Filters redelivered duplicates before they reach the handler. A
//! [`DuplicateSelector`] classifies each message; the first sighting of a
//! message passes through untouched, and what happens to a duplicate
//! depends on configuration:
//!
//! - a configured discard channel receives the duplicate first;
//! - with [`reject_with_error`](IdempotencyConfigBuilder::reject_with_error)
//!   set, the call then fails with [`IdempotencyError::DuplicateRejected`];
//! - with a channel but no error flag, the call resolves to `Ok(None)` (no
//!   reply, duplicate consumed);
//! - with neither, the duplicate is tagged with the `duplicate-message`
//!   header and passed through so the handler can decide.
//!
//! The bundled [`FirstSeenSelector`] remembers message keys in a bounded
//! LRU; forgotten keys are accepted again, so the filter trades exactness
//! for bounded memory.
//!
//! # Examples
//!
//! ```
//! use dispatch_guard_idempotency::{FirstSeenSelector, IdempotencyLayer};
//! use dispatch_guard_core::Message;
//! use tower::ServiceBuilder;
//!
//! # #[derive(Clone)]
//! # struct Order { id: u64 }
//! # async fn example() {
//! let dedup = IdempotencyLayer::builder(FirstSeenSelector::new(
//!     |m: &Message<Order>| format!("order:{}", m.payload().id),
//! ))
//! .reject_with_error(true)
//! .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(dedup)
//!     .service(tower::service_fn(|m: Message<Order>| async move {
//!         Ok::<_, std::io::Error>(Some(m))
//!     }));
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod selector;

pub use config::{IdempotencyConfig, IdempotencyConfigBuilder};
pub use error::IdempotencyError;
pub use events::IdempotencyEvent;
pub use layer::IdempotencyLayer;
pub use selector::{DuplicateSelector, FirstSeenSelector, FnSelector, DEFAULT_SEEN_CAPACITY};

use dispatch_guard_core::{Message, DUPLICATE_MESSAGE};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A service that filters duplicate messages before the wrapped handler.
pub struct IdempotentReceiver<S, P> {
    inner: S,
    config: Arc<IdempotencyConfig<P>>,
}

impl<S, P> IdempotentReceiver<S, P> {
    pub(crate) fn new(inner: S, config: Arc<IdempotencyConfig<P>>) -> Self {
        Self { inner, config }
    }
}

impl<S, P> Clone for IdempotentReceiver<S, P>
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

impl<S, P, E> Service<Message<P>> for IdempotentReceiver<S, P>
where
    S: Service<Message<P>, Response = Option<Message<P>>, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    P: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Response = Option<Message<P>>;
    type Error = IdempotencyError<E>;
    type Future = BoxFuture<'static, Result<Option<Message<P>>, IdempotencyError<E>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(IdempotencyError::Inner)
    }

    fn call(&mut self, message: Message<P>) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            if config.selector.accept(&message) {
                return service.call(message).await.map_err(IdempotencyError::Inner);
            }

            #[cfg(feature = "metrics")]
            counter!("idempotency_duplicates_total", "idempotency" => config.name.clone())
                .increment(1);

            if let Some(channel) = &config.discard_channel {
                let _ = channel.send(message.clone());
                config
                    .event_listeners
                    .emit(&IdempotencyEvent::DuplicateDiscarded {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });

                #[cfg(feature = "tracing")]
                tracing::debug!(advice = %config.name, "diverted duplicate to discard channel");
            }

            if config.reject_with_error {
                config
                    .event_listeners
                    .emit(&IdempotencyEvent::DuplicateRejected {
                        advice_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });

                #[cfg(feature = "tracing")]
                tracing::warn!(advice = %config.name, "rejecting duplicate message");

                return Err(IdempotencyError::DuplicateRejected);
            }

            if config.discard_channel.is_some() {
                // Diverted and nothing more to do: consume with no reply.
                return Ok(None);
            }

            config
                .event_listeners
                .emit(&IdempotencyEvent::DuplicateTagged {
                    advice_name: config.name.clone(),
                    timestamp: Instant::now(),
                });

            #[cfg(feature = "tracing")]
            tracing::debug!(advice = %config.name, "tagging duplicate and passing through");

            let tagged = message.with_header(DUPLICATE_MESSAGE, true);
            service.call(tagged).await.map_err(IdempotencyError::Inner)
        })
    }
}
