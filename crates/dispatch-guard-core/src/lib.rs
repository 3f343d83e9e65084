//! Core building blocks shared by the dispatch-guard advice crates.
//!
//! A *handler* is a `tower::Service` taking one [`Message`] and producing
//! zero-or-one reply (`Option<Message>`). An *advice* is a `tower::Layer`
//! wrapping a handler with a protective behavior (retry, circuit breaking,
//! rate limiting, locking, duplicate filtering). This crate carries the
//! pieces every advice needs:
//!
//! - [`Message`]: an immutable payload plus a copy-on-modify header map.
//! - [`MessageChannel`]: the narrow `send -> bool` contract used for
//!   discard/divert destinations, with [`BufferChannel`] as the in-memory
//!   default.
//! - The event system ([`AdviceEvent`], [`EventListeners`], [`FnListener`])
//!   each advice uses for observability callbacks.
//! - [`GuardError`]: a unified error type so stacked advices compose without
//!   hand-written `From` chains.

pub mod channel;
pub mod error;
pub mod events;
pub mod message;

pub use channel::{BufferChannel, MessageChannel};
pub use error::GuardError;
pub use events::{AdviceEvent, EventListener, EventListeners, FnListener};
pub use message::{HeaderValue, Message, DELIVERY_ATTEMPT, DUPLICATE_MESSAGE};
