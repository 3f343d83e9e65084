//! Retry advice tests.
//!
//! Test organization:
//! - retry_stateless.rs: in-process retry loop behavior
//! - retry_stateful.rs: redelivery-driven retry and the state cache
//! - retry_backoff.rs: backoff strategies observed through the layer

mod retry_backoff;
mod retry_stateful;
mod retry_stateless;
