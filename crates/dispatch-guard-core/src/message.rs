//! The message value advices operate on.
//!
//! A [`Message`] is an opaque payload plus a `String -> HeaderValue` header
//! map. Messages are immutable: header "mutation" consumes the message and
//! returns a modified copy, so an advice can tag a message (for example with
//! [`DUPLICATE_MESSAGE`]) without affecting other holders of a clone.

use std::collections::HashMap;

/// Header set on a message that was recognized as a duplicate but passed
/// through to the handler anyway, so downstream logic can decide how to react.
pub const DUPLICATE_MESSAGE: &str = "duplicate-message";

/// Header a redelivering transport may stamp with the current delivery
/// attempt (1-indexed).
pub const DELIVERY_ATTEMPT: &str = "delivery-attempt";

/// A typed header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl HeaderValue {
    /// Returns the boolean value, if this is a `Bool` header.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int` header.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `Str` header.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

/// An immutable message: a payload and a header map.
///
/// The payload type is opaque to every advice; advices only clone messages,
/// read headers, and occasionally return a header-tagged copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<P> {
    payload: P,
    headers: HashMap<String, HeaderValue>,
}

impl<P> Message<P> {
    /// Creates a message with an empty header map.
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            headers: HashMap::new(),
        }
    }

    /// Returns a reference to the payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consumes the message, returning the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Returns the header with the given name, if present.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Returns the full header map.
    pub fn headers(&self) -> &HashMap<String, HeaderValue> {
        &self.headers
    }

    /// Returns a copy of this message with the given header set.
    ///
    /// Copy-on-modify: the original message (and any clones of it) are
    /// unaffected.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns true if the message carries the [`DUPLICATE_MESSAGE`] marker.
    pub fn is_duplicate(&self) -> bool {
        self.header(DUPLICATE_MESSAGE)
            .and_then(HeaderValue::as_bool)
            .unwrap_or(false)
    }

    /// Returns the transport-stamped delivery attempt, if present.
    pub fn delivery_attempt(&self) -> Option<i64> {
        self.header(DELIVERY_ATTEMPT).and_then(HeaderValue::as_int)
    }
}
