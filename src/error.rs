//! Unified error types.

use std::any::Any;
use std::fmt;

use crate::handler::HandlerId;

/// The error type returned by oplog's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: parsing an address, binding to a port or
/// accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Raised by an [`Interceptor`](crate::middleware::Interceptor) hook.
///
/// Hook errors never change the response. The dispatch boundary logs them at
/// `warn` and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterceptError {
    /// The hook needed the inbound request but the invocation carried none.
    #[error("no request context for `{handler}`")]
    MissingContext { handler: HandlerId },
}

/// A handler that did not return normally.
///
/// Built from the `Err` arm of a handler returning `Result`, or from a panic
/// caught at the dispatch boundary. `type_name` is what the failure hook
/// reports; the message is kept for callers that want more than the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    type_name: &'static str,
    message: String,
}

impl Failure {
    /// Type name reported for handler panics.
    pub const PANIC: &'static str = "panic";

    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self { type_name: std::any::type_name::<E>(), message: err.to_string() }
    }

    /// Builds a failure from a `catch_unwind` payload.
    ///
    /// `panic!` payloads are either `&'static str` or `String`; anything else
    /// carries no message.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        Self { type_name: Self::PANIC, message }
    }

    /// The runtime type name of the error (`panic` for panics).
    pub fn type_name(&self) -> &'static str { self.type_name }

    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.type_name)
        } else {
            write!(f, "{}: {}", self.type_name, self.message)
        }
    }
}
