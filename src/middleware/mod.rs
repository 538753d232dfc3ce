//! Interception at the dispatch boundary.
//!
//! The router runs every handler inside a boundary with two extension points:
//!
//! - **after returning**: the handler produced a response;
//! - **after throwing**: the handler returned `Err` or panicked.
//!
//! An [`Interceptor`] picks which invocations it observes through its two
//! scope predicates, then sees each of those invocations through an
//! [`Invocation`] handle. The handle carries the inbound request's
//! [`RequestContext`] explicitly; nothing is stored in thread-locals or
//! task-locals, so interceptors work the same on any runtime thread.
//!
//! Interceptors only observe. Whatever they do, the response is the one the
//! handler produced, or `500 Internal Server Error` for a failure.
//!
//! Built-in:
//! - [`OperationLog`] — per-handler operation logging with metadata

mod oplog;
mod params;
mod sink;

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::error::{Failure, InterceptError};
use crate::handler::HandlerId;
use crate::request::{Params, Request};
use crate::response::Response;

pub use oplog::OperationLog;
pub use params::{ParamMap, first_values};
pub use sink::{LOG_TARGET, Level, LogEntry, LogRecord, LogSink, MemorySink, TracingSink};

// ── Interceptor ───────────────────────────────────────────────────────────────

/// Hooks run by the router after each handler invocation.
///
/// Every method has a default, so implementors override only what they
/// need. A hook error is logged at `warn` and does not affect the response.
pub trait Interceptor: Send + Sync {
    /// Whether [`after_returning`](Self::after_returning) runs for this invocation.
    fn intercepts_returning(&self, _invocation: &Invocation<'_>) -> bool {
        true
    }

    /// Whether [`after_throwing`](Self::after_throwing) runs for this invocation.
    fn intercepts_throwing(&self, _invocation: &Invocation<'_>) -> bool {
        true
    }

    /// Runs once the handler has returned normally. Never runs for a failure.
    fn after_returning(
        &self,
        _invocation: &Invocation<'_>,
        _returned: &Returned<'_>,
    ) -> Result<(), InterceptError> {
        Ok(())
    }

    /// Runs once the handler has failed. Never runs for a normal return.
    fn after_throwing(
        &self,
        _invocation: &Invocation<'_>,
        _failure: &Failure,
    ) -> Result<(), InterceptError> {
        Ok(())
    }
}

impl<T: Interceptor + ?Sized> Interceptor for Arc<T> {
    fn intercepts_returning(&self, invocation: &Invocation<'_>) -> bool {
        (**self).intercepts_returning(invocation)
    }

    fn intercepts_throwing(&self, invocation: &Invocation<'_>) -> bool {
        (**self).intercepts_throwing(invocation)
    }

    fn after_returning(
        &self,
        invocation: &Invocation<'_>,
        returned: &Returned<'_>,
    ) -> Result<(), InterceptError> {
        (**self).after_returning(invocation, returned)
    }

    fn after_throwing(
        &self,
        invocation: &Invocation<'_>,
        failure: &Failure,
    ) -> Result<(), InterceptError> {
        (**self).after_throwing(invocation, failure)
    }
}

// ── Invocation ────────────────────────────────────────────────────────────────

/// Request data captured before the handler runs.
///
/// The handler takes ownership of the [`Request`], so the router snapshots
/// what interceptors read before the call.
#[derive(Clone, Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    params: Params,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, params: Params) -> Self {
        Self { method, path: path.into(), params }
    }

    pub(crate) fn capture(req: &Request) -> Self {
        Self::new(req.method().clone(), req.path(), req.params().clone())
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn params(&self) -> &Params { &self.params }
}

/// One handler invocation as seen by an interceptor.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    handler: &'a HandlerId,
    route: &'a str,
    request: Option<&'a RequestContext>,
}

impl<'a> Invocation<'a> {
    /// `request` is `None` when the handler is invoked outside HTTP dispatch.
    pub fn new(handler: &'a HandlerId, route: &'a str, request: Option<&'a RequestContext>) -> Self {
        Self { handler, route, request }
    }

    pub fn handler(&self) -> &'a HandlerId { self.handler }

    /// The route pattern the handler was registered under, e.g. `/users/{id}`.
    pub fn route(&self) -> &'a str { self.route }

    pub fn request(&self) -> Option<&'a RequestContext> { self.request }
}

/// The value a handler returned, as its rendered response.
#[derive(Clone, Copy, Debug)]
pub struct Returned<'a> {
    response: &'a Response,
}

impl<'a> Returned<'a> {
    pub fn new(response: &'a Response) -> Self {
        Self { response }
    }

    pub fn response(&self) -> &'a Response { self.response }

    /// The returned value as JSON.
    ///
    /// - no body and no content type (a bare status) → `null`
    /// - valid JSON body with a JSON content type → the body, compacted
    /// - anything else, empty text included → the body text as a JSON string
    pub fn to_json(&self) -> String {
        let body = self.response.body();
        let content_type = self.response.content_type();
        if body.is_empty() && content_type.is_none() {
            return "null".to_owned();
        }
        if content_type.is_some_and(is_json_mime) {
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
                return value.to_string();
            }
        }
        serde_json::Value::String(String::from_utf8_lossy(body).into_owned()).to_string()
    }
}

fn is_json_mime(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Which handlers a hook applies to.
#[derive(Clone, Default)]
pub enum Scope {
    /// Every handler.
    #[default]
    All,
    /// Handlers whose owner is this module or type path, or nested under it.
    /// `app::controller` matches `app::controller::Hello` but not
    /// `app::controllers`.
    Namespace(String),
    /// Handlers whose route pattern starts with this prefix.
    PathPrefix(String),
    Custom(Arc<dyn Fn(&Invocation<'_>) -> bool + Send + Sync>),
}

impl Scope {
    pub fn namespace(prefix: impl Into<String>) -> Self {
        Self::Namespace(prefix.into())
    }

    pub fn path_prefix(prefix: impl Into<String>) -> Self {
        Self::PathPrefix(prefix.into())
    }

    pub fn custom(f: impl Fn(&Invocation<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn matches(&self, invocation: &Invocation<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Namespace(prefix) => {
                let owner = invocation.handler().owner();
                owner
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
            }
            Self::PathPrefix(prefix) => invocation.route().starts_with(prefix.as_str()),
            Self::Custom(f) => f(invocation),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Namespace(p) => f.debug_tuple("Namespace").field(p).finish(),
            Self::PathPrefix(p) => f.debug_tuple("PathPrefix").field(p).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
