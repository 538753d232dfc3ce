//! Radix-tree request router and the dispatch boundary.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler; interceptors registered with [`Router::intercept`] observe
//! every invocation that goes through [`Router::handle`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use matchit::Router as MatchitRouter;
use tracing::{debug, warn};

use crate::error::Failure;
use crate::handler::{BoxedHandler, Handler, HandlerId};
use crate::middleware::{Interceptor, Invocation, RequestContext, Returned};
use crate::request::Request;
use crate::response::Response;

/// A registered route: the handler plus what interceptors need to know
/// about it.
#[derive(Clone)]
struct Route {
    id: Arc<HandlerId>,
    pattern: Arc<str>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern or conflicts with one
    /// already registered for `method`. Routes are fixed at startup, so this
    /// is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = Route {
            id: Arc::new(handler.id()),
            pattern: Arc::from(path),
            handler: handler.into_boxed_handler(),
        };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Adds an interceptor at the dispatch boundary.
    ///
    /// Interceptors run in registration order, after the handler finishes.
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(Route, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.clone(), params))
    }

    fn allows_other_method(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok())
    }

    /// Routes one request, runs its handler and the interceptors, and
    /// produces one response.
    ///
    /// Never fails: unknown routes become `404`/`405`, an unreadable body
    /// `400`, and a failing handler `500` once the failure hooks have seen it.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();

        let Some((route, path_params)) = self.lookup(&parts.method, &path) else {
            let status = if self.allows_other_method(&parts.method, &path) {
                StatusCode::METHOD_NOT_ALLOWED
            } else {
                StatusCode::NOT_FOUND
            };
            return Response::status(status).into_inner();
        };

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!(path = %path, "failed to read request body: {e}");
                return Response::status(StatusCode::BAD_REQUEST).into_inner();
            }
        };

        let req = Request::new(
            parts.method,
            path,
            parts.uri.query(),
            parts.headers,
            body,
            path_params,
        );
        let ctx = RequestContext::capture(&req);

        // A handler can panic while building its future as well as while
        // it is polled; both count as failures.
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| route.handler.call(req))) {
            Ok(fut) => AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(Failure::from_panic(payload.as_ref()))),
            Err(payload) => Err(Failure::from_panic(payload.as_ref())),
        };

        let invocation = Invocation::new(&route.id, &route.pattern, Some(&ctx));
        let response = match outcome {
            Ok(response) => {
                self.after_returning(&invocation, &response);
                response
            }
            Err(failure) => {
                self.after_throwing(&invocation, &failure);
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
        response.into_inner()
    }

    fn after_returning(&self, invocation: &Invocation<'_>, response: &Response) {
        let returned = Returned::new(response);
        for interceptor in &self.interceptors {
            if !interceptor.intercepts_returning(invocation) {
                continue;
            }
            if let Err(e) = interceptor.after_returning(invocation, &returned) {
                warn!(handler = %invocation.handler(), "post-success hook failed: {e}");
            }
        }
    }

    fn after_throwing(&self, invocation: &Invocation<'_>, failure: &Failure) {
        for interceptor in &self.interceptors {
            if !interceptor.intercepts_throwing(invocation) {
                continue;
            }
            if let Err(e) = interceptor.after_throwing(invocation, failure) {
                warn!(handler = %invocation.handler(), "post-failure hook failed: {e}");
            }
        }
    }
}
