//! Handler trait, handler identity and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one table, so each one
//! is hidden behind a trait object (`dyn ErasedHandler`):
//!
//! ```text
//! async fn hello(req: Request) -> String { … }     ← user writes this
//!        ↓ router.get("/hello", hello)
//! hello.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                        ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_outcome() })
//! ```
//!
//! Unlike a plain response, the erased future yields an [`Outcome`]: either
//! the response of a normal return or the [`Failure`] of an `Err` return.
//! That split is what lets the dispatch boundary run the post-success and
//! post-failure hooks of [`crate::middleware`].

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Failure;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Handler identity ──────────────────────────────────────────────────────────

/// Owning-type-qualified identity of a handler.
///
/// Rendered as `<owner>.<method>`, e.g. `app::HelloController.hello`.
/// Derived from the handler's Rust type path, so an associated function
/// `HelloController::hello` is owned by `HelloController` and a free
/// function is owned by its module.
///
/// Equality goes by the handler's [`TypeId`] when it has one, so two
/// closures of the same function, or `list::<A>` and `list::<B>`, are
/// different handlers even though they render the same. Values of one
/// closure expression share a type and therefore an identity.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HandlerId {
    owner: String,
    method: String,
    type_id: Option<TypeId>,
}

impl HandlerId {
    /// An identity known only by name, for hooks invoked outside a router.
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self { owner: owner.into(), method: method.into(), type_id: None }
    }

    /// Identity of the handler type `H`.
    ///
    /// Function items and closures each have their own type, so this is
    /// unique per handler and needs no instance.
    pub fn of<H: ?Sized + 'static>() -> Self {
        Self {
            type_id: Some(TypeId::of::<H>()),
            ..Self::from_type_path(std::any::type_name::<H>())
        }
    }

    fn from_type_path(path: &str) -> Self {
        // Generic arguments may contain `::` themselves; split before them.
        let end = path.find('<').unwrap_or(path.len());
        match path[..end].rfind("::") {
            Some(at) => Self::new(&path[..at], &path[at + 2..]),
            None => Self::new("", path),
        }
    }

    pub fn owner(&self) -> &str { &self.owner }
    pub fn method(&self) -> &str { &self.method }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.owner.is_empty() {
            f.write_str(&self.method)
        } else {
            write!(f, "{}.{}", self.owner, self.method)
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What one handler invocation produced.
pub type Outcome = Result<Response, Failure>;

/// Conversion of a handler's return value into an [`Outcome`].
///
/// Everything that implements [`IntoResponse`] is a normal return. A
/// `Result<T, E>` is a normal return on `Ok` and a [`Failure`] carrying the
/// type name of `E` on `Err`. The name is the declared type, not the
/// concrete type behind it: use an error enum rather than
/// `Box<dyn Error>`, which does not implement `Error` and is rejected.
///
/// ```rust,no_run
/// # use oplog::Request;
/// async fn divide(req: Request) -> Result<String, std::num::ParseIntError> {
///     let a: i64 = req.params().first("a").unwrap_or("x").parse()?;
///     Ok(format!("{a}"))
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl<T: IntoResponse> IntoOutcome for T {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoResponse,
    E: std::error::Error + 'static,
{
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response)
            .map_err(|e| Failure::from_error(&e))
    }
}

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn`
/// shaped like:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// async fn name(req: Request) -> Result<impl IntoResponse, impl Error>
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;

    /// Identity used by interceptors and operation-log registration.
    fn id(&self) -> HandlerId {
        HandlerId::of::<Self>()
    }
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
