//! # oplog
//!
//! A minimal HTTP framework whose handlers can be tagged for operation
//! logging.
//!
//! ## The idea
//!
//! Tag a handler with [`OperationMetadata`] (module, operation type,
//! description) and register an [`OperationLog`](middleware::OperationLog)
//! interceptor. Every time the handler returns normally the log gets the
//! metadata, the handler's identity, the request parameters and the returned
//! value. Every time a handler in the configured scope fails, the log gets
//! the failure's type name. The handler itself knows nothing about it.
//!
//! What's in the box:
//!
//! - Radix-tree routing via [`matchit`]
//! - HTTP/1.1 and HTTP/2 via hyper, graceful shutdown on SIGTERM / Ctrl-C
//! - A dispatch boundary with post-success and post-failure hooks
//!   ([`middleware::Interceptor`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use oplog::middleware::{OperationLog, TracingSink};
//! use oplog::{OperationMetadata, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), oplog::Error> {
//!     let oplog = OperationLog::new(TracingSink::new())
//!         .annotate(get_user, OperationMetadata::new().module("users").operation_type("query"));
//!
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .intercept(oplog);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> String {
//!     format!("user {}", req.param("id").unwrap_or("unknown"))
//! }
//! ```

mod error;
mod handler;
mod metadata;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::{Error, Failure, InterceptError};
pub use handler::{Handler, HandlerId, IntoOutcome, Outcome};
pub use metadata::OperationMetadata;
pub use request::{Params, Request};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
