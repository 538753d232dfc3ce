//! Operation logging on a small controller.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example hello
//!
//! Try:
//!   curl http://localhost:3000/hello
//!   curl 'http://localhost:3000/hello2?name=Amy'
//!   curl 'http://localhost:3000/hello3?a=0'     ← fails, logs the error type
//!
//! `OPLOG_ADDR` overrides the listen address (default `0.0.0.0:3000`).

use oplog::middleware::{OperationLog, Scope, TracingSink};
use oplog::{Error, OperationMetadata, Request, Router, Server};

const GREETING: &str = "Hello Spring Boot!";

struct HelloController;

impl HelloController {
    // GET /hello
    async fn hello(_req: Request) -> &'static str {
        GREETING
    }

    // GET /hello2?name=Amy
    async fn hello2(req: Request) -> String {
        let name = req.params().first("name").unwrap_or_default();
        format!("{name}{GREETING}")
    }

    // GET /hello3?a=0 → ArithmeticError
    async fn hello3(req: Request) -> Result<String, ArithmeticError> {
        let a: i64 = req
            .params()
            .first("a")
            .and_then(|a| a.parse().ok())
            .ok_or(ArithmeticError::BadOperand)?;
        let i = 1_i64.checked_div(a).ok_or(ArithmeticError::DivideByZero)?;
        Ok(format!("{GREETING}{i}"))
    }
}

#[derive(Debug, thiserror::Error)]
enum ArithmeticError {
    #[error("/ by zero")]
    DivideByZero,
    #[error("operand `a` is missing or not an integer")]
    BadOperand,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let oplog = OperationLog::new(TracingSink::new())
        .annotate(
            HelloController::hello,
            OperationMetadata::new().module("hello").operation_type("测试").description("说hello"),
        )
        .annotate(
            HelloController::hello2,
            OperationMetadata::new().module("hello2").operation_type("测试2").description("说hello2"),
        )
        .annotate(HelloController::hello3, OperationMetadata::new())
        .failure_scope(Scope::namespace(module_path!()));

    let app = Router::new()
        .get("/hello",  HelloController::hello)
        .get("/hello2", HelloController::hello2)
        .get("/hello3", HelloController::hello3)
        .intercept(oplog);

    let addr = std::env::var("OPLOG_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    Server::bind(&addr)?.serve(app).await
}
