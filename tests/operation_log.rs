//! End-to-end operation logging through `Router::handle`.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use oplog::middleware::{Interceptor, Invocation, Level, LogEntry, MemorySink, OperationLog, Scope};
use oplog::{Failure, Json, OperationMetadata, Request, Router};

const GREETING: &str = "Hello Spring Boot!";

struct HelloController;

impl HelloController {
    async fn hello(_req: Request) -> &'static str {
        GREETING
    }

    async fn hello2(req: Request) -> String {
        format!("{}{GREETING}", req.params().first("name").unwrap_or_default())
    }

    async fn hello3(req: Request) -> Result<String, ArithmeticError> {
        let a: i64 = req.params().first("a").and_then(|a| a.parse().ok()).unwrap_or(0);
        let i = 1_i64.checked_div(a).ok_or(ArithmeticError)?;
        Ok(format!("{GREETING}{i}"))
    }

    async fn plain(_req: Request) -> Json<Vec<u32>> {
        Json(vec![1, 2])
    }

    async fn panics(req: Request) -> String {
        let a: i64 = req.params().first("a").and_then(|a| a.parse().ok()).unwrap_or(0);
        (1 / a).to_string()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("/ by zero")]
struct ArithmeticError;

fn operation_log(sink: &Arc<MemorySink>) -> OperationLog {
    OperationLog::new(Arc::clone(sink))
        .annotate(
            HelloController::hello,
            OperationMetadata::new().module("hello").operation_type("测试").description("说hello"),
        )
        .annotate(
            HelloController::hello2,
            OperationMetadata::new().module("hello2").operation_type("测试2").description("说hello2"),
        )
        .annotate(HelloController::hello3, OperationMetadata::new())
        .track(HelloController::plain)
        .failure_scope(Scope::namespace(module_path!()))
}

fn app(sink: &Arc<MemorySink>) -> Router {
    Router::new()
        .get("/hello", HelloController::hello)
        .get("/hello2", HelloController::hello2)
        .get("/hello3", HelloController::hello3)
        .get("/plain", HelloController::plain)
        .get("/panics", HelloController::panics)
        .post("/hello2", HelloController::hello2)
        .intercept(operation_log(sink))
}

fn get(uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::get(uri).body(Full::new(Bytes::new())).unwrap()
}

async fn body_text(res: http::Response<Full<Bytes>>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn hello_without_params_logs_metadata_identity_params_and_result() {
    let sink = Arc::new(MemorySink::new());
    let res = app(&sink).handle(get("/hello")).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, GREETING);

    let lines = sink.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "module: hello");
    assert_eq!(lines[1], "operation type: 测试");
    assert_eq!(lines[2], "description: 说hello");
    assert!(lines[3].starts_with("method: "));
    assert!(lines[3].ends_with("HelloController.hello"), "got {}", lines[3]);
    assert_eq!(lines[4], "params: {}");
    assert_eq!(lines[5], r#"result: "Hello Spring Boot!""#);
}

#[tokio::test]
async fn hello2_logs_first_query_value() {
    let sink = Arc::new(MemorySink::new());
    let res = app(&sink).handle(get("/hello2?name=Amy&name=Bob")).await;

    assert_eq!(body_text(res).await, "AmyHello Spring Boot!");

    let lines = sink.lines();
    assert_eq!(lines[0], "module: hello2");
    assert!(lines[3].ends_with("HelloController.hello2"));
    assert_eq!(lines[4], r#"params: {"name":"Amy"}"#);
    assert_eq!(lines[5], r#"result: "AmyHello Spring Boot!""#);
}

#[tokio::test]
async fn form_body_parameters_are_logged() {
    let sink = Arc::new(MemorySink::new());
    let req = http::Request::post("/hello2")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::from_static(b"name=Eve")))
        .unwrap();
    let res = app(&sink).handle(req).await;

    assert_eq!(body_text(res).await, "EveHello Spring Boot!");
    assert_eq!(sink.lines()[4], r#"params: {"name":"Eve"}"#);
}

#[tokio::test]
async fn hello3_division_by_zero_logs_failure_shape_only() {
    let sink = Arc::new(MemorySink::new());
    let res = app(&sink).handle(get("/hello3?a=0")).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(
        records[0].entries,
        [
            LogEntry::Elided,
            LogEntry::Exception(std::any::type_name::<ArithmeticError>().to_owned()),
        ]
    );
}

#[tokio::test]
async fn hello3_success_logs_empty_metadata_lines() {
    let sink = Arc::new(MemorySink::new());
    let res = app(&sink).handle(get("/hello3?a=1")).await;

    assert_eq!(body_text(res).await, "Hello Spring Boot!1");
    let lines = sink.lines();
    assert_eq!(&lines[..3], ["module: ", "operation type: ", "description: "]);
    assert_eq!(lines[4], r#"params: {"a":"1"}"#);
}

#[tokio::test]
async fn tracked_handler_logs_without_metadata_lines() {
    let sink = Arc::new(MemorySink::new());
    app(&sink).handle(get("/plain?x=1")).await;

    let lines = sink.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("HelloController.plain"));
    assert_eq!(lines[1], r#"params: {"x":"1"}"#);
    assert_eq!(lines[2], "result: [1,2]");
}

#[tokio::test]
async fn unregistered_handler_panic_is_in_failure_scope() {
    let sink = Arc::new(MemorySink::new());
    let res = app(&sink).handle(get("/panics?a=0")).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.lines(), ["details elided".to_owned(), format!("exception: {}", Failure::PANIC)]);

    sink.clear();
    let res = app(&sink).handle(get("/panics?a=1")).await;
    assert_eq!(body_text(res).await, "1");
    assert!(sink.lines().is_empty(), "unregistered handlers are not logged on return");
}

#[tokio::test]
async fn failure_outside_scope_is_not_logged() {
    let sink = Arc::new(MemorySink::new());
    let app = Router::new()
        .get("/hello3", HelloController::hello3)
        .intercept(operation_log(&sink).failure_scope(Scope::path_prefix("/admin")));

    let res = app.handle(get("/hello3?a=0")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(sink.records().is_empty());
}

fn greeters() -> (impl oplog::Handler + Copy, impl oplog::Handler + Copy) {
    (|_req: Request| async { "a" }, |_req: Request| async { "b" })
}

#[tokio::test]
async fn metadata_stays_on_the_annotated_closure() {
    let sink = Arc::new(MemorySink::new());
    let (a, b) = greeters();
    let oplog = OperationLog::new(Arc::clone(&sink))
        .annotate(a, OperationMetadata::new().module("only-a"))
        .track(b);
    let app = Router::new().get("/a", a).get("/b", b).intercept(oplog);

    app.handle(get("/b")).await;
    let lines = sink.lines();
    assert_eq!(lines.len(), 3, "got {lines:?}");
    assert!(lines[0].starts_with("method: "));
    assert_eq!(lines[2], r#"result: "b""#);

    sink.clear();
    app.handle(get("/a")).await;
    assert_eq!(sink.lines()[0], "module: only-a");
}

#[tokio::test]
async fn empty_string_return_is_logged_as_empty_json_string() {
    async fn empty(_req: Request) -> String {
        String::new()
    }

    let sink = Arc::new(MemorySink::new());
    let app = Router::new()
        .get("/empty", empty)
        .intercept(OperationLog::new(Arc::clone(&sink)).track(empty));

    app.handle(get("/empty")).await;
    assert_eq!(sink.lines().last().map(String::as_str), Some(r#"result: """#));
}

#[tokio::test]
async fn repeated_invocations_log_identical_records() {
    let sink = Arc::new(MemorySink::new());
    let app = app(&sink);
    app.handle(get("/hello2?name=Amy")).await;
    app.handle(get("/hello2?name=Amy")).await;

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}

#[tokio::test]
async fn concurrent_requests_keep_each_record_intact() {
    let sink = Arc::new(MemorySink::new());
    let app = Arc::new(app(&sink));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let app = Arc::clone(&app);
        tasks.spawn(async move { app.handle(get(&format!("/hello2?name=n{i}"))).await });
    }
    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap().status(), StatusCode::OK);
    }

    let records = sink.records();
    assert_eq!(records.len(), 16);
    for record in records {
        let LogEntry::Params(params) = &record.entries[4] else {
            panic!("unexpected entry {:?}", record.entries[4]);
        };
        let LogEntry::Result(result) = &record.entries[5] else {
            panic!("unexpected entry {:?}", record.entries[5]);
        };
        let name: serde_json::Value = serde_json::from_str(params).unwrap();
        let name = name["name"].as_str().unwrap();
        assert_eq!(result, &format!("\"{name}{GREETING}\""));
    }
}

/// Records which hooks ran, to check the boundary calls exactly one of them.
#[derive(Default)]
struct HookCounter {
    returned: std::sync::atomic::AtomicUsize,
    thrown: std::sync::atomic::AtomicUsize,
}

impl Interceptor for HookCounter {
    fn after_returning(
        &self,
        _invocation: &Invocation<'_>,
        _returned: &oplog::middleware::Returned<'_>,
    ) -> Result<(), oplog::InterceptError> {
        self.returned.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn after_throwing(
        &self,
        invocation: &Invocation<'_>,
        failure: &Failure,
    ) -> Result<(), oplog::InterceptError> {
        assert_eq!(invocation.route(), "/hello3");
        assert!(invocation.request().is_some());
        assert!(failure.type_name().ends_with("ArithmeticError"));
        self.thrown.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn boundary_runs_exactly_one_hook_per_invocation() {
    use std::sync::atomic::Ordering;

    let counter = Arc::new(HookCounter::default());
    let app = Router::new()
        .get("/hello", HelloController::hello)
        .get("/hello3", HelloController::hello3)
        .intercept(Arc::clone(&counter));

    app.handle(get("/hello")).await;
    app.handle(get("/hello3?a=0")).await;
    app.handle(get("/missing")).await;

    assert_eq!(counter.returned.load(Ordering::SeqCst), 1);
    assert_eq!(counter.thrown.load(Ordering::SeqCst), 1);
}
