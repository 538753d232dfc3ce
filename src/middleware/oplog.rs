//! Operation logging.
//!
//! [`OperationLog`] keeps a table of registered handlers, each with optional
//! [`OperationMetadata`]. When a registered handler returns normally it logs,
//! in this order:
//!
//! ```text
//! module: hello                     ┐
//! operation type: 测试              │ only with metadata
//! description: 说hello              ┘
//! method: app::HelloController.hello
//! params: {"name":"Amy"}
//! result: "AmyHello Spring Boot!"
//! ```
//!
//! When any handler inside the failure scope fails, registered or not, it
//! logs an error record instead:
//!
//! ```text
//! details elided
//! exception: app::ArithmeticError
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Failure, InterceptError};
use crate::handler::{Handler, HandlerId};
use crate::metadata::OperationMetadata;
use crate::middleware::params::first_values;
use crate::middleware::sink::{Level, LogEntry, LogRecord, LogSink};
use crate::middleware::{Interceptor, Invocation, Returned, Scope};

/// Operation-logging interceptor.
///
/// ```rust,no_run
/// use oplog::middleware::{OperationLog, Scope, TracingSink};
/// use oplog::{OperationMetadata, Request, Router};
///
/// async fn hello(_req: Request) -> &'static str { "hi" }
///
/// let oplog = OperationLog::new(TracingSink::new())
///     .annotate(hello, OperationMetadata::new().module("hello"))
///     .failure_scope(Scope::namespace("app::controller"));
///
/// let app = Router::new().get("/hello", hello).intercept(oplog);
/// ```
pub struct OperationLog {
    sink: Arc<dyn LogSink>,
    operations: HashMap<HandlerId, Option<OperationMetadata>>,
    failure_scope: Scope,
}

impl OperationLog {
    /// An operation log writing to `sink`, with no handlers registered and
    /// every handler in the failure scope.
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            operations: HashMap::new(),
            failure_scope: Scope::All,
        }
    }

    /// Logs successful returns of `handler`, with `metadata`.
    pub fn annotate(self, handler: impl Handler, metadata: OperationMetadata) -> Self {
        self.register(handler.id(), Some(metadata))
    }

    /// Logs successful returns of `handler`, without metadata lines.
    pub fn track(self, handler: impl Handler) -> Self {
        self.register(handler.id(), None)
    }

    /// Registers by identity, for handlers only known by [`HandlerId`].
    pub fn register(mut self, id: HandlerId, metadata: Option<OperationMetadata>) -> Self {
        self.operations.insert(id, metadata);
        self
    }

    /// Limits failure logging to handlers matching `scope`.
    pub fn failure_scope(mut self, scope: Scope) -> Self {
        self.failure_scope = scope;
        self
    }

    pub fn is_registered(&self, id: &HandlerId) -> bool {
        self.operations.contains_key(id)
    }

    pub fn metadata(&self, id: &HandlerId) -> Option<&OperationMetadata> {
        self.operations.get(id).and_then(Option::as_ref)
    }

    /// The success-shape record for a normal return.
    ///
    /// # Errors
    ///
    /// [`InterceptError::MissingContext`] if the invocation carries no
    /// request context; the parameter line cannot be built without it.
    pub fn success_record(
        &self,
        invocation: &Invocation<'_>,
        returned: &Returned<'_>,
    ) -> Result<LogRecord, InterceptError> {
        let handler = invocation.handler();
        let request = invocation
            .request()
            .ok_or_else(|| InterceptError::MissingContext { handler: handler.clone() })?;

        let mut entries = Vec::with_capacity(6);
        if let Some(meta) = self.metadata(handler) {
            entries.push(LogEntry::Module(meta.module_name().to_owned()));
            entries.push(LogEntry::OperationType(meta.operation_type_name().to_owned()));
            entries.push(LogEntry::Description(meta.description_text().to_owned()));
        }
        entries.push(LogEntry::Method(handler.to_string()));
        entries.push(LogEntry::Params(first_values(request.params()).to_json()));
        entries.push(LogEntry::Result(returned.to_json()));

        Ok(LogRecord { level: Level::Info, entries })
    }

    /// The failure-shape record: a summary line and the failure's type name.
    pub fn failure_record(failure: &Failure) -> LogRecord {
        LogRecord {
            level: Level::Error,
            entries: vec![
                LogEntry::Elided,
                LogEntry::Exception(failure.type_name().to_owned()),
            ],
        }
    }
}

impl Interceptor for OperationLog {
    fn intercepts_returning(&self, invocation: &Invocation<'_>) -> bool {
        self.is_registered(invocation.handler())
    }

    fn intercepts_throwing(&self, invocation: &Invocation<'_>) -> bool {
        self.failure_scope.matches(invocation)
    }

    fn after_returning(
        &self,
        invocation: &Invocation<'_>,
        returned: &Returned<'_>,
    ) -> Result<(), InterceptError> {
        let record = self.success_record(invocation, returned)?;
        self.sink.emit(&record);
        Ok(())
    }

    fn after_throwing(
        &self,
        _invocation: &Invocation<'_>,
        failure: &Failure,
    ) -> Result<(), InterceptError> {
        self.sink.emit(&Self::failure_record(failure));
        Ok(())
    }
}
