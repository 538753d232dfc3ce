//! Descriptive tags attached to handlers for operation logging.

/// What an operation is, for log classification.
///
/// Pure data: three free-text fields, each defaulting to the empty string,
/// never validated. Attach one to a handler with
/// [`OperationLog::annotate`](crate::middleware::OperationLog::annotate).
///
/// ```rust
/// use oplog::OperationMetadata;
///
/// let meta = OperationMetadata::new()
///     .module("users")
///     .operation_type("query")
///     .description("list active users");
/// assert_eq!(meta.module_name(), "users");
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct OperationMetadata {
    module: String,
    operation_type: String,
    description: String,
}

impl OperationMetadata {
    pub fn new() -> Self { Self::default() }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn operation_type(mut self, operation_type: impl Into<String>) -> Self {
        self.operation_type = operation_type.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn module_name(&self) -> &str { &self.module }
    pub fn operation_type_name(&self) -> &str { &self.operation_type }
    pub fn description_text(&self) -> &str { &self.description }
}
