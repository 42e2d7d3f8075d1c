use thiserror::Error;

/// Structured error context for configuration and protocol failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.port", "env.CFBALANCE_TIMEOUT_MS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "stats_link")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fieldless discriminant of [`Error`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    EmptyPayload,
    MalformedRecord,
    NoCandidates,
    LatchedFailure,
    Configuration,
}

/// Every failure the selection pipeline can surface.
///
/// Transport and protocol failures (`Connection`, `Timeout`, `EmptyPayload`) are
/// systemic and trip the process fault latch. Data-shape failures
/// (`MalformedRecord`, `NoCandidates`) are recoverable on the next poll.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot reach statistics daemon at {addr}: {message}")]
    Connection { addr: String, message: String },

    #[error("Statistics daemon at {addr} did not finish within {timeout_ms}ms")]
    Timeout { addr: String, timeout_ms: u64 },

    #[error("Statistics daemon returned an empty node list")]
    EmptyPayload,

    #[error("Malformed node record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Node list contains no remote candidates")]
    NoCandidates,

    #[error("Balancer is dead, first failure: {reason}")]
    LatchedFailure { reason: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::EmptyPayload => ErrorKind::EmptyPayload,
            Error::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Error::NoCandidates => ErrorKind::NoCandidates,
            Error::LatchedFailure { .. } => ErrorKind::LatchedFailure,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Whether this failure trips the process fault latch when it first occurs.
    pub fn latches(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::Timeout { .. } | Error::EmptyPayload
        )
    }

    /// Whether the next poll may succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. } | Error::NoCandidates)
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
