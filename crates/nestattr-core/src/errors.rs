use nestattr_core_types::RequestId;
use thiserror::Error;

/// Result type alias using ReconcileError
pub type Result<T> = std::result::Result<T, ReconcileError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on when
/// turning a failed nested write into a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Payload
    InvalidInput,
    NotFound,
    TooManyRecords,

    // Setup
    Configuration,

    // Application
    StaleHandle,

    // Integration
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::TooManyRecords => "ERR_TOO_MANY_RECORDS",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::StaleHandle => "ERR_STALE_HANDLE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }

    /// Whether the failure should surface to the end user as a validation
    /// failure of the overall write, rather than as an integration bug.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, ExErrorKind::NotFound | ExErrorKind::TooManyRecords)
    }
}

/// Canonical structured error type
///
/// Structured representation with classification fields for programmatic
/// handling and context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    association: Option<String>,
    record_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            association: None,
            record_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add association name context
    pub fn with_association(mut self, name: impl Into<String>) -> Self {
        self.association = Some(name.into());
        self
    }

    /// Add record ID context
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn association(&self) -> Option<&str> {
        self.association.as_deref()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(association) = &self.association {
            write!(f, " (association: {})", association)?;
        }
        if let Some(record_id) = &self.record_id {
            write!(f, " (record_id: {})", record_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for nested attribute reconciliation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// A payload item names an id that is not among the current children
    #[error("Couldn't find {association} record with ID={id}")]
    RecordNotFound { association: String, id: String },

    /// The payload collection is larger than the configured limit
    #[error("Maximum {limit} records are allowed for {association}. Got {actual} records instead.")]
    TooManyRecords {
        association: String,
        limit: usize,
        actual: usize,
    },

    /// The payload is neither list- nor mapping-shaped
    #[error("Invalid payload for {association}: {reason}")]
    InvalidInput { association: String, reason: String },

    /// Unknown option key, unknown association or mistyped option value
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// A directive references a handle the association no longer holds
    #[error("Stale handle at position {position} (expected id {id:?})")]
    StaleHandle {
        position: usize,
        id: Option<String>,
    },

    /// JSON encoding/decoding failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl ReconcileError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        ReconcileError::Configuration {
            reason: reason.into(),
        }
    }

    /// The canonical kind this error maps to
    pub fn kind(&self) -> ExErrorKind {
        match self {
            ReconcileError::RecordNotFound { .. } => ExErrorKind::NotFound,
            ReconcileError::TooManyRecords { .. } => ExErrorKind::TooManyRecords,
            ReconcileError::InvalidInput { .. } => ExErrorKind::InvalidInput,
            ReconcileError::Configuration { .. } => ExErrorKind::Configuration,
            ReconcileError::StaleHandle { .. } => ExErrorKind::StaleHandle,
            ReconcileError::Serialization { .. } => ExErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from ReconcileError to the canonical ExError
impl From<ReconcileError> for ExError {
    fn from(err: ReconcileError) -> Self {
        let base = ExError::new(err.kind());
        match err {
            ReconcileError::RecordNotFound { association, id } => base
                .with_association(association)
                .with_record_id(id)
                .with_message("Record not found in association"),

            ReconcileError::TooManyRecords {
                association,
                limit,
                actual,
            } => base.with_association(association).with_message(format!(
                "Maximum {} records are allowed, got {}",
                limit, actual
            )),

            ReconcileError::InvalidInput {
                association,
                reason,
            } => base.with_association(association).with_message(reason),

            ReconcileError::Configuration { reason } => base.with_message(reason),

            ReconcileError::StaleHandle { position, id } => {
                let base = base.with_message(format!("No live handle at position {}", position));
                match id {
                    Some(id) => base.with_record_id(id),
                    None => base,
                }
            }

            ReconcileError::Serialization { message } => base.with_message(message),
        }
    }
}
