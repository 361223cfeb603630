//! API error taxonomy.
//!
//! Every recognized failure kind carries a fixed HTTP status. Errors are
//! constructed at the failure site and consumed exactly once by the
//! dispatcher's renderer; no component catches and swallows one in between.

use std::fmt;

/// Result type used across the API layer.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure kinds recognized at the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session token missing, malformed, or not backed by a stored session.
    Authentication,
    /// The HTTP verb is not supported for the endpoint.
    MethodNotAllowed,
    /// A requested action does not exist.
    MethodNotFound,
    /// Required request parameters are missing or degraded to empty.
    MissingParameters,
    /// The database or session store is unreachable or misbehaving.
    DatabaseConnection,
    /// A requested resource does not exist.
    NotFound,
    /// Request data failed a business validation rule.
    Validation,
    /// The request body could not be decoded.
    BadRequest,
    /// The request body exceeds the configured size cap.
    PayloadTooLarge,
}

impl ErrorKind {
    /// Fixed HTTP status for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Authentication => 401,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::MethodNotFound => 404,
            ErrorKind::MissingParameters => 400,
            ErrorKind::DatabaseConnection => 500,
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 422,
            ErrorKind::BadRequest => 400,
            ErrorKind::PayloadTooLarge => 413,
        }
    }

    /// Canonical name surfaced in the `error` field of the JSON body.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "Authentication",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::MissingParameters => "MissingParameters",
            ErrorKind::DatabaseConnection => "DatabaseConnection",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Validation => "Validation",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
        }
    }
}

/// Typed API failure.
///
/// Context pairs are appended to the display message for logs and surfaced
/// separately as `details` in the rendered JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    context: Vec<(String, String)>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Attach a context pair. Preserves insertion order.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, msg)
    }

    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }

    pub fn method_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotFound, msg)
    }

    pub fn missing_parameters(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingParameters, msg)
    }

    pub fn database_connection(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseConnection, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
