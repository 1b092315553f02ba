//! Error taxonomy for the variable treatment pipeline.
//!
//! Structural contract violations (bad splits, missing schema columns,
//! degenerate outcomes) surface as typed, recoverable errors. Internal
//! arithmetic failures (overflow in impact computation) are absorbed,
//! clamped and logged, and never reach the caller.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The error type returned by fit/transform operations.
#[derive(Error, Debug)]
pub enum VartreatError {
    /// A fold assignment violated disjointness or coverage of the rows.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Every candidate column was suppressed; nothing survived to fit.
    #[error("no variables survived filtering: {0}")]
    EmptyVariableList(String),

    /// `transform` was called on a frame missing a required origin column.
    #[error("schema mismatch: column '{0}' required by the plan is absent from the input frame")]
    SchemaMismatch(String),

    /// The outcome column is constant, or `pos_value` is absent from it.
    #[error("degenerate outcome: {0}")]
    DegenerateOutcome(String),

    /// A recognized parameter combination is not supported.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A serialized plan named an encoder kind this build does not recognize.
    #[error("unsupported encoder kind in serialized plan: '{0}'")]
    UnsupportedEncoderVersion(String),

    /// Column was not found in the frame.
    #[error("column '{0}' not found in frame")]
    ColumnNotFound(String),

    /// JSON (de)serialization error for a persisted plan.
    #[error("plan serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with added context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VartreatError>,
    },
}

impl VartreatError {
    /// Add context to an error, preserving the original as the source.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VartreatError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable string tag for callers that want to match on error kind
    /// without depending on the `Display` message.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSplit(_) => "INVALID_SPLIT",
            Self::EmptyVariableList(_) => "EMPTY_VARIABLE_LIST",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::DegenerateOutcome(_) => "DEGENERATE_OUTCOME",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::UnsupportedEncoderVersion(_) => "UNSUPPORTED_ENCODER_VERSION",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

/// Serializes as `{code, message}`, so callers that persist or relay
/// errors (e.g. across a plan-fitting RPC boundary) get a stable shape.
impl Serialize for VartreatError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("VartreatError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VartreatError>;

/// Extension trait for adding context to a `Result`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
