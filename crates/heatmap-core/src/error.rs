//! Pipeline error type and its propagation classification.
//!
//! Mirrors the shape of a typical service-layer `AppError`: one thiserror
//! variant per named error kind, each carrying the context needed to explain
//! itself on the Run row, plus a classification method stage boundaries use
//! to decide whether to keep going, downgrade the run, or fail it outright.

use thiserror::Error;

/// How a stage boundary should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Logged, counted, never fails the run.
    Recoverable,
    /// Fails the run (downgrades it to FAILED if raised before aggregation
    /// produced any rows, otherwise downgrades a SUCCESS-track run to
    /// PARTIAL once persistence has started).
    FailsRun,
    /// An invariant was violated. The run is marked FAILED unconditionally.
    Fatal,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source '{source_tag}' fetch failed: {message}")]
    SourceFetch { source_tag: String, message: String },

    #[error("payload parse failed for item {item_id}: {message}")]
    PayloadParse { item_id: String, message: String },

    #[error("document rejected by normalization gate: {reason}")]
    NormalizationReject { reason: String },

    #[error("weekly baseline sub-call failed for entity {entity_id}: {message}")]
    ExternalBaseline { entity_id: String, message: String },

    #[error("optional model unavailable: {component}")]
    ModelUnavailable { component: String },

    #[error("persistence failure writing {table}: {message}")]
    Persistence { table: String, message: String },

    #[error("invariant violated: {0}")]
    FatalInternal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub fn classification(&self) -> ErrorClass {
        match self {
            Self::SourceFetch { .. }
            | Self::PayloadParse { .. }
            | Self::NormalizationReject { .. }
            | Self::ExternalBaseline { .. }
            | Self::ModelUnavailable { .. } => ErrorClass::Recoverable,

            Self::Persistence { .. } | Self::Database(_) | Self::Io(_) => ErrorClass::FailsRun,

            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ErrorClass::Fatal,

            Self::FatalInternal(_) => ErrorClass::Fatal,
        }
    }

    /// Stable short code for the Run row's notes / structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::SourceFetch { .. } => "SOURCE_FETCH_ERROR",
            Self::PayloadParse { .. } => "PAYLOAD_PARSE_ERROR",
            Self::NormalizationReject { .. } => "NORMALIZATION_REJECT",
            Self::ExternalBaseline { .. } => "EXTERNAL_BASELINE_ERROR",
            Self::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::FatalInternal(_) => "FATAL_INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
