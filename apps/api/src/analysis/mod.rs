//! Certificate analysis: turns an uploaded document into a checked `AnalysisResult`
//! and scores how much of the certificate the model could read back.
//!
//! Flow: `preprocess` → `certificate` (prompt + `structured` extraction + shape check)
//! → `authenticity` (pure scoring).

pub mod authenticity;
pub mod certificate;
pub mod preprocess;
pub mod prompts;
pub mod structured;

use thiserror::Error;

use crate::analysis::preprocess::PreprocessError;
use crate::analysis::structured::ExtractionError;

/// Everything `analyze_certificate` can fail with.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Caller arguments violate preconditions. No I/O was performed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The document could not be decoded. No model call was made.
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    /// The model never produced parseable JSON.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The model produced JSON that lacks the required top-level fields.
    #[error("AI returned invalid response structure: {0}")]
    InvalidAiResponse(String),
}
