//! Authenticity Scorer: a heuristic for how much of the certificate the model read back.
//!
//! Pure and deterministic. The score starts at 0.6 and gains 0.1 per extracted field
//! (title, issuer, issue date, credential id), capped at 1.0. Validation discrepancies
//! are informational only and do not affect the score.

use serde::{Deserialize, Serialize};

use crate::analysis::certificate::AnalysisResult;

const BASE_TENTHS: u32 = 6;
const MAX_TENTHS: u32 = 10;
const HIGH_ABOVE: f64 = 0.8;
const MEDIUM_ABOVE: f64 = 0.5;
const RECOMMEND_BELOW: f64 = 0.8;

pub const FLAG_MISSING_TITLE: &str = "missing_title";
pub const FLAG_MISSING_ISSUER: &str = "missing_issuer";
pub const FLAG_MISSING_CREDENTIAL_ID: &str = "missing_credential_id";
pub const RECOMMEND_MORE_DETAILS: &str =
    "Consider adding more certificate details to improve authenticity score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    fn from_score(score: f64) -> Self {
        if score > HIGH_ABOVE {
            ConfidenceLevel::High
        } else if score > MEDIUM_ABOVE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityAssessment {
    pub score: f64,
    pub confidence_level: ConfidenceLevel,
    pub flags: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AuthenticityAssessment {
    /// Scores strictly below `threshold` are rejected.
    pub fn passes(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

pub fn validate_authenticity(analysis: &AnalysisResult) -> AuthenticityAssessment {
    let info = &analysis.extracted_info;

    // Counted in tenths so the thresholds compare against exact decimals.
    let present = [
        info.title.is_some(),
        info.issuer.is_some(),
        info.issue_date.is_some(),
        info.credential_id.is_some(),
    ]
    .into_iter()
    .filter(|&p| p)
    .count() as u32;
    let score = f64::from((BASE_TENTHS + present).min(MAX_TENTHS)) / 10.0;

    // Issue date is deliberately not flagged.
    let mut flags = Vec::new();
    if info.title.is_none() {
        flags.push(FLAG_MISSING_TITLE.to_string());
    }
    if info.issuer.is_none() {
        flags.push(FLAG_MISSING_ISSUER.to_string());
    }
    if info.credential_id.is_none() {
        flags.push(FLAG_MISSING_CREDENTIAL_ID.to_string());
    }

    let mut recommendations = Vec::new();
    if score < RECOMMEND_BELOW {
        recommendations.push(RECOMMEND_MORE_DETAILS.to_string());
    }

    AuthenticityAssessment {
        score,
        confidence_level: ConfidenceLevel::from_score(score),
        flags,
        recommendations,
    }
}
