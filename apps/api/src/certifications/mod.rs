//! Certifications: the submission pipeline that ties analysis, authenticity scoring
//! and skill reconciliation together, plus persistence of accepted certificates.

pub mod files;
pub mod handlers;
pub mod pipeline;
pub mod store;
