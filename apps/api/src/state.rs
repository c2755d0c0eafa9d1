use std::sync::Arc;

use crate::certifications::files::FileStore;
use crate::certifications::pipeline::PipelineServices;
use crate::certifications::store::CertificationStore;
use crate::config::Config;
use crate::llm_client::CompletionSource;
use crate::skills::store::SkillStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub skills: Arc<dyn SkillStore>,
    pub certifications: Arc<dyn CertificationStore>,
    /// S3 in production, in-memory in tests.
    pub files: Arc<dyn FileStore>,
    /// Completion source for analysis and skill extraction. Default: `LlmClient`.
    pub llm: Arc<dyn CompletionSource>,
    pub config: Config,
}

impl AppState {
    pub fn pipeline(&self) -> PipelineServices<'_> {
        PipelineServices {
            llm: self.llm.as_ref(),
            skills: self.skills.as_ref(),
            certifications: self.certifications.as_ref(),
            files: self.files.as_ref(),
        }
    }
}
