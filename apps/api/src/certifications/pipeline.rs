//! Certificate submission pipeline.
//!
//! Uploaded → Preprocessed → Analyzed → {AuthenticityPassed | AuthenticityRejected}
//! → SkillsExtracted → SkillsReconciled → Persisted.
//!
//! Analysis failures abort the submission. Everything on the skill side is best-effort:
//! an extraction or reconciliation failure leaves the certification with fewer skills,
//! never without a certification. A rejected authenticity score is an ordinary outcome.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::authenticity::{validate_authenticity, AuthenticityAssessment};
use crate::analysis::certificate::{analyze_certificate, AnalysisResult, UserSuppliedMetadata};
use crate::analysis::preprocess::RawDocument;
use crate::analysis::structured::DEFAULT_MAX_ATTEMPTS;
use crate::analysis::AnalysisError;
use crate::certifications::files::{certificate_key, FileStore, FileStoreError};
use crate::certifications::store::CertificationStore;
use crate::db::StoreError;
use crate::llm_client::CompletionSource;
use crate::models::certification::{CertificationRow, NewCertification};
use crate::skills::extractor::{extract_skills_from_certificate, CertData};
use crate::skills::reconcile::reconcile_skills_to_user;
use crate::skills::store::SkillStore;
use crate::skills::{normalize_skill_name, ProposedSkill, SkillRecord};

/// Tunables for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePolicy {
    /// Scores strictly below this are rejected.
    pub authenticity_threshold: f64,
    /// Extracted skills must have a confidence strictly above this.
    pub skill_confidence_cutoff: f64,
    /// Model attempts per structured response.
    pub max_attempts: u32,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            authenticity_threshold: 0.5,
            skill_confidence_cutoff: 0.7,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] FileStoreError),
}

/// The collaborators a submission touches.
#[derive(Clone, Copy)]
pub struct PipelineServices<'a> {
    pub llm: &'a dyn CompletionSource,
    pub skills: &'a dyn SkillStore,
    pub certifications: &'a dyn CertificationStore,
    pub files: &'a dyn FileStore,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessedDocument {
    pub analysis: AnalysisResult,
    pub authenticity: AuthenticityAssessment,
    pub passed: bool,
}

pub struct Submission {
    pub user_id: Uuid,
    pub metadata: UserSuppliedMetadata,
    pub issue_date: NaiveDate,
    pub description: Option<String>,
    pub document: RawDocument,
    /// Skills the user already reviewed. When present they replace the extraction pass.
    pub reviewed_skills: Option<Vec<ProposedSkill>>,
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    Accepted {
        certification: CertificationRow,
        /// Records newly attached to the user by this submission.
        skills: Vec<SkillRecord>,
    },
    Rejected {
        analysis: AnalysisResult,
        authenticity: AuthenticityAssessment,
    },
}

/// Analyzes the document and scores it. Persists nothing.
pub async fn assess(
    llm: &dyn CompletionSource,
    document: &RawDocument,
    metadata: &UserSuppliedMetadata,
    policy: &PipelinePolicy,
) -> Result<AssessedDocument, AnalysisError> {
    let analysis = analyze_certificate(
        llm,
        document.bytes.clone(),
        document.kind.as_str(),
        metadata,
        policy.max_attempts,
    )
    .await?;

    let authenticity = validate_authenticity(&analysis);
    let passed = authenticity.passes(policy.authenticity_threshold);
    info!(
        "Authenticity score {:.1} ({:?}), threshold {}: passed={passed}",
        authenticity.score, authenticity.confidence_level, policy.authenticity_threshold
    );

    Ok(AssessedDocument {
        analysis,
        authenticity,
        passed,
    })
}

/// Proposes skills for a certificate without touching the catalog.
pub async fn propose_skills(
    llm: &dyn CompletionSource,
    metadata: &UserSuppliedMetadata,
    description: Option<&str>,
    analysis: &AnalysisResult,
    policy: &PipelinePolicy,
) -> Vec<ProposedSkill> {
    let cert = CertData {
        title: &metadata.title,
        issuer: &metadata.issuer,
        description,
        ai_analysis: Some(analysis),
    };
    extract_skills_from_certificate(
        llm,
        cert,
        policy.skill_confidence_cutoff,
        policy.max_attempts,
    )
    .await
}

/// Runs a submission through to a persisted certification or an authenticity rejection.
pub async fn submit_certificate(
    services: PipelineServices<'_>,
    submission: Submission,
    policy: &PipelinePolicy,
) -> Result<SubmissionOutcome, SubmissionError> {
    let Submission {
        user_id,
        metadata,
        issue_date,
        description,
        document,
        reviewed_skills,
    } = submission;

    // Fail before any model call.
    if !services.skills.user_exists(user_id).await? {
        return Err(StoreError::UserNotFound(user_id).into());
    }

    let assessed = assess(services.llm, &document, &metadata, policy).await?;
    if !assessed.passed {
        info!(
            "Certification '{}' for user {user_id} rejected on authenticity",
            metadata.title
        );
        return Ok(SubmissionOutcome::Rejected {
            analysis: assessed.analysis,
            authenticity: assessed.authenticity,
        });
    }

    let key = certificate_key(user_id, &document.extension);
    services
        .files
        .put(&key, document.bytes.clone(), &document.mime_type)
        .await?;

    let proposed = match reviewed_skills {
        Some(reviewed) => reviewed,
        None => {
            propose_skills(
                services.llm,
                &metadata,
                description.as_deref(),
                &assessed.analysis,
                policy,
            )
            .await
        }
    };

    let added = match reconcile_skills_to_user(services.skills, user_id, &proposed).await {
        Ok(added) => added,
        Err(e) => {
            warn!("Skill reconciliation failed for user {user_id}, continuing: {e}");
            Vec::new()
        }
    };
    let skill_ids = linked_skill_ids(services.skills, user_id, &proposed, &added).await;

    let new = NewCertification {
        user_id,
        title: metadata.title,
        issuer: metadata.issuer,
        issue_date,
        credential_id: metadata.credential_id,
        description,
        certificate_key: Some(key.clone()),
        ai_analysis: assessed.analysis,
        authenticity: assessed.authenticity,
        skill_ids,
    };

    match services.certifications.create(new).await {
        Ok(certification) => {
            info!(
                "Certification {} created for user {user_id} with {} skill(s)",
                certification.id,
                certification.skill_ids.len()
            );
            Ok(SubmissionOutcome::Accepted {
                certification,
                skills: added,
            })
        }
        Err(e) => {
            if let Err(cleanup) = services.files.delete(&key).await {
                warn!("Could not remove orphaned upload {key}: {cleanup}");
            }
            Err(e.into())
        }
    }
}

/// Every skill the user holds that this submission proposed, including ones held before.
async fn linked_skill_ids(
    store: &dyn SkillStore,
    user_id: Uuid,
    proposed: &[ProposedSkill],
    added: &[SkillRecord],
) -> Vec<Uuid> {
    let names: HashSet<String> = proposed
        .iter()
        .map(|s| normalize_skill_name(&s.name))
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Vec::new();
    }

    match store.skills_for_user(user_id).await {
        Ok(held) => held
            .into_iter()
            .filter(|record| names.contains(&record.name))
            .map(|record| record.id)
            .collect(),
        Err(e) => {
            warn!("Could not read skills for user {user_id}, linking new ones only: {e}");
            added.iter().map(|record| record.id).collect()
        }
    }
}
