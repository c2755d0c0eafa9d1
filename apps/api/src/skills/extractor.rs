//! Skill extraction: a best-effort model pass proposing skills for a certification.
//!
//! `try_extract_skills` reports failures; `extract_skills_from_certificate` is the
//! infallible entry point used by the submission pipeline and converts any failure into
//! an empty list, so skill suggestion can never block certificate creation.

use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::certificate::AnalysisResult;
use crate::analysis::structured::{get_structured_response, ExtractionError};
use crate::llm_client::{CompletionSource, PromptPart};
use crate::skills::prompts::SKILL_EXTRACTION_PROMPT;
use crate::skills::{ProposedSkill, SkillLevel};

/// Certification facts the extraction prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct CertData<'a> {
    pub title: &'a str,
    pub issuer: &'a str,
    pub description: Option<&'a str>,
    pub ai_analysis: Option<&'a AnalysisResult>,
}

/// Never fails: any error yields an empty list.
pub async fn extract_skills_from_certificate(
    source: &dyn CompletionSource,
    cert: CertData<'_>,
    confidence_cutoff: f64,
    max_attempts: u32,
) -> Vec<ProposedSkill> {
    match try_extract_skills(source, cert, confidence_cutoff, max_attempts).await {
        Ok(skills) => {
            info!(
                "Extracted {} skill(s) for certification '{}'",
                skills.len(),
                cert.title
            );
            skills
        }
        Err(e) => {
            warn!("Skill extraction failed, continuing without suggestions: {e}");
            Vec::new()
        }
    }
}

pub async fn try_extract_skills(
    source: &dyn CompletionSource,
    cert: CertData<'_>,
    confidence_cutoff: f64,
    max_attempts: u32,
) -> Result<Vec<ProposedSkill>, ExtractionError> {
    let prompt = build_prompt(cert, confidence_cutoff);
    let raw = get_structured_response(source, &[PromptPart::text(prompt)], max_attempts).await?;
    Ok(parse_proposed_skills(&raw, confidence_cutoff))
}

fn build_prompt(cert: CertData<'_>, confidence_cutoff: f64) -> String {
    let suggested = cert
        .ai_analysis
        .map(|a| a.suggested_skills.join(", "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "None".to_string());

    SKILL_EXTRACTION_PROMPT
        .replace("{title}", cert.title)
        .replace("{issuer}", cert.issuer)
        .replace("{description}", cert.description.unwrap_or("Not provided"))
        .replace("{suggested_skills}", &suggested)
        .replace("{confidence_cutoff}", &confidence_cutoff.to_string())
}

/// Reads `{"skills": [...]}`, keeping well-formed entries whose confidence exceeds the cutoff.
fn parse_proposed_skills(raw: &Value, confidence_cutoff: f64) -> Vec<ProposedSkill> {
    let Some(items) = raw.get("skills").and_then(Value::as_array) else {
        warn!("Skill extraction response has no 'skills' array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let confidence = item.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
            if confidence <= confidence_cutoff {
                return None;
            }
            Some(ProposedSkill {
                name: name.to_string(),
                level: Some(SkillLevel::parse_lenient(
                    item.get("level").and_then(Value::as_str),
                )),
                category: item
                    .get("category")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from),
                confidence: confidence.clamp(0.0, 1.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;
    use serde_json::json;

    fn cert() -> CertData<'static> {
        CertData {
            title: "AWS Certified Developer",
            issuer: "Amazon",
            description: None,
            ai_analysis: None,
        }
    }

    #[test]
    fn test_low_confidence_and_nameless_entries_are_dropped() {
        let raw = json!({"skills": [
            {"name": "AWS Lambda", "level": "intermediate", "category": "Cloud", "confidence": 0.9},
            {"name": "Networking", "level": "beginner", "category": "Cloud", "confidence": 0.7},
            {"name": "  ", "confidence": 0.95},
            {"level": "advanced", "confidence": 0.99},
            {"name": "DynamoDB", "category": "Databases"}
        ]});
        let skills = parse_proposed_skills(&raw, 0.7);
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "AWS Lambda");
        assert_eq!(skills[0].level, Some(SkillLevel::Intermediate));
        assert_eq!(skills[0].category.as_deref(), Some("Cloud"));
    }

    #[test]
    fn test_cutoff_is_a_parameter() {
        let raw = json!({"skills": [{"name": "Networking", "confidence": 0.75}]});
        assert_eq!(parse_proposed_skills(&raw, 0.7).len(), 1);
        assert!(parse_proposed_skills(&raw, 0.8).is_empty());
    }

    #[test]
    fn test_prompt_includes_analysis_suggestions() {
        let analysis: AnalysisResult = serde_json::from_value(json!({
            "extracted_info": {},
            "validation": {},
            "suggested_skills": ["AWS", "Serverless"],
        }))
        .unwrap();
        let prompt = build_prompt(
            CertData {
                ai_analysis: Some(&analysis),
                description: Some("Builds serverless apps"),
                ..cert()
            },
            0.7,
        );
        assert!(prompt.contains("Title: AWS Certified Developer"));
        assert!(prompt.contains("Description: Builds serverless apps"));
        assert!(prompt.contains("AWS, Serverless"));
        assert!(prompt.contains("confidence > 0.7"));
    }

    #[tokio::test]
    async fn test_extracts_from_fenced_response() {
        let source = ScriptedCompletion::always(
            "```json\n{\"skills\": [{\"name\": \"Python\", \"level\": \"advanced\", \"category\": \"Programming\", \"confidence\": 0.92}]}\n```",
        );
        let skills = extract_skills_from_certificate(&source, cert(), 0.7, 2).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "Python");

        let prompts = source.prompts();
        assert!(matches!(prompts[0].as_slice(), [PromptPart::Text(text)] if text.contains("confidence > 0.7")));
    }

    #[tokio::test]
    async fn test_model_failure_yields_empty_list() {
        let source = ScriptedCompletion::failing();
        let skills = extract_skills_from_certificate(&source, cert(), 0.7, 2).await;
        assert!(skills.is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_output_yields_empty_list() {
        let source = ScriptedCompletion::always("Skills: Python, AWS");
        assert!(extract_skills_from_certificate(&source, cert(), 0.7, 2)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_try_extract_reports_failure() {
        let source = ScriptedCompletion::always("no json");
        assert!(try_extract_skills(&source, cert(), 0.7, 1).await.is_err());
    }
}
