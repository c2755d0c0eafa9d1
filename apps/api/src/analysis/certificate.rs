//! Certificate Analyzer: prompts the model with the user's claims plus the document
//! and checks that the reply has the `AnalysisResult` shape.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::analysis::preprocess::{prepare, DocumentKind, PreparedContent, PreprocessError};
use crate::analysis::prompts::{CERTIFICATE_ANALYSIS_PROMPT, CERTIFICATE_TEXT_SECTION};
use crate::analysis::structured::get_structured_response;
use crate::analysis::AnalysisError;
use crate::llm_client::{CompletionSource, PromptPart};

pub const DEFAULT_CATEGORY: &str = "General";

/// What the uploader claims. Only used for cross-checking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSuppliedMetadata {
    pub title: String,
    pub issuer: String,
    pub issue_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

/// The model's reading of the document. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issuer: Option<String>,
    #[serde(default, alias = "issueDate", deserialize_with = "lenient_string")]
    pub issue_date: Option<String>,
    #[serde(default, alias = "credentialId", deserialize_with = "lenient_string")]
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default, deserialize_with = "string_list")]
    pub matches: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub discrepancies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(alias = "extractedInfo")]
    pub extracted_info: ExtractedInfo,
    pub validation: ValidationResult,
    /// Always present, possibly empty.
    #[serde(alias = "suggestedSkills", deserialize_with = "string_list")]
    pub suggested_skills: Vec<String>,
    #[serde(default = "default_category", deserialize_with = "category_or_default")]
    pub category: String,
}

/// Preprocesses the document, asks the model for an `AnalysisResult` and checks its shape.
pub async fn analyze_certificate(
    source: &dyn CompletionSource,
    file_buffer: Bytes,
    file_kind: &str,
    user_metadata: &UserSuppliedMetadata,
    max_attempts: u32,
) -> Result<AnalysisResult, AnalysisError> {
    if file_buffer.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "No file buffer provided".to_string(),
        ));
    }
    let kind: DocumentKind = file_kind.parse().map_err(AnalysisError::InvalidInput)?;

    info!(
        "Starting certificate analysis: kind={}, size={} bytes",
        kind.as_str(),
        file_buffer.len()
    );

    let content = tokio::task::spawn_blocking(move || prepare(&file_buffer, kind))
        .await
        .map_err(|e| PreprocessError::Task(e.to_string()))??;

    let parts = build_prompt(user_metadata, content)?;
    let raw = get_structured_response(source, &parts, max_attempts).await?;
    let analysis = check_shape(raw)?;

    info!(
        "Certificate analysed: category={}, suggested_skills={}",
        analysis.category,
        analysis.suggested_skills.len()
    );
    Ok(analysis)
}

fn build_prompt(
    metadata: &UserSuppliedMetadata,
    content: PreparedContent,
) -> Result<Vec<PromptPart>, AnalysisError> {
    let metadata_json = serde_json::to_string_pretty(metadata)
        .map_err(|e| AnalysisError::InvalidInput(format!("Unserializable metadata: {e}")))?;
    let prompt = CERTIFICATE_ANALYSIS_PROMPT.replace("{user_metadata}", &metadata_json);

    Ok(match content {
        PreparedContent::Text(text) => {
            let section = CERTIFICATE_TEXT_SECTION.replace("{certificate_text}", &text);
            vec![PromptPart::text(prompt + &section)]
        }
        PreparedContent::InlineMedia(media) => {
            vec![PromptPart::text(prompt), PromptPart::InlineMedia(media)]
        }
    })
}

/// Requires non-null `extracted_info` and `validation` and an array `suggested_skills`,
/// accepting snake_case or camelCase keys.
pub fn check_shape(raw: Value) -> Result<AnalysisResult, AnalysisError> {
    let Some(object) = raw.as_object() else {
        return Err(AnalysisError::InvalidAiResponse(
            "response is not an object".to_string(),
        ));
    };

    let field = |snake: &str, camel: &str| {
        object
            .get(snake)
            .or_else(|| object.get(camel))
            .filter(|v| !v.is_null())
    };

    let mut missing = Vec::new();
    if !field("extracted_info", "extractedInfo").is_some_and(Value::is_object) {
        missing.push("extracted_info");
    }
    if !field("validation", "validation").is_some_and(Value::is_object) {
        missing.push("validation");
    }
    if !field("suggested_skills", "suggestedSkills").is_some_and(Value::is_array) {
        missing.push("suggested_skills");
    }
    if !missing.is_empty() {
        error!("Invalid analysis structure: {raw}");
        return Err(AnalysisError::InvalidAiResponse(format!(
            "missing or malformed: {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(raw).map_err(|e| AnalysisError::InvalidAiResponse(e.to_string()))
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Non-empty strings are kept (trimmed); numbers are stringified; a literal "null" is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn category_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_else(default_category))
}

/// Keeps string items and the `name` of object items; drops everything else.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            Value::Object(mut o) => match o.remove("name") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::structured::ExtractionError;
    use crate::testing::{png_bytes, ScriptedCompletion};
    use serde_json::json;

    const SCENARIO_A: &str = r#"{"extractedInfo":{"title":"AWS Certified","issuer":"Amazon","issue_date":"2024-01-01","credential_id":null},"validation":{"matches":["title"],"discrepancies":[]},"suggested_skills":["AWS","Cloud"],"category":"Cloud"}"#;

    fn metadata() -> UserSuppliedMetadata {
        UserSuppliedMetadata {
            title: "AWS Certified".to_string(),
            issuer: "Amazon".to_string(),
            issue_date: "2024-01-01".to_string(),
            credential_id: None,
        }
    }

    #[test]
    fn test_check_shape_accepts_mixed_case_keys() {
        let analysis = check_shape(serde_json::from_str(SCENARIO_A).unwrap()).unwrap();
        assert_eq!(analysis.extracted_info.title.as_deref(), Some("AWS Certified"));
        assert_eq!(analysis.extracted_info.issue_date.as_deref(), Some("2024-01-01"));
        assert_eq!(analysis.extracted_info.credential_id, None);
        assert_eq!(analysis.validation.matches, vec!["title"]);
        assert_eq!(analysis.suggested_skills, vec!["AWS", "Cloud"]);
        assert_eq!(analysis.category, "Cloud");
    }

    #[test]
    fn test_check_shape_rejects_missing_fields() {
        let err = check_shape(json!({"extracted_info": {}, "validation": null})).unwrap_err();
        let AnalysisError::InvalidAiResponse(msg) = err else {
            panic!("expected InvalidAiResponse");
        };
        assert!(msg.contains("validation"));
        assert!(msg.contains("suggested_skills"));
        assert!(!msg.contains("extracted_info"));
    }

    #[test]
    fn test_check_shape_rejects_non_array_skills() {
        let err = check_shape(json!({
            "extracted_info": {},
            "validation": {},
            "suggested_skills": "AWS"
        }))
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidAiResponse(_)));
    }

    #[test]
    fn test_empty_skills_and_missing_category_are_valid() {
        let analysis = check_shape(json!({
            "extracted_info": {"title": "", "issuer": "null", "credential_id": 12345},
            "validation": {},
            "suggested_skills": []
        }))
        .unwrap();
        assert!(analysis.suggested_skills.is_empty());
        assert_eq!(analysis.category, DEFAULT_CATEGORY);
        assert_eq!(analysis.extracted_info.title, None);
        assert_eq!(analysis.extracted_info.issuer, None);
        assert_eq!(analysis.extracted_info.credential_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_pdf_prompt_inlines_text_and_metadata() {
        let parts = build_prompt(
            &metadata(),
            PreparedContent::Text("Certificate of Completion".to_string()),
        )
        .unwrap();
        assert_eq!(parts.len(), 1);
        let PromptPart::Text(text) = &parts[0] else {
            panic!("expected text part");
        };
        assert!(text.contains("\"issueDate\": \"2024-01-01\""));
        assert!(text.ends_with("Analyze this certificate text:\nCertificate of Completion"));
    }

    #[tokio::test]
    async fn test_image_analysis_sends_text_then_media() {
        let source = ScriptedCompletion::always(SCENARIO_A);
        let analysis = analyze_certificate(
            &source,
            Bytes::from(png_bytes(64, 32)),
            "image",
            &metadata(),
            2,
        )
        .await
        .unwrap();
        assert_eq!(analysis.category, "Cloud");

        let prompts = source.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(matches!(prompts[0][0], PromptPart::Text(_)));
        let PromptPart::InlineMedia(media) = &prompts[0][1] else {
            panic!("expected inline media part");
        };
        assert_eq!(media.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_no_json_fails_with_extraction_error_after_two_attempts() {
        let source = ScriptedCompletion::always("I cannot read this certificate.");
        let err = analyze_certificate(
            &source,
            Bytes::from(png_bytes(16, 16)),
            "image",
            &metadata(),
            2,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Extraction(ExtractionError { attempts: 2, .. })
        ));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_shape_is_not_retried() {
        let source = ScriptedCompletion::always(r#"{"category": "Cloud"}"#);
        let err = analyze_certificate(
            &source,
            Bytes::from(png_bytes(16, 16)),
            "image",
            &metadata(),
            2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidAiResponse(_)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_performs_no_calls() {
        let source = ScriptedCompletion::always(SCENARIO_A);

        let empty = analyze_certificate(&source, Bytes::new(), "image", &metadata(), 2).await;
        assert!(matches!(empty, Err(AnalysisError::InvalidInput(_))));

        let unknown = analyze_certificate(
            &source,
            Bytes::from_static(b"data"),
            "docx",
            &metadata(),
            2,
        )
        .await;
        assert!(matches!(unknown, Err(AnalysisError::InvalidInput(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_image_fails_before_any_call() {
        let source = ScriptedCompletion::always(SCENARIO_A);
        let err = analyze_certificate(
            &source,
            Bytes::from_static(b"not an image"),
            "image",
            &metadata(),
            2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Preprocess(_)));
        assert_eq!(source.calls(), 0);
    }
}
