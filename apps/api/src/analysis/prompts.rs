// Certificate analysis prompt templates.

pub const CERTIFICATE_ANALYSIS_PROMPT: &str = r#"You are a certificate analyzer. Analyze the provided certificate and return ONLY a JSON object with the specified structure. Do not include any additional text or explanations.

IMPORTANT: Your response must be a valid JSON object with exactly this structure:
{
  "extracted_info": {
    "title": "exact certificate title",
    "issuer": "issuing organization name",
    "issue_date": "YYYY-MM-DD",
    "credential_id": "ID if present, or null"
  },
  "validation": {
    "matches": ["fields that match the user input"],
    "discrepancies": ["any differences found"]
  },
  "suggested_skills": ["skill1", "skill2", "skill3"],
  "category": "most appropriate category"
}

RULES:
1. Return ONLY the JSON object
2. Include ALL required fields
3. Use null for values you cannot read from the certificate
4. Format dates as YYYY-MM-DD
5. Arrays are never null (use an empty array if none)

User provided information for comparison:
{user_metadata}"#;

/// Appended for PDFs, whose text is inlined into the prompt.
pub const CERTIFICATE_TEXT_SECTION: &str = "\n\nAnalyze this certificate text:\n{certificate_text}";
