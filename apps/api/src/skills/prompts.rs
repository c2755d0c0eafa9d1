// Skill extraction prompt templates.

pub const SKILL_EXTRACTION_PROMPT: &str = r#"Analyze this certification information and extract a list of relevant skills.
Consider both explicit skills mentioned and implicit skills that would be gained from this certification.

Certificate Information:
Title: {title}
Issuer: {issuer}
Description: {description}
Skills suggested by document analysis: {suggested_skills}

Return the response as a JSON object with the following structure:
{
  "skills": [
    {
      "name": "skill name",
      "level": "beginner" | "intermediate" | "advanced",
      "category": "category name",
      "confidence": 0.0 to 1.0
    }
  ]
}

Only include skills with confidence > {confidence_cutoff}."#;
