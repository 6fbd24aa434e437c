//! LLM-backed extraction of candidate fields from resume text.

use crate::models::CandidateRecord;
use crate::retry::RetryPolicy;
use providers::{CompletionOptions, LlmProvider};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cuts `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn build_prompt(resume_text: &str, max_chars: usize) -> String {
    let resume_text = truncate_chars(resume_text, max_chars);
    format!(
        r#"
You are an expert resume parser. Analyze the following resume text and extract structured information in JSON format.

Resume Text:
{resume_text}

Return ONLY a valid JSON object with the following structure. Most details are on the first page, but some may appear later.
{{
    "first name": "candidate first name, normally in the top few lines of the first page",
    "last name": "candidate last name, normally in the top few lines of the first page",
    "mobile": "phone/mobile number, usually near the name",
    "email": "email address, usually near the phone number",
    "current job title": "current/most recent job title based on the latest date; usually listed first",
    "current company": "current/most recent company name",
    "previous job title": "job title held before the current one, based on the dates",
    "previous company": "company name before the current one"
}}

Determining current vs previous positions:
1. Look for dates in the work experience section
2. The position with the most recent dates (or "present", "current", "now") is the CURRENT position
3. The position immediately before the current one (chronologically) is the PREVIOUS position
4. If only one job is mentioned, put it as current and leave the previous fields empty
5. Pay attention to date formats like "2020-present", "Jan 2023 - Current", "2022-2024"

Rules:
1. Return ONLY valid JSON, no additional text or explanations
2. If information is not found, use an empty string ""
3. Split full names into first name and last name
4. Accept mobile/phone numbers in any format
"#
    )
}

/// Pulls the JSON object out of a completion, tolerating code fences and chatter.
pub fn parse_response(response: &str) -> Option<CandidateRecord> {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => {
            let field = |name: &str| match map.get(name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.trim().to_string(),
                Some(other) => other.to_string().trim().to_string(),
            };
            Some(CandidateRecord {
                first_name: field("first name"),
                last_name: field("last name"),
                mobile: field("mobile"),
                email: field("email"),
                current_job_title: field("current job title"),
                current_company: field("current company"),
                previous_job_title: field("previous job title"),
                previous_company: field("previous company"),
                source_file: String::new(),
            })
        }
        Ok(_) => {
            warn!("resume completion was JSON but not an object");
            None
        }
        Err(e) => {
            warn!(error = %e, raw = %response, "failed to parse resume completion as JSON");
            None
        }
    }
}

#[derive(Clone)]
pub struct ResumeParser {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    retry: RetryPolicy,
    max_chars: usize,
}

impl ResumeParser {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                max_tokens: 200,
                temperature: 0.1,
            },
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
            max_chars: 15_000,
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Policy applied to every provider error.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Extracts candidate fields; every failure yields an empty record.
    pub async fn parse(&self, resume_text: &str) -> CandidateRecord {
        if resume_text.trim().is_empty() {
            return CandidateRecord::default();
        }

        let prompt = build_prompt(resume_text, self.max_chars);
        let response = self
            .retry
            .run(|| self.provider.complete(&prompt, &self.options), |_| true)
            .await;

        match response {
            Ok(text) => {
                debug!(chars = text.len(), "resume completion received");
                parse_response(&text).unwrap_or_default()
            }
            Err(e) => {
                warn!(error = %e, attempts = self.retry.max_attempts, "resume parsing failed");
                CandidateRecord::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn prompt_embeds_truncated_text() {
        let prompt = build_prompt("abcdef", 3);
        assert!(prompt.contains("abc..."));
        assert!(!prompt.contains("abcdef"));
        assert!(prompt.contains(r#""previous company""#));
    }

    #[test]
    fn parses_fenced_json_with_chatter() {
        let raw = "```json\nHere you go: {\"first name\": \" Jane \", \"last name\": \"Doe\", \"mobile\": 400123456, \"email\": null}\n```";
        let rec = parse_response(raw).unwrap();
        assert_eq!(rec.first_name, "Jane");
        assert_eq!(rec.last_name, "Doe");
        assert_eq!(rec.mobile, "400123456");
        assert_eq!(rec.email, "");
        assert_eq!(rec.current_company, "");
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_response("I could not find anything").is_none());
        assert!(parse_response("[1, 2]").is_none());
    }
}
