//! Language-model fallback for companies the rule table cannot place.

use crate::models::{is_missing, UNKNOWN};
use crate::retry::RetryPolicy;
use providers::{CompletionOptions, LlmProvider, ProviderError};
use std::sync::Arc;
use tracing::{debug, warn};

pub fn build_prompt(job_title: &str, company: &str) -> String {
    format!(
        r#"Based on the company name "{company}" and Job Title "{job_title}", determine what this company does.

If the company is well-known and you can confidently identify their main product(s) or service(s), respond with a short, specific phrase (2-5 words) describing it.
Examples: "Wholesale Chicken Supply", "Construction Materials", "Retail Electronics & Furniture", "IT Cloud Services".

If the company is less known or there is limited information, classify it into a broad business category or industry sector only.
Respond with a short, specific category name (2-4 words max). Never use more than 6 words.
Examples: "Technology & Software", "Healthcare Services", "Financial Services", "Retail & E-commerce", "Manufacturing", "Consulting", "Education", "Construction", "Transportation", "Media & Entertainment", "Agriculture & Food".

If you are not sure, respond with "Unknown"."#
    )
}

/// Asks an LLM for a company's business nature. Never fails: every error path yields `"Unknown"`.
#[derive(Clone)]
pub struct RemoteClassifier {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    retry: RetryPolicy,
}

impl RemoteClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                max_tokens: 50,
                temperature: 0.1,
            },
            retry: RetryPolicy::rate_limit(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Policy applied to rate-limited responses only; other failures are never retried.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn classify(&self, job_title: &str, company: &str) -> String {
        if is_missing(company) {
            return UNKNOWN.to_string();
        }

        let prompt = build_prompt(job_title, company);
        let result = self
            .retry
            .run(
                || self.provider.complete(&prompt, &self.options),
                |e: &ProviderError| e.is_rate_limited(),
            )
            .await;

        match result {
            Ok(text) => {
                let label = text.trim();
                if label.is_empty() {
                    debug!(company, "empty completion, using fallback label");
                    UNKNOWN.to_string()
                } else {
                    label.to_string()
                }
            }
            Err(e) => {
                warn!(company, error = %e, "remote categorization failed");
                UNKNOWN.to_string()
            }
        }
    }
}
