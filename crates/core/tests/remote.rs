use jobsheet_core::categorize::{CompanyCategorizer, LabelSource, RunContext};
use jobsheet_core::classifier::RemoteClassifier;
use jobsheet_core::models::JobRecord;
use jobsheet_core::resume::ResumeParser;
use jobsheet_core::retry::RetryPolicy;
use jobsheet_core::rules::RuleSet;
use providers::{CompletionOptions, LlmProvider, ProviderError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays queued responses, then answers with `fallback`.
struct Scripted {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            fallback: "Technology & Software".into(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmProvider for Scripted {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

fn classifier(provider: Arc<Scripted>) -> RemoteClassifier {
    RemoteClassifier::new(provider).with_retry(RetryPolicy::new(2, Duration::ZERO))
}

fn categorizer(provider: Arc<Scripted>) -> CompanyCategorizer {
    CompanyCategorizer::new(RuleSet::builtin(), Some(classifier(provider)))
        .with_courtesy_delay(Duration::ZERO)
}

fn labels(jobs: &[JobRecord]) -> Vec<&str> {
    jobs.iter()
        .map(|j| j.business_nature.as_deref().unwrap_or(""))
        .collect()
}

#[tokio::test]
async fn equivalent_names_share_one_remote_call() {
    let provider = Scripted::new(vec![Ok("  Widget Manufacturing \n".into())]);
    let mut jobs = vec![
        JobRecord::new("Fitter", "Acme Ltd"),
        JobRecord::new("Welder", "ACME LIMITED"),
    ];
    let mut ctx = RunContext::new();
    let stats = categorizer(provider.clone())
        .categorize(&mut jobs, &mut ctx)
        .await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(labels(&jobs), ["Widget Manufacturing", "Widget Manufacturing"]);
    assert_eq!(stats.remote_calls, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn rule_matches_never_reach_the_provider() {
    let provider = Scripted::new(vec![]);
    let mut jobs = vec![
        JobRecord::new("Nurse", "Queensland Health"),
        JobRecord::new("Teller", "Westpac Banking"),
        JobRecord::new("Analyst", "N/A"),
    ];
    let mut ctx = RunContext::new();
    categorizer(provider.clone())
        .categorize(&mut jobs, &mut ctx)
        .await;

    assert_eq!(provider.calls(), 0);
    assert_eq!(
        labels(&jobs),
        ["Healthcare Services", "Financial Services", "Unknown"]
    );
}

#[tokio::test]
async fn rate_limit_is_retried_once() {
    let provider = Scripted::new(vec![
        Err(ProviderError::RateLimited),
        Ok("Logistics".into()),
    ]);
    let label = classifier(provider.clone()).classify("Driver", "Zylo").await;
    assert_eq!(label, "Logistics");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn second_rate_limit_gives_up() {
    let provider = Scripted::new(vec![
        Err(ProviderError::RateLimited),
        Err(ProviderError::RateLimited),
        Ok("never used".into()),
    ]);
    let label = classifier(provider.clone()).classify("Driver", "Zylo").await;
    assert_eq!(label, "Unknown");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let provider = Scripted::new(vec![Err(ProviderError::Status {
        status: 500,
        body: "boom".into(),
    })]);
    let label = classifier(provider.clone()).classify("Driver", "Zylo").await;
    assert_eq!(label, "Unknown");
    assert_eq!(provider.calls(), 1);

    let provider = Scripted::new(vec![Err(ProviderError::RequestFailed("timeout".into()))]);
    let label = classifier(provider.clone()).classify("Driver", "Zylo").await;
    assert_eq!(label, "Unknown");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn blank_completion_is_unknown() {
    let provider = Scripted::new(vec![Ok("   \n".into())]);
    let label = classifier(provider.clone()).classify("Driver", "Zylo").await;
    assert_eq!(label, "Unknown");
}

#[tokio::test]
async fn prompt_carries_title_and_raw_company() {
    let provider = Scripted::new(vec![]);
    classifier(provider.clone())
        .classify("Barista", "Blue Bottle Pty Ltd")
        .await;
    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("\"Blue Bottle Pty Ltd\""));
    assert!(prompts[0].contains("\"Barista\""));
}

#[tokio::test]
async fn failed_remote_label_is_cached() {
    let provider = Scripted::new(vec![Err(ProviderError::Status {
        status: 401,
        body: "unauthorized".into(),
    })]);
    let mut jobs = vec![
        JobRecord::new("Dev", "Zylo Pty Ltd"),
        JobRecord::new("Dev", "Zylo"),
    ];
    let mut ctx = RunContext::new();
    categorizer(provider.clone())
        .categorize(&mut jobs, &mut ctx)
        .await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(labels(&jobs), ["Unknown", "Unknown"]);
}

#[tokio::test]
async fn cancellation_stops_remote_calls() {
    let provider = Scripted::new(vec![]);
    let categorizer = categorizer(provider.clone());
    let mut ctx = RunContext::new();

    let first = categorizer.categorize_one("Dev", "Zylo", &mut ctx).await;
    assert_eq!(first.source, LabelSource::Remote);

    ctx.cancel_handle().store(true, Ordering::Relaxed);
    let mut jobs = vec![
        JobRecord::new("Dev", "Zylo"),
        JobRecord::new("Dev", "Quorra"),
        JobRecord::new("Dev", "Sydney Hospital"),
    ];
    categorizer.categorize(&mut jobs, &mut ctx).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(
        labels(&jobs),
        ["Technology & Software", "Unknown", "Healthcare Services"]
    );
    assert!(ctx.cache().get("quorra").is_none());
}

#[tokio::test]
async fn courtesy_delay_spaces_remote_calls() {
    let provider = Scripted::new(vec![]);
    let categorizer = CompanyCategorizer::new(RuleSet::builtin(), Some(classifier(provider.clone())))
        .with_courtesy_delay(Duration::from_millis(40));
    let mut jobs = vec![
        JobRecord::new("Dev", "Zylo"),
        JobRecord::new("Dev", "Quorra"),
        JobRecord::new("Dev", "Vantor"),
    ];
    let mut ctx = RunContext::new();
    let started = std::time::Instant::now();
    categorizer.categorize(&mut jobs, &mut ctx).await;
    assert_eq!(provider.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn resume_parser_retries_any_error() {
    let provider = Scripted::new(vec![
        Err(ProviderError::RequestFailed("reset".into())),
        Err(ProviderError::RateLimited),
        Ok(r#"{"first name": "Jane", "last name": "Doe", "email": "jane@example.com"}"#.into()),
    ]);
    let parser = ResumeParser::new(provider.clone()).with_retry(RetryPolicy::new(3, Duration::ZERO));
    let rec = parser.parse("Jane Doe\njane@example.com").await;
    assert_eq!(provider.calls(), 3);
    assert_eq!(rec.first_name, "Jane");
    assert_eq!(rec.email, "jane@example.com");
    assert_eq!(rec.mobile, "");
}

#[tokio::test]
async fn resume_parser_gives_empty_record_on_failure() {
    let provider = Scripted::new(vec![
        Err(ProviderError::RateLimited),
        Err(ProviderError::RateLimited),
    ]);
    let parser = ResumeParser::new(provider.clone()).with_retry(RetryPolicy::new(2, Duration::ZERO));
    assert!(parser.parse("some resume").await.is_empty());
    assert_eq!(provider.calls(), 2);

    let provider = Scripted::new(vec![Ok("no json here".into())]);
    let parser = ResumeParser::new(provider.clone());
    assert!(parser.parse("some resume").await.is_empty());

    let provider = Scripted::new(vec![]);
    let parser = ResumeParser::new(provider.clone());
    assert!(parser.parse("   ").await.is_empty());
    assert_eq!(provider.calls(), 0);
}
