//! Batch company categorization: normalize → cache → rules → remote fallback.

use crate::cache::CategoryCache;
use crate::classifier::RemoteClassifier;
use crate::models::{is_missing, JobRecord, UNKNOWN};
use crate::normalize::normalize_company_name;
use crate::rules::RuleSet;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Where a record's label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    MissingCompany,
    Cache,
    Rule,
    Remote,
    /// No remote classifier configured.
    Unclassified,
    /// The run was cancelled before a remote call could be made.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Categorization {
    pub key: String,
    pub label: String,
    pub source: LabelSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategorizeStats {
    pub total: usize,
    pub regex_matches: usize,
    pub remote_calls: usize,
    pub cache_hits: usize,
    pub missing_company: usize,
    pub unknown: usize,
}

impl CategorizeStats {
    fn record(&mut self, c: &Categorization) {
        self.total += 1;
        match c.source {
            LabelSource::MissingCompany => self.missing_company += 1,
            LabelSource::Cache => self.cache_hits += 1,
            LabelSource::Rule => self.regex_matches += 1,
            LabelSource::Remote => self.remote_calls += 1,
            LabelSource::Unclassified | LabelSource::Cancelled => {}
        }
        if c.label == UNKNOWN {
            self.unknown += 1;
        }
    }
}

/// State owned by one categorization run.
#[derive(Debug, Default)]
pub struct RunContext {
    cache: CategoryCache,
    stats: CategorizeStats,
    cancel: Arc<AtomicBool>,
    last_remote_call: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    /// Shared flag; setting it stops further remote calls in this run.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    pub fn stats(&self) -> CategorizeStats {
        self.stats
    }
}

pub struct CompanyCategorizer {
    rules: RuleSet,
    remote: Option<RemoteClassifier>,
    courtesy_delay: Duration,
}

impl CompanyCategorizer {
    pub fn new(rules: RuleSet, remote: Option<RemoteClassifier>) -> Self {
        Self {
            rules,
            remote,
            courtesy_delay: Duration::from_millis(1200),
        }
    }

    /// Rule table only; every unmatched company becomes `"Unknown"`.
    pub fn rules_only() -> Self {
        Self::new(RuleSet::builtin(), None)
    }

    /// Minimum spacing between consecutive remote calls.
    pub fn with_courtesy_delay(mut self, delay: Duration) -> Self {
        self.courtesy_delay = delay;
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Labels every record in order, writing `business_nature` in place.
    ///
    /// Each record receives exactly one label; no per-record failure aborts the batch.
    pub async fn categorize(&self, jobs: &mut [JobRecord], ctx: &mut RunContext) -> CategorizeStats {
        let before = ctx.stats;
        for job in jobs.iter_mut() {
            let result = self.categorize_one(&job.job_title, &job.company, ctx).await;
            job.business_nature = Some(result.label);
        }
        let run = CategorizeStats {
            total: ctx.stats.total - before.total,
            regex_matches: ctx.stats.regex_matches - before.regex_matches,
            remote_calls: ctx.stats.remote_calls - before.remote_calls,
            cache_hits: ctx.stats.cache_hits - before.cache_hits,
            missing_company: ctx.stats.missing_company - before.missing_company,
            unknown: ctx.stats.unknown - before.unknown,
        };
        info!(
            total = run.total,
            regex_matches = run.regex_matches,
            remote_calls = run.remote_calls,
            cache_hits = run.cache_hits,
            "categorized {} companies: {} regex matches, {} AI calls",
            run.total,
            run.regex_matches,
            run.remote_calls
        );
        run
    }

    /// Labels a single company, consulting and filling the run cache.
    pub async fn categorize_one(
        &self,
        job_title: &str,
        company: &str,
        ctx: &mut RunContext,
    ) -> Categorization {
        let result = self.resolve(job_title, company, ctx).await;
        debug!(company, key = %result.key, label = %result.label, source = ?result.source, "categorized");
        ctx.stats.record(&result);
        result
    }

    async fn resolve(&self, job_title: &str, company: &str, ctx: &mut RunContext) -> Categorization {
        if is_missing(company) {
            return Categorization {
                key: company.to_string(),
                label: UNKNOWN.to_string(),
                source: LabelSource::MissingCompany,
            };
        }

        let key = normalize_company_name(company);
        if let Some(label) = ctx.cache.get(&key) {
            return Categorization {
                label: label.to_string(),
                key,
                source: LabelSource::Cache,
            };
        }

        if let Some(label) = self.rules.match_category(company) {
            ctx.cache.insert(key.clone(), label);
            return Categorization {
                label: label.to_string(),
                key,
                source: LabelSource::Rule,
            };
        }

        let Some(remote) = &self.remote else {
            ctx.cache.insert(key.clone(), UNKNOWN);
            return Categorization {
                key,
                label: UNKNOWN.to_string(),
                source: LabelSource::Unclassified,
            };
        };

        if ctx.is_cancelled() {
            return Categorization {
                key,
                label: UNKNOWN.to_string(),
                source: LabelSource::Cancelled,
            };
        }

        self.wait_for_courtesy_delay(ctx).await;
        let label = remote.classify(job_title, company).await;
        ctx.last_remote_call = Some(Instant::now());
        ctx.cache.insert(key.clone(), label.clone());
        Categorization {
            key,
            label,
            source: LabelSource::Remote,
        }
    }

    async fn wait_for_courtesy_delay(&self, ctx: &RunContext) {
        if let Some(last) = ctx.last_remote_call {
            let elapsed = last.elapsed();
            if elapsed < self.courtesy_delay {
                tokio::time::sleep(self.courtesy_delay - elapsed).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(companies: &[&str]) -> Vec<JobRecord> {
        companies.iter().map(|c| JobRecord::new("Engineer", *c)).collect()
    }

    #[tokio::test]
    async fn rules_only_batch() {
        let mut batch = jobs(&["Queensland Health", "Unknown Widgets Co", "N/A"]);
        let mut ctx = RunContext::new();
        let stats = CompanyCategorizer::rules_only()
            .categorize(&mut batch, &mut ctx)
            .await;
        let labels: Vec<_> = batch
            .iter()
            .map(|j| j.business_nature.as_deref().unwrap())
            .collect();
        assert_eq!(labels, ["Healthcare Services", "Unknown", "Unknown"]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.regex_matches, 1);
        assert_eq!(stats.remote_calls, 0);
        assert_eq!(stats.missing_company, 1);
        assert_eq!(stats.unknown, 2);
    }

    #[tokio::test]
    async fn cache_reuses_first_label_for_same_key() {
        let mut batch = jobs(&["Acme Ltd", "ACME LIMITED", "The Acme Group"]);
        let mut ctx = RunContext::new();
        let stats = CompanyCategorizer::rules_only()
            .categorize(&mut batch, &mut ctx)
            .await;
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(ctx.cache().len(), 1);
        assert_eq!(ctx.cache().get("acme"), Some(UNKNOWN));
    }

    #[tokio::test]
    async fn stats_are_per_call_but_context_accumulates() {
        let categorizer = CompanyCategorizer::rules_only();
        let mut ctx = RunContext::new();
        let mut first = jobs(&["Commonwealth Bank"]);
        let mut second = jobs(&["Commonwealth Bank Ltd", ""]);
        categorizer.categorize(&mut first, &mut ctx).await;
        let stats = categorizer.categorize(&mut second, &mut ctx).await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(ctx.stats().total, 3);
        assert_eq!(second[0].business_nature.as_deref(), Some("Financial Services"));
    }

    #[tokio::test]
    async fn single_lookup_reports_source() {
        let categorizer = CompanyCategorizer::rules_only();
        let mut ctx = RunContext::new();
        let hit = categorizer
            .categorize_one("Dev", "Tech Talent Solutions", &mut ctx)
            .await;
        assert_eq!(hit.source, LabelSource::Rule);
        assert_eq!(hit.key, "tech talent");
        assert_eq!(hit.label, "Recruitment & Staffing");

        let miss = categorizer.categorize_one("Dev", "Zylo", &mut ctx).await;
        assert_eq!(miss.source, LabelSource::Unclassified);
        assert_eq!(miss.label, UNKNOWN);
    }
}
