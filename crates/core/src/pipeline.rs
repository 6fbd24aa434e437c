use crate::categorize::{CategorizeStats, CompanyCategorizer, RunContext};
use crate::classifier::RemoteClassifier;
use crate::config::AppConfig;
use crate::extractor::{self, DocumentKind};
use crate::models::CandidateRecord;
use crate::resume::ResumeParser;
use crate::retry::RetryPolicy;
use crate::rules::{self, RuleSet};
use crate::spreadsheet;
use anyhow::Context;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::{CompletionOptions, ProviderRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_LLM: &str = "openai";

#[derive(Debug, Clone, Serialize)]
pub struct CategorizeSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub remote_enabled: bool,
    #[serde(flatten)]
    pub stats: CategorizeStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumeSummary {
    pub discovered: usize,
    pub processed: usize,
    pub skipped: Vec<String>,
    pub output: PathBuf,
}

/// Registers an OpenAI-compatible provider when an API key is available.
pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut reg = ProviderRegistry::new();
    if let Some(api_key) = config.api_key() {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key,
            base_url: config.llm.base_url.clone(),
            chat_model: config.llm.model.clone(),
            timeout: config.llm.timeout(),
            app_title: config.llm.app_title.clone(),
        })?;
        reg = reg
            .with_llm(DEFAULT_LLM, Arc::new(provider))
            .set_preferred_llm(DEFAULT_LLM);
    }
    Ok(reg)
}

pub fn build_rules(config: &AppConfig) -> anyhow::Result<RuleSet> {
    let mut set = RuleSet::builtin();
    if let Some(dir) = &config.categorize.rules_path {
        let extra = rules::load_rules_from_dir(Path::new(dir))
            .with_context(|| format!("load category rules from {dir}"))?;
        info!(count = extra.len(), dir = %dir, "loaded extra category rules");
        set = set.with_extra(extra).context("compile category rules")?;
    }
    Ok(set)
}

/// Assembles the categorizer; the remote fallback is used only when allowed and a provider exists.
pub fn build_categorizer(
    config: &AppConfig,
    registry: &ProviderRegistry,
    allow_remote: bool,
) -> anyhow::Result<CompanyCategorizer> {
    let cat = &config.categorize;
    let remote = if allow_remote {
        registry.llm(None).ok().map(|llm| {
            RemoteClassifier::new(llm)
                .with_options(CompletionOptions {
                    max_tokens: cat.max_tokens,
                    temperature: cat.temperature,
                })
                .with_retry(RetryPolicy::new(
                    cat.max_attempts,
                    Duration::from_millis(cat.rate_limit_backoff_ms),
                ))
        })
    } else {
        None
    };
    if remote.is_none() {
        warn!("remote categorization disabled; unmatched companies will be labelled Unknown");
    }
    Ok(CompanyCategorizer::new(build_rules(config)?, remote)
        .with_courtesy_delay(Duration::from_millis(cat.courtesy_delay_ms)))
}

pub fn build_resume_parser(config: &AppConfig, registry: &ProviderRegistry) -> anyhow::Result<ResumeParser> {
    let llm = registry
        .llm(None)
        .context("resume parsing needs an API key (set OPENROUTER_API_KEY)")?;
    let r = &config.resume;
    Ok(ResumeParser::new(llm)
        .with_options(CompletionOptions {
            max_tokens: r.max_tokens,
            temperature: r.temperature,
        })
        .with_retry(RetryPolicy::new(
            r.max_attempts,
            Duration::from_millis(r.backoff_ms),
        ))
        .with_max_chars(r.max_chars))
}

/// Reads a job sheet, labels every company and writes the annotated xlsx.
pub async fn categorize_file(
    config: &AppConfig,
    categorizer: &CompanyCategorizer,
    input: &Path,
    output: &Path,
    ctx: &mut RunContext,
) -> anyhow::Result<CategorizeSummary> {
    info!("Starting categorization phase...");
    let mut jobs = spreadsheet::read_jobs(input)
        .with_context(|| format!("read job sheet {}", input.display()))?;
    let stats = categorizer.categorize(&mut jobs, ctx).await;
    info!("Categorization complete.");

    let bytes = spreadsheet::export_jobs(&jobs, config.export.max_column_width)?;
    std::fs::write(output, bytes).with_context(|| format!("write {}", output.display()))?;
    info!(output = %output.display(), "wrote categorized jobs");

    Ok(CategorizeSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        remote_enabled: categorizer.has_remote(),
        stats,
    })
}

/// Expands files and directories into the supported documents beneath them, sorted.
pub fn collect_documents(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut docs = Vec::new();
    for input in inputs {
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if entry.file_type().is_file() && DocumentKind::from_path(entry.path()).is_some() {
                docs.push(entry.into_path());
            }
        }
    }
    docs.sort();
    docs.dedup();
    docs
}

/// Extracts and parses every resume, returning candidates in file order.
pub async fn parse_resumes(
    parser: &ResumeParser,
    documents: &[PathBuf],
) -> (Vec<CandidateRecord>, Vec<String>) {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    for (i, path) in documents.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!(file = %name, "processing resume {}/{}", i + 1, documents.len());

        let text = extractor::extract(path);
        if text.trim().is_empty() {
            warn!(file = %name, "no text to extract, skipping");
            skipped.push(name);
            continue;
        }

        let mut candidate = parser.parse(&text).await;
        candidate.source_file = name;
        candidates.push(candidate);
    }
    (candidates, skipped)
}

/// Runs the resume flow end to end and writes the candidate workbook.
pub async fn resumes_to_file(
    config: &AppConfig,
    parser: &ResumeParser,
    inputs: &[PathBuf],
    output: &Path,
) -> anyhow::Result<ResumeSummary> {
    info!("Starting resume extraction phase...");
    let documents = collect_documents(inputs);
    if documents.is_empty() {
        anyhow::bail!("no .pdf or .docx files found");
    }
    let (candidates, skipped) = parse_resumes(parser, &documents).await;
    info!(
        "Successfully processed {}/{} resume files.",
        candidates.len(),
        documents.len()
    );

    let bytes = spreadsheet::export_candidates(&candidates, config.export.max_column_width)
        .context("no resumes could be processed")?;
    std::fs::write(output, bytes).with_context(|| format!("write {}", output.display()))?;

    Ok(ResumeSummary {
        discovered: documents.len(),
        processed: candidates.len(),
        skipped,
        output: output.to_path_buf(),
    })
}
