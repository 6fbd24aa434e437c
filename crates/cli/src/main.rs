use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::report;
use jobsheet_core::categorize::RunContext;
use jobsheet_core::config::{self, AppConfig};
use jobsheet_core::pipeline;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Categorize {
            input,
            output,
            no_remote,
            json,
        } => run_categorize(cfg, input, output, !no_remote, json).await,
        Commands::Resumes {
            paths,
            output,
            json,
        } => run_resumes(cfg, paths, output, json).await,
        Commands::Classify {
            company,
            title,
            no_remote,
            json,
        } => run_classify(cfg, &company, &title, !no_remote, json).await,
        Commands::Config => show_config(cfg),
    }
}

#[derive(Parser)]
#[command(name = "jobsheet")]
#[command(about = "Categorize job listings by company and extract resume details", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label every row of a job sheet with the company's business nature
    Categorize {
        /// Job sheet (.xlsx, .xls, .ods or .json)
        #[arg(short, long)]
        input: PathBuf,
        /// Output workbook (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use only the built-in and configured rules
        #[arg(long)]
        no_remote: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Extract candidate details from PDF/DOCX resumes
    Resumes {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Categorize a single company
    Classify {
        company: String,
        #[arg(short, long, default_value = "")]
        title: String,
        #[arg(long)]
        no_remote: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print effective settings
    Config,
}

/// Sets the returned flag on Ctrl-C so the run winds down without more remote calls.
fn install_interrupt_flag() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; remaining companies will not be sent for remote categorization");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

async fn run_categorize(
    cfg: AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    allow_remote: bool,
    json: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| report::default_output("categorized_jobs", chrono::Local::now()));
    let registry = pipeline::build_registry(&cfg)?;
    let categorizer = pipeline::build_categorizer(&cfg, &registry, allow_remote)?;
    let mut ctx = RunContext::with_cancel_flag(install_interrupt_flag());

    let summary = pipeline::categorize_file(&cfg, &categorizer, &input, &output, &mut ctx).await?;
    if json {
        println!("{}", report::json(&summary)?);
    } else {
        println!("{}", report::categorize_text(&summary));
    }
    Ok(())
}

async fn run_resumes(
    cfg: AppConfig,
    paths: Vec<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| report::default_output("candidates", chrono::Local::now()));
    let registry = pipeline::build_registry(&cfg)?;
    let parser = pipeline::build_resume_parser(&cfg, &registry)?;

    let summary = pipeline::resumes_to_file(&cfg, &parser, &paths, &output).await?;
    if json {
        println!("{}", report::json(&summary)?);
    } else {
        println!("{}", report::resumes_text(&summary));
    }
    Ok(())
}

async fn run_classify(
    cfg: AppConfig,
    company: &str,
    title: &str,
    allow_remote: bool,
    json: bool,
) -> Result<()> {
    let registry = pipeline::build_registry(&cfg)?;
    let categorizer = pipeline::build_categorizer(&cfg, &registry, allow_remote)?;
    let mut ctx = RunContext::new();
    let result = categorizer.categorize_one(title, company, &mut ctx).await;
    if json {
        println!("{}", report::json(&result)?);
    } else {
        println!("{}", report::classify_text(company, &result));
    }
    Ok(())
}

fn show_config(mut cfg: AppConfig) -> Result<()> {
    let key_state = if cfg.api_key().is_some() { "set" } else { "unset" };
    cfg.llm.api_key = None;
    let mut value = serde_json::to_value(&cfg).context("serialize config")?;
    if let Some(llm) = value.get_mut("llm").and_then(|v| v.as_object_mut()) {
        llm.insert("api_key".into(), key_state.into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
