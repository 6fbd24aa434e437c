//! Human and JSON renderings of command results.

use chrono::{DateTime, Local};
use jobsheet_core::categorize::Categorization;
use jobsheet_core::pipeline::{CategorizeSummary, ResumeSummary};
use serde::Serialize;
use std::path::PathBuf;

/// `{prefix}_YYYYMMDD_HHMMSS.xlsx` in the working directory.
pub fn default_output(prefix: &str, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("{prefix}_{}.xlsx", now.format("%Y%m%d_%H%M%S")))
}

/// Serializes `value` with a leading `"status": "ok"` field.
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut out = serde_json::Map::new();
    out.insert("status".into(), "ok".into());
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => out.extend(map),
        other => {
            out.insert("result".into(), other);
        }
    }
    Ok(serde_json::to_string_pretty(&out)?)
}

pub fn categorize_text(s: &CategorizeSummary) -> String {
    let mut out = format!(
        "categorize: {} rows, {} regex matches, {} AI calls, {} cache hits, {} unknown\nwrote {}",
        s.stats.total,
        s.stats.regex_matches,
        s.stats.remote_calls,
        s.stats.cache_hits,
        s.stats.unknown,
        s.output.display()
    );
    if !s.remote_enabled {
        out.push_str("\n(remote categorization disabled)");
    }
    out
}

pub fn resumes_text(s: &ResumeSummary) -> String {
    let mut out = format!(
        "resumes: processed {}/{}\nwrote {}",
        s.processed,
        s.discovered,
        s.output.display()
    );
    for name in &s.skipped {
        out.push_str(&format!("\nskipped {name} (no text)"));
    }
    out
}

pub fn classify_text(company: &str, c: &Categorization) -> String {
    let source = serde_json::to_value(c.source)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    format!(
        "company: {company}\nkey:     {}\nlabel:   {}\nsource:  {source}",
        c.key, c.label
    )
}
