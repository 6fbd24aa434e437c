//! Ordered topic → pattern table used for deterministic company categorization.
//!
//! The first topic whose patterns match anywhere in the raw company name wins.
//! Topic order is significant: overlapping triggers (e.g. "Tech Talent") are
//! resolved purely by position in [`BUILTIN_RULES`].

use crate::models::is_missing;
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

pub const RECRUITMENT: &str = "Recruitment & Staffing";
pub const HEALTHCARE: &str = "Healthcare Services";
pub const FINANCE: &str = "Financial Services";
pub const EDUCATION: &str = "Education & Training";
pub const CONSTRUCTION: &str = "Construction & Engineering";
pub const RETAIL: &str = "Retail & E-commerce";
pub const TECHNOLOGY: &str = "Technology & Software";
pub const MANUFACTURING: &str = "Manufacturing";

pub const BUILTIN_RULES: &[(&str, &[&str])] = &[
    (
        RECRUITMENT,
        &[
            r"recruit",
            r"people",
            r"talent",
            r"staffing",
            r"personnel",
            r"executive",
            r"placement",
            r"workforce",
            r"consulting.*hr",
            r"human.*resources",
            r"hr.*solutions",
            r"employment",
        ],
    ),
    (
        HEALTHCARE,
        &[
            r"health",
            r"medical",
            r"hospital",
            r"clinic",
            r"pharma",
            r"dental",
            r"care",
            r"wellness",
            r"therapy",
        ],
    ),
    (
        FINANCE,
        &[
            r"bank",
            r"finance",
            r"insurance",
            r"investment",
            r"capital",
            r"credit",
            r"loan",
            r"wealth",
            r"fund",
            r"financial",
        ],
    ),
    (
        EDUCATION,
        &[
            r"school",
            r"university",
            r"college",
            r"education",
            r"training",
            r"learning",
            r"academy",
            r"institute",
        ],
    ),
    (
        CONSTRUCTION,
        &[
            r"construction",
            r"building",
            r"contractor",
            r"engineering",
            r"architect",
            r"property",
            r"real.*estate",
            r"development",
        ],
    ),
    (
        RETAIL,
        &[
            r"retail",
            r"shop",
            r"store",
            r"market",
            r"sales",
            r"commerce",
            r"fashion",
            r"clothing",
            r"goods",
        ],
    ),
    (
        TECHNOLOGY,
        &[
            r"tech",
            r"software",
            r"systems",
            r"digital",
            r"data",
            r"cyber",
            r"cloud",
            r"analytics",
            r"automation",
            r"ai",
            r"machine learning",
        ],
    ),
    (
        MANUFACTURING,
        &[
            r"manufacturing",
            r"factory",
            r"production",
            r"industrial",
            r"automotive",
            r"steel",
            r"chemical",
            r"pharmaceutical",
        ],
    ),
];

/// A user-supplied topic loaded from a TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRule {
    pub label: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone)]
struct CompiledRule {
    label: String,
    patterns: RegexSet,
}

impl CompiledRule {
    fn compile<I, S>(label: &str, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            label: label.to_string(),
            patterns,
        })
    }
}

/// Compiled, ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    rules: BUILTIN_RULES
        .iter()
        .map(|(label, patterns)| {
            CompiledRule::compile(label, patterns.iter()).expect("built-in category pattern")
        })
        .collect(),
});

impl Default for RuleSet {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl RuleSet {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Appends enabled extra rules after the built-in table, ordered by priority.
    pub fn with_extra(mut self, mut extra: Vec<CategoryRule>) -> Result<Self, regex::Error> {
        extra.retain(|r| r.enabled && !r.patterns.is_empty());
        extra.sort_by_key(|r| r.priority);
        for rule in extra {
            self.rules
                .push(CompiledRule::compile(&rule.label, &rule.patterns)?);
        }
        Ok(self)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.label.as_str())
    }

    /// Returns the label of the first topic with a pattern matching `company`.
    pub fn match_category(&self, company: &str) -> Option<&str> {
        if is_missing(company) {
            return None;
        }
        let hit = self
            .rules
            .iter()
            .find(|r| r.patterns.is_match(company))
            .map(|r| r.label.as_str());
        debug!(company, label = ?hit, "rule match");
        hit
    }
}

/// Matches against the built-in table only.
pub fn match_category(company: &str) -> Option<&'static str> {
    if is_missing(company) {
        return None;
    }
    BUILTIN
        .rules
        .iter()
        .zip(BUILTIN_RULES)
        .find(|(rule, _)| rule.patterns.is_match(company))
        .map(|(_, (label, _))| *label)
}

/// Loads every `*.toml` rule in `dir`, in file-name order.
pub fn load_rules_from_dir(dir: &Path) -> anyhow::Result<Vec<CategoryRule>> {
    let mut rules = Vec::new();
    if !dir.exists() {
        return Ok(rules);
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("toml")
        {
            paths.push(entry.path());
        }
    }
    paths.sort();
    for path in paths {
        let content = fs::read_to_string(&path)?;
        let rule: CategoryRule = toml::from_str(&content)?;
        rules.push(rule);
    }
    Ok(rules)
}
