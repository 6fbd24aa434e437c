//! Company-name normalization used to key the category cache.

use crate::models::is_missing;
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s&\-]").expect("static regex"));
static CORPORATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(pty\s+ltd|pte\s+ltd|sdn\s+bhd|ltd|limited|inc|incorporated|llc|plc|corp|",
        r"corporation|company|co|gmbh|sa|srl|group|holdings|services|solutions|",
        r"international|global|australia|aust)\b$",
    ))
    .expect("static regex")
});
static LEADING_THE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^the\s+").expect("static regex"));

/// Reduces a company name to the key used for cache lookups.
///
/// Empty input and the `N/A` sentinel are returned unchanged. Otherwise the
/// name is lowercased, whitespace-collapsed and stripped of punctuation other
/// than `&` and `-`; then trailing corporate-form suffixes and a leading
/// "the" are removed until the key stops changing. A suffix that makes up the
/// whole remaining name is kept, so "Global Services" becomes "global".
///
/// ```
/// use jobsheet_core::normalize::normalize_company_name;
/// assert_eq!(normalize_company_name("Acme Pty Ltd"), "acme");
/// assert_eq!(normalize_company_name("The Smith Group"), "smith");
/// assert_eq!(normalize_company_name("N/A"), "N/A");
/// ```
pub fn normalize_company_name(name: &str) -> String {
    if is_missing(name) {
        return name.to_string();
    }

    let lowered = name.to_lowercase();
    let collapsed = collapse(&lowered);
    let mut key = collapse(&PUNCTUATION.replace_all(&collapsed, ""));

    loop {
        let next = strip_affixes(&key);
        if next == key {
            return key;
        }
        key = next;
    }
}

fn collapse(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

fn strip_affixes(key: &str) -> String {
    let mut out = key.to_string();
    if let Some(m) = CORPORATE_SUFFIX.find(&out) {
        let rest = out[..m.start()].trim();
        if !rest.is_empty() {
            out = rest.to_string();
        }
    }
    collapse(&LEADING_THE.replace(&out, ""))
}
