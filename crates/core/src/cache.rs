use std::collections::HashMap;

/// Normalized company name → category label, scoped to a single run.
#[derive(Debug, Default, Clone)]
pub struct CategoryCache {
    entries: HashMap<String, String>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, label: impl Into<String>) {
        self.entries.insert(key.into(), label.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
