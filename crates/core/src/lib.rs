//! Core library: job-sheet categorization, resume parsing, spreadsheet export.

pub mod cache;
pub mod categorize;
pub mod classifier;
pub mod config;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod resume;
pub mod retry;
pub mod rules;
pub mod spreadsheet;
