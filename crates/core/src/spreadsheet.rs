//! Job sheet input and xlsx export for job and candidate records.

use crate::models::{
    CandidateRecord, JobRecord, CANDIDATE_COLUMNS, JOB_COLUMNS, REQUIRED_JOB_COLUMNS,
};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const JOB_SHEET: &str = "Job Data";
pub const CANDIDATE_SHEET: &str = "Resume Data";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("no {0} data to export")]
    Empty(&'static str),
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("spreadsheet read error: {0}")]
    Read(#[from] calamine::Error),
    #[error("spreadsheet write error: {0}")]
    Write(#[from] XlsxError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads job rows from an Excel/ODS workbook (first sheet) or a JSON array.
pub fn read_jobs(path: &Path) -> Result<Vec<JobRecord>, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let jobs = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook_jobs(path)?,
        "json" => read_json_jobs(&std::fs::read_to_string(path)?)?,
        other => return Err(SheetError::UnsupportedFormat(other.to_string())),
    };
    info!(path = %path.display(), jobs = jobs.len(), "loaded job sheet");
    Ok(jobs)
}

fn read_workbook_jobs(path: &Path) -> Result<Vec<JobRecord>, SheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    let index = column_index(header.iter().map(String::as_str))?;

    let jobs = rows
        .filter(|r| r.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|r| {
            let get = |name: &str| {
                index
                    .get(name)
                    .and_then(|&i| r.get(i))
                    .map(cell_text)
                    .unwrap_or_default()
            };
            job_from(get)
        })
        .collect();
    Ok(jobs)
}

fn read_json_jobs(content: &str) -> Result<Vec<JobRecord>, SheetError> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(content)?;
    column_index(rows.iter().flat_map(|r| r.keys().map(String::as_str)))?;
    Ok(rows
        .iter()
        .map(|r| job_from(|name: &str| r.get(name).map(value_text).unwrap_or_default()))
        .collect())
}

/// Maps column name → position, failing if any required column is absent.
fn column_index<'a>(
    header: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, usize>, SheetError> {
    let mut index = HashMap::new();
    for (i, name) in header.enumerate() {
        index.entry(name.to_string()).or_insert(i);
    }
    let missing: Vec<String> = REQUIRED_JOB_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(index)
    } else {
        Err(SheetError::MissingColumns(missing))
    }
}

fn job_from(get: impl Fn(&str) -> String) -> JobRecord {
    let nature = get("Business Nature");
    JobRecord {
        job_title: get("Job Title"),
        company: get("Company").trim().to_string(),
        location: get("Location"),
        salary: get("Salary"),
        job_url: get("Job URL"),
        business_nature: (!nature.is_empty()).then_some(nature),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders categorized jobs as an xlsx workbook.
pub fn export_jobs(jobs: &[JobRecord], max_column_width: usize) -> Result<Vec<u8>, SheetError> {
    if jobs.is_empty() {
        return Err(SheetError::Empty("job"));
    }
    let rows: Vec<[&str; 6]> = jobs.iter().map(JobRecord::row).collect();
    render_sheet(JOB_SHEET, &JOB_COLUMNS, &rows, max_column_width)
}

/// Renders parsed candidates as an xlsx workbook.
pub fn export_candidates(
    candidates: &[CandidateRecord],
    max_column_width: usize,
) -> Result<Vec<u8>, SheetError> {
    if candidates.is_empty() {
        return Err(SheetError::Empty("candidate"));
    }
    let rows: Vec<[&str; 9]> = candidates.iter().map(CandidateRecord::row).collect();
    render_sheet(CANDIDATE_SHEET, &CANDIDATE_COLUMNS, &rows, max_column_width)
}

fn render_sheet<const N: usize>(
    name: &str,
    headers: &[&str; N],
    rows: &[[&str; N]],
    max_column_width: usize,
) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32 + 1, col as u16, *value)?;
            }
        }
    }
    for (col, width) in column_widths(headers, rows, max_column_width)
        .into_iter()
        .enumerate()
    {
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Longest cell (header included) plus two characters of padding, capped.
fn column_widths<const N: usize>(
    headers: &[&str; N],
    rows: &[[&str; N]],
    max_column_width: usize,
) -> [usize; N] {
    let mut widths = [0usize; N];
    for (col, width) in widths.iter_mut().enumerate() {
        let longest = std::iter::once(headers[col])
            .chain(rows.iter().map(|r| r[col]))
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);
        *width = (longest + 2).min(max_column_width);
    }
    widths
}
