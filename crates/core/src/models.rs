use serde::{Deserialize, Serialize};

/// Placeholder the scrapers and spreadsheets use for a missing value.
pub const NOT_AVAILABLE: &str = "N/A";
/// Label assigned whenever a company cannot be categorized.
pub const UNKNOWN: &str = "Unknown";

/// Column order of the exported job sheet.
pub const JOB_COLUMNS: [&str; 6] = [
    "Job Title",
    "Company",
    "Business Nature",
    "Location",
    "Salary",
    "Job URL",
];

/// Columns an input job sheet must provide.
pub const REQUIRED_JOB_COLUMNS: [&str; 5] = ["Job Title", "Company", "Location", "Salary", "Job URL"];

/// Column order of the exported candidate sheet.
pub const CANDIDATE_COLUMNS: [&str; 9] = [
    "First Name",
    "Last Name",
    "Mobile",
    "Email",
    "Current Job Title",
    "Current Company",
    "Previous Job Title",
    "Previous Company",
    "Source File",
];

/// Returns true for values that carry no company information.
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || value == NOT_AVAILABLE
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "Job Title", default)]
    pub job_title: String,
    #[serde(rename = "Company", default)]
    pub company: String,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "Salary", default)]
    pub salary: String,
    #[serde(rename = "Job URL", default)]
    pub job_url: String,
    #[serde(
        rename = "Business Nature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub business_nature: Option<String>,
}

impl JobRecord {
    pub fn new(job_title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            company: company.into(),
            ..Self::default()
        }
    }

    /// Cell values in [`JOB_COLUMNS`] order.
    pub fn row(&self) -> [&str; 6] {
        [
            self.job_title.as_str(),
            self.company.as_str(),
            self.business_nature.as_deref().unwrap_or(""),
            self.location.as_str(),
            self.salary.as_str(),
            self.job_url.as_str(),
        ]
    }
}

/// Fields pulled out of a single resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(rename = "first name", default)]
    pub first_name: String,
    #[serde(rename = "last name", default)]
    pub last_name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "current job title", default)]
    pub current_job_title: String,
    #[serde(rename = "current company", default)]
    pub current_company: String,
    #[serde(rename = "previous job title", default)]
    pub previous_job_title: String,
    #[serde(rename = "previous company", default)]
    pub previous_company: String,
    #[serde(rename = "filename", default)]
    pub source_file: String,
}

impl CandidateRecord {
    pub fn is_empty(&self) -> bool {
        self.row()[..8].iter().all(|v| v.is_empty())
    }

    /// Cell values in [`CANDIDATE_COLUMNS`] order.
    pub fn row(&self) -> [&str; 9] {
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.mobile.as_str(),
            self.email.as_str(),
            self.current_job_title.as_str(),
            self.current_company.as_str(),
            self.previous_job_title.as_str(),
            self.previous_company.as_str(),
            self.source_file.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_row_follows_export_column_order() {
        let job = JobRecord {
            job_title: "Nurse".into(),
            company: "Queensland Health".into(),
            location: "Brisbane".into(),
            salary: "$90k".into(),
            job_url: "https://example.com/1".into(),
            business_nature: Some("Healthcare Services".into()),
        };
        assert_eq!(
            job.row(),
            [
                "Nurse",
                "Queensland Health",
                "Healthcare Services",
                "Brisbane",
                "$90k",
                "https://example.com/1",
            ]
        );
    }

    #[test]
    fn job_record_uses_sheet_column_names() {
        let job: JobRecord = serde_json::from_str(
            r#"{"Job Title":"Dev","Company":"Acme","Location":"Perth","Salary":"","Job URL":""}"#,
        )
        .unwrap();
        assert_eq!(job.company, "Acme");
        assert!(job.business_nature.is_none());
    }

    #[test]
    fn missing_values() {
        assert!(is_missing(""));
        assert!(is_missing("N/A"));
        assert!(!is_missing("n/a company"));
    }
}
