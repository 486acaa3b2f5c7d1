use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::{ParseEnumError, Sector};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
        JobType::Freelance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
            JobType::Freelance => "freelance",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .find(|job_type| job_type.as_str() == s)
            .copied()
            .ok_or_else(|| ParseEnumError::new("job type", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: String,
    pub job_type: JobType,
    pub sector: Option<Sector>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Company columns embedded in the jobs listing query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct JobCompanySummary {
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub company_profiles: Option<JobCompanySummary>,
}

impl JobListing {
    pub fn company_name(&self) -> Option<&str> {
        self.company_profiles
            .as_ref()
            .and_then(|company| company.company_name.as_deref())
    }
}

/// Insert payload used when publishing a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateJobRequest {
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: String,
    pub job_type: JobType,
    pub sector: Option<Sector>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_listing_from_rest_row() {
        let row = r#"{
            "id": "6f1c0a4e-3a59-4d55-9a55-0c0b4c9f1b11",
            "company_id": "1b0e2f8a-7c1d-4a3e-8f4b-5d6c7e8f9a0b",
            "title": "Operador de empilhadeira",
            "description": "Turno noturno",
            "requirements": null,
            "location": "Hamamatsu, Shizuoka",
            "job_type": "full_time",
            "sector": "manufacturing",
            "salary_min": 250000,
            "salary_max": null,
            "is_active": true,
            "created_at": "2024-05-01T10:00:00+00:00",
            "updated_at": "2024-05-01T10:00:00+00:00",
            "company_profiles": { "company_name": "Suzuki Parts", "logo_url": null }
        }"#;

        let listing: JobListing = serde_json::from_str(row).unwrap();
        assert_eq!(listing.job.job_type, JobType::FullTime);
        assert_eq!(listing.job.sector, Some(Sector::Manufacturing));
        assert_eq!(listing.company_name(), Some("Suzuki Parts"));
    }

    #[test]
    fn test_job_type_parse() {
        assert_eq!("part_time".parse::<JobType>().unwrap(), JobType::PartTime);
        assert!("all".parse::<JobType>().is_err());
    }
}
