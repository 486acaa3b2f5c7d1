use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::ParseEnumError;

/// Business sector shared by companies and jobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    #[serde(rename = "IT")]
    It,
    Retail,
    Construction,
    Manufacturing,
    Services,
    Education,
    Healthcare,
    Tourism,
    Food,
    Logistics,
    Other,
}

impl Sector {
    pub const ALL: [Sector; 11] = [
        Sector::It,
        Sector::Retail,
        Sector::Construction,
        Sector::Manufacturing,
        Sector::Services,
        Sector::Education,
        Sector::Healthcare,
        Sector::Tourism,
        Sector::Food,
        Sector::Logistics,
        Sector::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::It => "IT",
            Sector::Retail => "retail",
            Sector::Construction => "construction",
            Sector::Manufacturing => "manufacturing",
            Sector::Services => "services",
            Sector::Education => "education",
            Sector::Healthcare => "healthcare",
            Sector::Tourism => "tourism",
            Sector::Food => "food",
            Sector::Logistics => "logistics",
            Sector::Other => "other",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sector {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::ALL
            .iter()
            .find(|sector| sector.as_str() == s)
            .copied()
            .ok_or_else(|| ParseEnumError::new("sector", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct CompanyProfile {
    pub id: Uuid,
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub cnpj: Option<String>,
    pub sector: Option<Sector>,
    pub employee_count: Option<i32>,
    pub founded_year: Option<i32>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub is_verified: bool,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload for `company_profiles`. Unset fields are left out of the
/// serialized body so an upsert never blanks a stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyProfileUpsert {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_profile_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Job columns embedded in the companies listing query.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct CompanyJobSummary {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct CompanyListing {
    #[serde(flatten)]
    pub company: CompanyProfile,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub jobs: Vec<CompanyJobSummary>,
}

impl CompanyListing {
    pub fn active_job_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.is_active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_serialization() {
        assert_eq!(serde_json::to_string(&Sector::It).unwrap(), "\"IT\"");
        assert_eq!(
            serde_json::to_string(&Sector::Healthcare).unwrap(),
            "\"healthcare\""
        );

        let parsed: Sector = serde_json::from_str("\"logistics\"").unwrap();
        assert_eq!(parsed, Sector::Logistics);
        assert_eq!("IT".parse::<Sector>().unwrap(), Sector::It);
        assert!("it".parse::<Sector>().is_err());
    }

    #[test]
    fn test_upsert_omits_unset_sector() {
        let payload = CompanyProfileUpsert {
            id: Uuid::nil(),
            company_name: Some("Sakura Foods".to_string()),
            sector: None,
            ..Default::default()
        };

        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("sector"));
        assert!(!object.contains_key("phone"));
        assert_eq!(object["company_name"], "Sakura Foods");
    }
}
