use serde::{Deserialize, Deserializer, Serialize};

pub mod account;
pub mod application;
pub mod candidate;
pub mod company;
pub mod job;
pub mod language;
pub mod session;

pub use account::{Account, UserKind};
pub use application::{Application, ApplicationStatus};
pub use candidate::{CandidateProfile, CandidateProfileUpsert};
pub use company::{
    CompanyJobSummary, CompanyListing, CompanyProfile, CompanyProfileUpsert, Sector,
};
pub use job::{CreateJobRequest, Job, JobCompanySummary, JobListing, JobType};
pub use language::Language;
pub use session::{AuthChange, AuthEvent, AuthSession, AuthUser, UserMetadata};

/// Error returned when a wire value does not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Error body returned by the data service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

/// Nullable columns such as `is_profile_complete` arrive as `null` for rows
/// written before the column had a default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
