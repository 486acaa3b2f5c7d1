use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Candidate,
    Company,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Candidate => "candidate",
            UserKind::Company => "company",
        }
    }
}

impl std::fmt::Display for UserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(UserKind::Candidate),
            "company" => Ok(UserKind::Company),
            other => Err(ParseEnumError::new("user kind", other)),
        }
    }
}

/// Root identity record, one row per registered user (`profiles` table).
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "user_type")]
    pub user_kind: UserKind,
    pub created_at: DateTime<Utc>,
}
