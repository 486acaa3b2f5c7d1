use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::ParseEnumError;

/// Display languages offered by the site.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
    Ja,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Pt, Language::En, Language::Ja];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    /// Resolve a persisted preference, falling back to the default for
    /// anything outside the supported set.
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pt" => Ok(Language::Pt),
            "en" => Ok(Language::En),
            "ja" => Ok(Language::Ja),
            other => Err(ParseEnumError::new("language", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stored_falls_back_to_portuguese() {
        assert_eq!(Language::from_stored(Some("fr")), Language::Pt);
        assert_eq!(Language::from_stored(Some("")), Language::Pt);
        assert_eq!(Language::from_stored(None), Language::Pt);
        assert_eq!(Language::from_stored(Some("ja")), Language::Ja);
    }
}
