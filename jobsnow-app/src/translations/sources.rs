use async_trait::async_trait;
use rust_embed::RustEmbed;
use shared_types::Language;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::LocaleError;

/// Flat key → text mapping for one `(language, section)` pair.
pub type SectionMap = HashMap<String, String>;

#[derive(RustEmbed)]
#[folder = "assets/locales/"]
struct LocaleAssets;

#[async_trait]
pub trait SectionSource: Send + Sync {
    async fn load(&self, language: Language, section: &str) -> Result<SectionMap, LocaleError>;
}

/// Parse a section file. Only top-level string values are kept.
pub fn parse_section(language: Language, section: &str, raw: &str) -> Result<SectionMap, LocaleError> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).map_err(|source| LocaleError::Parse {
            language: language.to_string(),
            section: section.to_string(),
            source,
        })?;

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(text) => Some((key, text)),
            _ => None,
        })
        .collect())
}

fn section_path(language: Language, section: &str) -> String {
    format!("{}/{}.json", language.as_str(), section)
}

/// Sections compiled into the binary from `assets/locales/{lang}/{section}.json`
pub struct EmbeddedLocales;

impl EmbeddedLocales {
    /// Section names bundled for a language
    pub fn sections(language: Language) -> Vec<String> {
        let prefix = format!("{}/", language.as_str());
        let mut sections: Vec<String> = LocaleAssets::iter()
            .filter_map(|file| {
                file.strip_prefix(&prefix)
                    .and_then(|name| name.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect();
        sections.sort();
        sections
    }
}

#[async_trait]
impl SectionSource for EmbeddedLocales {
    async fn load(&self, language: Language, section: &str) -> Result<SectionMap, LocaleError> {
        let file = LocaleAssets::get(&section_path(language, section)).ok_or_else(|| {
            LocaleError::NotFound {
                language: language.to_string(),
                section: section.to_string(),
            }
        })?;
        parse_section(language, section, &String::from_utf8_lossy(file.data.as_ref()))
    }
}

/// Same layout as the bundled sections, read from disk at load time
pub struct DirectoryLocales {
    root: PathBuf,
}

impl DirectoryLocales {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SectionSource for DirectoryLocales {
    async fn load(&self, language: Language, section: &str) -> Result<SectionMap, LocaleError> {
        let path = self.root.join(section_path(language, section));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LocaleError::NotFound {
                    language: language.to_string(),
                    section: section.to_string(),
                })
            }
            Err(source) => {
                return Err(LocaleError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        parse_section(language, section, &raw)
    }
}
