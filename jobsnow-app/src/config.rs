use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub database: Option<DatabaseConfig>,
    pub locales: Option<LocalesConfig>,
    pub site: Option<SiteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            database: Some(DatabaseConfig { path: None }),
            locales: Some(LocalesConfig::default()),
            site: Some(SiteConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Supabase,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    pub supabase: Option<SupabaseConfig>,
    /// Local backend only: accept sign-ins without e-mail confirmation
    #[serde(default = "default_auto_confirm")]
    pub auto_confirm: bool,
}

fn default_auto_confirm() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocalesConfig {
    #[serde(default = "default_core_sections")]
    pub core_sections: Vec<String>,
    /// Directory laid out as `{lang}/{section}.json`, used instead of the
    /// bundled locales when set
    pub directory: Option<PathBuf>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            core_sections: default_core_sections(),
            directory: None,
        }
    }
}

pub fn default_core_sections() -> Vec<String> {
    ["navigation", "home", "stats", "footer"]
        .iter()
        .map(|section| section.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    /// Public origin used to build e-mail redirect links
    pub url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            let default_config = r#"
[backend]
kind = "local"
auto_confirm = true

# [backend.supabase]
# url = "https://your-project.supabase.co"
# anon_key = "your-anon-key"
# timeout_secs = 30

[database]
# path = "/path/to/jobsnow.db"

[locales]
core_sections = ["navigation", "home", "stats", "footer"]
# directory = "/path/to/locales"

[site]
url = "http://localhost:8080"
"#;
            std::fs::write(&config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    /// Read a config file, with `JOBSNOW__SECTION__KEY` environment
    /// variables taking precedence.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix("JOBSNOW").separator("__"))
            .build()?;

        builder.try_deserialize()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn core_sections(&self) -> Vec<String> {
        self.locales
            .as_ref()
            .map(|locales| locales.core_sections.clone())
            .unwrap_or_else(default_core_sections)
    }

    pub fn site_url(&self) -> String {
        self.site
            .as_ref()
            .map(|site| site.url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| SiteConfig::default().url)
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("jobsnow").join("app.toml")
    } else {
        PathBuf::from("app.toml")
    }
}
