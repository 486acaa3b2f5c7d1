pub mod sources;

use futures::future::join_all;
use shared_types::Language;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::helpers::ClientStorage;
pub use sources::{DirectoryLocales, EmbeddedLocales, SectionMap, SectionSource};

/// Client storage key of the chosen display language.
pub const LANGUAGE_STORAGE_KEY: &str = "language";

#[derive(Default)]
struct StoreState {
    language: Language,
    cache: HashMap<(Language, String), SectionMap>,
    loading: bool,
    ready: bool,
}

/// Current display language plus a `(language, section)` cache of
/// translation maps that fills lazily.
pub struct TranslationStore {
    source: Arc<dyn SectionSource>,
    storage: Arc<ClientStorage>,
    core_sections: Vec<String>,
    state: RwLock<StoreState>,
}

impl TranslationStore {
    pub fn new(
        source: Arc<dyn SectionSource>,
        storage: Arc<ClientStorage>,
        core_sections: Vec<String>,
    ) -> Self {
        Self {
            source,
            storage,
            core_sections,
            state: RwLock::new(StoreState::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn language(&self) -> Language {
        self.read().language
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// True once `initialize` has loaded the core sections
    pub fn is_ready(&self) -> bool {
        self.read().ready
    }

    pub fn is_cached(&self, language: Language, section: &str) -> bool {
        self.read()
            .cache
            .contains_key(&(language, section.to_string()))
    }

    /// Translated text for the current language, or `"{section}.{key}"` when
    /// the section is not loaded or has no such key. Never triggers a load.
    pub fn t(&self, section: &str, key: &str) -> String {
        self.lookup(section, key)
            .unwrap_or_else(|| format!("{}.{}", section, key))
    }

    /// Like [`t`](Self::t) without the fallback
    pub fn lookup(&self, section: &str, key: &str) -> Option<String> {
        let state = self.read();
        let text = state
            .cache
            .get(&(state.language, section.to_string()))
            .and_then(|entries| entries.get(key))
            .filter(|text| !text.is_empty())
            .cloned();
        text
    }

    async fn load_section(&self, language: Language, section: &str) {
        if self.is_cached(language, section) {
            return;
        }

        match self.source.load(language, section).await {
            Ok(entries) => {
                self.write()
                    .cache
                    .insert((language, section.to_string()), entries);
            }
            Err(e) => {
                // Resolves to an empty mapping, not cached. No automatic retry
                tracing::warn!("Translation not found: {}/{} ({})", language, section, e);
            }
        }
    }

    async fn load_core_sections(&self, language: Language) {
        join_all(
            self.core_sections
                .iter()
                .map(|section| self.load_section(language, section)),
        )
        .await;
    }

    /// Load a feature section for the current language if not cached yet.
    pub async fn request_section(&self, section: &str) {
        let language = self.language();
        self.load_section(language, section).await;
    }

    /// Switch language, persist the choice and load the core sections for it.
    /// Feature sections are not reloaded; callers request them again.
    pub async fn change_language(&self, language: Language) {
        {
            let mut state = self.write();
            state.language = language;
            state.loading = true;
        }
        if let Err(e) = self.storage.set_item(LANGUAGE_STORAGE_KEY, language.as_str()) {
            tracing::warn!("Failed to persist language: {}", e);
        }

        self.load_core_sections(language).await;
        self.write().loading = false;
        tracing::debug!("Language changed to {}", language);
    }

    /// Restore the persisted language (anything unsupported falls back to
    /// Portuguese) and load its core sections.
    pub async fn initialize(&self) {
        let stored = self.storage.get_item(LANGUAGE_STORAGE_KEY);
        let language = Language::from_stored(stored.as_deref());
        {
            let mut state = self.write();
            state.language = language;
            state.loading = true;
        }

        self.load_core_sections(language).await;

        let mut state = self.write();
        state.loading = false;
        state.ready = true;
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::LocaleError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory sections with a load counter
    #[derive(Default)]
    pub struct StaticSections {
        sections: HashMap<(Language, String), SectionMap>,
        loads: AtomicUsize,
    }

    impl StaticSections {
        pub fn with(mut self, language: Language, section: &str, entries: &[(&str, &str)]) -> Self {
            let map = entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            self.sections.insert((language, section.to_string()), map);
            self
        }

        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SectionSource for StaticSections {
        async fn load(&self, language: Language, section: &str) -> Result<SectionMap, LocaleError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.sections
                .get(&(language, section.to_string()))
                .cloned()
                .ok_or_else(|| LocaleError::NotFound {
                    language: language.to_string(),
                    section: section.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticSections;
    use super::*;

    fn store(source: Arc<StaticSections>, storage: Arc<ClientStorage>) -> TranslationStore {
        TranslationStore::new(
            source,
            storage,
            vec!["navigation".to_string(), "home".to_string()],
        )
    }

    fn sections() -> StaticSections {
        StaticSections::default()
            .with(Language::Pt, "navigation", &[("jobs", "Vagas"), ("empty", "")])
            .with(Language::Pt, "home", &[("title", "Encontre sua")])
            .with(Language::Ja, "navigation", &[("jobs", "求人")])
            .with(Language::Ja, "home", &[("title", "あなたの")])
            .with(Language::Pt, "jobs", &[("filters", "Filtros")])
            .with(Language::Ja, "jobs", &[("filters", "フィルター")])
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_portuguese() {
        let storage = Arc::new(ClientStorage::in_memory());
        storage.set_item(LANGUAGE_STORAGE_KEY, "fr").unwrap();
        let store = store(Arc::new(sections()), storage);

        assert!(!store.is_ready());
        store.initialize().await;
        assert!(store.is_ready());
        assert!(!store.is_loading());
        assert_eq!(store.language(), Language::Pt);
        assert_eq!(store.t("navigation", "jobs"), "Vagas");
    }

    #[tokio::test]
    async fn test_t_falls_back_to_dotted_key() {
        let store = store(Arc::new(sections()), Arc::new(ClientStorage::in_memory()));
        store.initialize().await;

        assert_eq!(store.t("navigation", "missing"), "navigation.missing");
        assert_eq!(store.t("navigation", "empty"), "navigation.empty");
        // Not requested yet, so not loaded
        assert_eq!(store.t("jobs", "filters"), "jobs.filters");
    }

    #[tokio::test]
    async fn test_request_section_is_idempotent() {
        let source = Arc::new(sections());
        let store = store(source.clone(), Arc::new(ClientStorage::in_memory()));
        store.initialize().await;
        let after_init = source.loads();

        store.request_section("jobs").await;
        store.request_section("jobs").await;
        assert_eq!(source.loads(), after_init + 1);
        assert_eq!(store.t("jobs", "filters"), "Filtros");
    }

    #[tokio::test]
    async fn test_change_language_persists_and_keeps_feature_sections_per_language() {
        let storage = Arc::new(ClientStorage::in_memory());
        let store = store(Arc::new(sections()), storage.clone());
        store.initialize().await;
        store.request_section("jobs").await;

        store.change_language(Language::Ja).await;
        assert_eq!(storage.get_item(LANGUAGE_STORAGE_KEY).as_deref(), Some("ja"));
        assert!(!store.is_loading());
        assert_eq!(store.t("navigation", "jobs"), "求人");
        assert!(!store.is_cached(Language::Ja, "jobs"));
        assert_eq!(store.t("jobs", "filters"), "jobs.filters");

        store.request_section("jobs").await;
        assert_eq!(store.t("jobs", "filters"), "フィルター");
    }

    #[tokio::test]
    async fn test_failed_section_is_not_cached() {
        let source = Arc::new(sections());
        let store = store(source.clone(), Arc::new(ClientStorage::in_memory()));
        store.initialize().await;
        let before = source.loads();

        store.request_section("unknown").await;
        assert!(!store.is_cached(Language::Pt, "unknown"));
        assert_eq!(store.t("unknown", "key"), "unknown.key");

        store.request_section("unknown").await;
        assert_eq!(source.loads(), before + 2);
    }
}
