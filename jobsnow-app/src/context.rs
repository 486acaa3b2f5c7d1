use anyhow::Context as _;
use std::sync::Arc;

use crate::auth::SessionHolder;
use crate::config::{AppConfig, BackendKind};
use crate::database::{self, AsyncDbConnection, Database};
use crate::helpers::ClientStorage;
use crate::integrations::local::LocalBackend;
use crate::integrations::supabase::SupabaseClient;
use crate::integrations::{DataService, IdentityService};
use crate::notifications::SharedNotifier;
use crate::translations::{DirectoryLocales, EmbeddedLocales, SectionSource, TranslationStore};

/// Everything a screen needs, built once at start-up and passed down
/// explicitly.
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<ClientStorage>,
    pub data: Arc<dyn DataService>,
    pub identity: Arc<dyn IdentityService>,
    pub translations: Arc<TranslationStore>,
    pub session: Arc<SessionHolder>,
    pub notifier: SharedNotifier,
    /// Set only for the local backend
    pub local_db: Option<AsyncDbConnection>,
}

impl AppContext {
    pub fn build(config: AppConfig, notifier: SharedNotifier) -> anyhow::Result<Self> {
        let storage_path = ClientStorage::default_path()?;
        let storage = Arc::new(ClientStorage::open(&storage_path)?);
        Self::with_storage(config, storage, notifier)
    }

    pub fn with_storage(
        config: AppConfig,
        storage: Arc<ClientStorage>,
        notifier: SharedNotifier,
    ) -> anyhow::Result<Self> {
        let (data, identity, local_db): (Arc<dyn DataService>, Arc<dyn IdentityService>, _) =
            match config.backend.kind {
                BackendKind::Local => {
                    let db_path = match config.database.as_ref().and_then(|db| db.path.clone()) {
                        Some(path) => path,
                        None => database::get_db_path()?,
                    };
                    let db = Database::new(&db_path).with_context(|| {
                        format!("Failed to open database at {}", db_path.display())
                    })?;
                    tracing::info!("Using local backend at {}", db_path.display());

                    let backend = Arc::new(LocalBackend::new(
                        db.async_connection.clone(),
                        config.backend.auto_confirm,
                    ));
                    let data: Arc<dyn DataService> = backend.clone();
                    let identity: Arc<dyn IdentityService> = backend;
                    (data, identity, Some(db.async_connection))
                }
                BackendKind::Supabase => {
                    let supabase = config
                        .backend
                        .supabase
                        .as_ref()
                        .context("backend.kind is supabase but [backend.supabase] is missing")?;
                    let client = Arc::new(SupabaseClient::new(supabase)?);
                    tracing::info!("Using hosted backend at {}", supabase.url);
                    let data: Arc<dyn DataService> = client.clone();
                    let identity: Arc<dyn IdentityService> = client;
                    (data, identity, None)
                }
            };

        let source: Arc<dyn SectionSource> =
            match config.locales.as_ref().and_then(|locales| locales.directory.clone()) {
                Some(directory) => {
                    tracing::info!("Loading translations from {}", directory.display());
                    Arc::new(DirectoryLocales::new(directory))
                }
                None => Arc::new(EmbeddedLocales),
            };
        let translations = Arc::new(TranslationStore::new(
            source,
            storage.clone(),
            config.core_sections(),
        ));

        let session = Arc::new(SessionHolder::new(
            identity.clone(),
            storage.clone(),
            notifier.clone(),
            config.site_url(),
        ));

        Ok(Self {
            config,
            storage,
            data,
            identity,
            translations,
            session,
            notifier,
            local_db,
        })
    }

    /// Load core translations and restore the persisted session.
    pub async fn initialize(&self) {
        futures::join!(self.translations.initialize(), self.session.initialize());
    }
}
