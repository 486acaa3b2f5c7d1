use shared_types::{AuthChange, AuthSession, AuthUser, UserKind, UserMetadata};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::{AuthError, ServiceError, ValidationError};
use crate::helpers::validation::{non_empty, require, validate_email, validate_new_password};
use crate::helpers::ClientStorage;
use crate::integrations::{IdentityService, SignUpRequest};
use crate::notifications::{SharedNotifier, Toast};

/// Client storage key of the persisted session.
pub const SESSION_STORAGE_KEY: &str = "jobsnow.auth.session";

pub const GOOGLE_PROVIDER: &str = "google";

#[derive(Debug, Clone, Default)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub user_kind: Option<UserKind>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
}

impl RegisterData {
    fn validate(&self) -> Result<UserMetadata, ValidationError> {
        validate_email(&self.email)?;
        validate_new_password(&self.password, &self.confirm_password)?;
        let user_kind = self
            .user_kind
            .ok_or(ValidationError::Required { field: "user_type" })?;

        match user_kind {
            UserKind::Candidate => {
                require("full_name", self.full_name.as_deref())?;
            }
            UserKind::Company => {
                require("company_name", self.company_name.as_deref())?;
                require("responsible_name", self.responsible_name.as_deref())?;
            }
        }

        Ok(UserMetadata {
            user_type: user_kind,
            full_name: match user_kind {
                UserKind::Candidate => non_empty(self.full_name.as_deref()),
                UserKind::Company => None,
            },
            company_name: match user_kind {
                UserKind::Company => non_empty(self.company_name.as_deref()),
                UserKind::Candidate => None,
            },
            responsible_name: match user_kind {
                UserKind::Company => non_empty(self.responsible_name.as_deref()),
                UserKind::Candidate => None,
            },
        })
    }
}

#[derive(Default)]
struct SessionState {
    session: Option<AuthSession>,
    user: Option<AuthUser>,
}

/// Keeps the signed-in user and session in step with the identity service's
/// auth-change stream and wraps its operations with validation and toasts.
pub struct SessionHolder {
    identity: Arc<dyn IdentityService>,
    storage: Arc<ClientStorage>,
    notifier: SharedNotifier,
    site_url: String,
    changes: Mutex<broadcast::Receiver<AuthChange>>,
    state: RwLock<SessionState>,
    loading: AtomicBool,
}

impl SessionHolder {
    /// Subscribes to the auth-change stream immediately, so nothing published
    /// after construction is missed.
    pub fn new(
        identity: Arc<dyn IdentityService>,
        storage: Arc<ClientStorage>,
        notifier: SharedNotifier,
        site_url: impl Into<String>,
    ) -> Self {
        let changes = identity.events().subscribe();
        Self {
            identity,
            storage,
            notifier,
            site_url: site_url.into(),
            changes: Mutex::new(changes),
            state: RwLock::new(SessionState::default()),
            loading: AtomicBool::new(false),
        }
    }

    /// Apply every pending auth change, in publish order.
    fn sync(&self) {
        let mut changes = self.changes.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match changes.try_recv() {
                Ok(change) => self.apply(change),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} auth changes", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn apply(&self, change: AuthChange) {
        tracing::debug!("Applying auth change {:?}", change.event);
        self.persist(change.session.as_ref());

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.user = change.session.as_ref().map(|session| session.user.clone());
        state.session = change.session;
    }

    fn persist(&self, session: Option<&AuthSession>) {
        let result = match session {
            Some(session) => serde_json::to_string(session)
                .map_err(anyhow::Error::from)
                .and_then(|json| self.storage.set_item(SESSION_STORAGE_KEY, &json)),
            None => self.storage.remove_item(SESSION_STORAGE_KEY),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist session: {}", e);
        }
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.sync();
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .session
            .clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.sync();
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .user
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Restore a session persisted by an earlier run
    pub async fn initialize(&self) {
        let persisted = match self.storage.get_item(SESSION_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<AuthSession>(&raw) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Discarding unreadable persisted session: {}", e);
                    None
                }
            },
            None => None,
        };

        if let Err(e) = self.identity.restore_session(persisted).await {
            tracing::error!("Failed to restore session: {}", e);
        }
        self.sync();
    }

    fn fail(&self, title: &'static str, error: AuthError) -> AuthError {
        tracing::error!("{}: {}", title, error);
        let mut toast = Toast::error(title, error.message_key());
        if let AuthError::Unexpected(detail) = &error {
            toast = toast.with_detail(detail.clone());
        }
        self.notifier.notify(toast);
        error
    }

    fn service_failure(&self, title: &'static str, error: ServiceError) -> AuthError {
        self.fail(title, AuthError::categorize(&error))
    }

    async fn busy<T, F>(&self, operation: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.loading.store(true, Ordering::SeqCst);
        let result = operation.await;
        self.loading.store(false, Ordering::SeqCst);
        self.sync();
        result
    }

    pub async fn register(&self, data: RegisterData) -> Result<Option<AuthSession>, AuthError> {
        let title = "auth.registerErrorTitle";
        let metadata = data
            .validate()
            .map_err(|e| self.fail(title, AuthError::from(e)))?;

        let request = SignUpRequest {
            email: data.email.trim().to_string(),
            password: data.password,
            metadata,
            redirect_to: format!("{}/dashboard", self.site_url),
        };

        match self.busy(self.identity.sign_up(&request)).await {
            Ok(session) => {
                self.notifier.notify(Toast::success(
                    "auth.registerSuccessTitle",
                    "auth.registerSuccessDescription",
                ));
                Ok(session)
            }
            Err(e) => Err(self.service_failure(title, e)),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let title = "auth.loginErrorTitle";
        validate_email(email).map_err(|e| self.fail(title, e.into()))?;

        match self
            .busy(self.identity.sign_in_with_password(email.trim(), password))
            .await
        {
            Ok(session) => {
                self.notifier.notify(Toast::success(
                    "auth.loginSuccessTitle",
                    "auth.loginSuccessDescription",
                ));
                Ok(session)
            }
            Err(e) => Err(self.service_failure(title, e)),
        }
    }

    /// URL the user must open to continue with the provider. The chosen
    /// account kind travels in the redirect so onboarding can pick it up.
    pub fn login_with_oauth_provider(
        &self,
        provider: &str,
        user_kind: UserKind,
    ) -> Result<String, AuthError> {
        let redirect_to = format!("{}/dashboard?user_type={}", self.site_url, user_kind);
        self.identity
            .oauth_authorize_url(provider, &redirect_to)
            .map_err(|e| self.service_failure("auth.oauthErrorTitle", e))
    }

    /// Signs out without navigating anywhere
    pub async fn logout(&self) -> Result<(), AuthError> {
        match self.busy(self.identity.sign_out()).await {
            Ok(()) => {
                self.notifier.notify(Toast::success(
                    "auth.logoutSuccessTitle",
                    "auth.logoutSuccessDescription",
                ));
                Ok(())
            }
            Err(e) => Err(self.service_failure("auth.logoutErrorTitle", e)),
        }
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let title = "auth.resetErrorTitle";
        validate_email(email).map_err(|e| self.fail(title, e.into()))?;

        let redirect_to = format!("{}/reset-password", self.site_url);
        match self
            .busy(self.identity.reset_password_for_email(email.trim(), &redirect_to))
            .await
        {
            Ok(()) => {
                self.notifier.notify(Toast::success(
                    "auth.resetSuccessTitle",
                    "auth.resetSuccessDescription",
                ));
                Ok(())
            }
            Err(e) => Err(self.service_failure(title, e)),
        }
    }

    pub async fn update_password(&self, password: &str, confirmation: &str) -> Result<(), AuthError> {
        let title = "auth.passwordUpdateErrorTitle";
        validate_new_password(password, confirmation).map_err(|e| self.fail(title, e.into()))?;
        if self.session().is_none() {
            return Err(self.fail(title, ValidationError::NotSignedIn.into()));
        }

        match self.busy(self.identity.update_user_password(password)).await {
            Ok(_) => {
                self.notifier.notify(Toast::success(
                    "auth.passwordUpdatedTitle",
                    "auth.passwordUpdatedDescription",
                ));
                Ok(())
            }
            Err(e) => Err(self.service_failure(title, e)),
        }
    }
}
