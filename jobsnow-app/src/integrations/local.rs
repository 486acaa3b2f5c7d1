use async_trait::async_trait;
use shared_types::{
    Account, AuthEvent, AuthSession, AuthUser, CandidateProfile, CandidateProfileUpsert,
    CompanyListing, CompanyProfile, CompanyProfileUpsert, JobListing,
};
use std::sync::RwLock;
use uuid::Uuid;

use super::{AuthEventBus, DataService, IdentityService, SignUpRequest};
use crate::database::{accounts, jobs, profiles, AsyncDbConnection};
use crate::error::ServiceError;
use crate::helpers::password::{generate_token, hash_password, verify_password};

const SESSION_TTL_SECS: i64 = 3600;

/// Self-contained backend on the local SQLite database. Mirrors the hosted
/// service's error messages so callers categorize failures the same way.
pub struct LocalBackend {
    db: AsyncDbConnection,
    events: AuthEventBus,
    current: RwLock<Option<AuthSession>>,
    auto_confirm: bool,
}

impl LocalBackend {
    pub fn new(db: AsyncDbConnection, auto_confirm: bool) -> Self {
        Self {
            db,
            events: AuthEventBus::new(),
            current: RwLock::new(None),
            auto_confirm,
        }
    }

    pub fn connection(&self) -> AsyncDbConnection {
        self.db.clone()
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_current(&self, session: Option<AuthSession>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Writes are only allowed on the signed-in user's own rows.
    fn check_owner(&self, id: Uuid) -> Result<(), ServiceError> {
        match self.current_session() {
            Some(session) if session.user.id == id => Ok(()),
            _ => Err(ServiceError::with_code(
                "42501",
                "new row violates row-level security policy",
            )
            .with_status(403)),
        }
    }

    async fn open_session(&self, user: AuthUser) -> Result<AuthSession, ServiceError> {
        let access_token = generate_token();
        let refresh_token = generate_token();
        let expires_at = chrono::Utc::now().timestamp() + SESSION_TTL_SECS;

        accounts::insert_session(
            self.db.clone(),
            user.id,
            &access_token,
            &refresh_token,
            expires_at,
        )
        .await?;

        Ok(AuthSession {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(expires_at),
            user,
        })
    }
}

fn found<T>(row: Option<T>) -> Result<T, ServiceError> {
    row.ok_or_else(ServiceError::no_rows)
}

#[async_trait]
impl DataService for LocalBackend {
    async fn fetch_account(&self, id: Uuid) -> Result<Account, ServiceError> {
        found(accounts::get_account(self.db.clone(), id).await?)
    }

    async fn fetch_candidate_profile(&self, id: Uuid) -> Result<CandidateProfile, ServiceError> {
        found(profiles::get_candidate_profile(self.db.clone(), id).await?)
    }

    async fn upsert_candidate_profile(
        &self,
        payload: &CandidateProfileUpsert,
    ) -> Result<(), ServiceError> {
        self.check_owner(payload.id)?;
        profiles::upsert_candidate_profile(self.db.clone(), payload).await?;
        Ok(())
    }

    async fn fetch_company_profile(&self, id: Uuid) -> Result<CompanyProfile, ServiceError> {
        found(profiles::get_company_profile(self.db.clone(), id).await?)
    }

    async fn upsert_company_profile(
        &self,
        payload: &CompanyProfileUpsert,
    ) -> Result<(), ServiceError> {
        self.check_owner(payload.id)?;
        profiles::upsert_company_profile(self.db.clone(), payload).await?;
        Ok(())
    }

    async fn list_active_jobs(&self) -> Result<Vec<JobListing>, ServiceError> {
        Ok(jobs::list_active_jobs(self.db.clone()).await?)
    }

    async fn list_named_companies(&self) -> Result<Vec<CompanyListing>, ServiceError> {
        Ok(jobs::list_named_companies(self.db.clone()).await?)
    }
}

#[async_trait]
impl IdentityService for LocalBackend {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<AuthSession>, ServiceError> {
        let metadata = serde_json::to_value(&request.metadata)
            .map_err(|e| ServiceError::new(e.to_string()))?;
        let password_hash = hash_password(&request.password)?;
        let mut account = accounts::NewAccount::new(
            &request.email,
            &password_hash,
            request.metadata.user_type,
            metadata,
        );
        if !self.auto_confirm {
            account = account.unconfirmed();
        }

        let id = accounts::insert_account(self.db.clone(), account)
            .await
            .map_err(|e| ServiceError::new(e.to_string()).with_status(422))?;
        tracing::info!("Registered local account {} ({})", id, request.metadata.user_type);

        if !self.auto_confirm {
            tracing::info!(
                "Confirmation required for {}; link would redirect to {}",
                request.email,
                request.redirect_to
            );
            return Ok(None);
        }

        let user = found(accounts::get_user(self.db.clone(), id).await?)?;
        let session = self.open_session(user).await?;
        self.set_current(Some(session.clone()));
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(Some(session))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ServiceError> {
        let invalid = || ServiceError::new("Invalid login credentials").with_status(400);

        let stored = accounts::find_user_by_email(self.db.clone(), email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &stored.password_hash) {
            return Err(invalid());
        }
        if !stored.email_confirmed {
            return Err(ServiceError::new("Email not confirmed").with_status(400));
        }

        let session = self.open_session(stored.user).await?;
        self.set_current(Some(session.clone()));
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn oauth_authorize_url(&self, provider: &str, _redirect_to: &str) -> Result<String, ServiceError> {
        Err(ServiceError::new(format!(
            "Unsupported provider: {} is not enabled",
            provider
        ))
        .with_status(400))
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        if let Some(session) = self.current_session() {
            accounts::delete_session(self.db.clone(), &session.access_token).await?;
        }
        self.set_current(None);
        self.events.publish(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ServiceError> {
        // Unknown addresses succeed too, so the response does not reveal accounts
        if accounts::find_user_by_email(self.db.clone(), email).await?.is_some() {
            tracing::info!("Password recovery for {} would redirect to {}", email, redirect_to);
        }
        Ok(())
    }

    async fn update_user_password(&self, password: &str) -> Result<AuthUser, ServiceError> {
        let session = self
            .current_session()
            .ok_or_else(|| ServiceError::new("Auth session missing!").with_status(401))?;

        let password_hash = hash_password(password)?;
        accounts::update_password_hash(self.db.clone(), session.user.id, &password_hash).await?;
        self.events.publish(AuthEvent::UserUpdated, Some(session.clone()));
        Ok(session.user)
    }

    async fn restore_session(
        &self,
        session: Option<AuthSession>,
    ) -> Result<Option<AuthSession>, ServiceError> {
        let mut restored = None;
        if let Some(session) = session {
            let now = chrono::Utc::now().timestamp();
            let stored = accounts::find_session(self.db.clone(), &session.access_token).await?;
            if let Some(stored) = stored.filter(|s| s.expires_at > now) {
                if let Some(user) = accounts::get_user(self.db.clone(), stored.user_id).await? {
                    restored = Some(AuthSession {
                        access_token: session.access_token,
                        refresh_token: Some(stored.refresh_token),
                        expires_at: Some(stored.expires_at),
                        user,
                    });
                }
            } else {
                tracing::debug!("Persisted session is no longer valid");
            }
        }

        self.set_current(restored.clone());
        self.events.publish(AuthEvent::InitialSession, restored.clone());
        Ok(restored)
    }

    fn events(&self) -> &AuthEventBus {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;
    use shared_types::{UserKind, UserMetadata};

    fn candidate_sign_up(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "segredo123".to_string(),
            metadata: UserMetadata {
                user_type: UserKind::Candidate,
                full_name: Some("Ana Sato".to_string()),
                company_name: None,
                responsible_name: None,
            },
            redirect_to: "http://localhost:8080/dashboard".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);
        let mut events = backend.events().subscribe();

        let session = backend.sign_up(&candidate_sign_up("ana@example.com")).await.unwrap();
        assert!(session.is_some());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedIn);

        let err = backend
            .sign_in_with_password("ana@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid login credentials");

        let session = backend
            .sign_in_with_password("ana@example.com", "segredo123")
            .await
            .unwrap();
        assert_eq!(session.user.user_kind(), Some(UserKind::Candidate));

        let account = backend.fetch_account(session.user.id).await.unwrap();
        assert_eq!(account.user_kind, UserKind::Candidate);
    }

    #[tokio::test]
    async fn test_unconfirmed_account_cannot_sign_in() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), false);

        assert!(backend.sign_up(&candidate_sign_up("ana@example.com")).await.unwrap().is_none());
        let err = backend
            .sign_in_with_password("ana@example.com", "segredo123")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Email not confirmed");
    }

    #[tokio::test]
    async fn test_missing_profile_is_no_rows() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);
        let err = backend.fetch_company_profile(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_no_rows());
    }

    #[tokio::test]
    async fn test_upsert_requires_owner_session() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);
        let payload = CandidateProfileUpsert {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let err = backend.upsert_candidate_profile(&payload).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("42501"));
    }

    #[tokio::test]
    async fn test_restore_session_publishes_initial_session() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);
        let session = backend
            .sign_up(&candidate_sign_up("ana@example.com"))
            .await
            .unwrap()
            .unwrap();

        let fresh = LocalBackend::new(db.async_connection.clone(), true);
        let mut events = fresh.events().subscribe();
        let restored = fresh.restore_session(Some(session.clone())).await.unwrap();
        assert_eq!(restored.map(|s| s.user.id), Some(session.user.id));

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::InitialSession);
        assert!(change.session.is_some());

        let mut bogus = session;
        bogus.access_token = "expired".to_string();
        assert!(fresh.restore_session(Some(bogus)).await.unwrap().is_none());
    }
}
