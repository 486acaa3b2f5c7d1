pub mod local;
pub mod supabase;

use async_trait::async_trait;
use shared_types::{
    Account, AuthChange, AuthEvent, AuthSession, AuthUser, CandidateProfile,
    CandidateProfileUpsert, CompanyListing, CompanyProfile, CompanyProfileUpsert, JobListing,
    UserMetadata,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ServiceError;

/// Row-level access to the hosted tables. Single-row fetches report a missing
/// row as [`ServiceError::no_rows`].
#[async_trait]
pub trait DataService: Send + Sync {
    async fn fetch_account(&self, id: Uuid) -> Result<Account, ServiceError>;

    async fn fetch_candidate_profile(&self, id: Uuid) -> Result<CandidateProfile, ServiceError>;

    async fn upsert_candidate_profile(
        &self,
        payload: &CandidateProfileUpsert,
    ) -> Result<(), ServiceError>;

    async fn fetch_company_profile(&self, id: Uuid) -> Result<CompanyProfile, ServiceError>;

    async fn upsert_company_profile(
        &self,
        payload: &CompanyProfileUpsert,
    ) -> Result<(), ServiceError>;

    /// Active jobs, newest first, with the publishing company's name and logo
    async fn list_active_jobs(&self) -> Result<Vec<JobListing>, ServiceError>;

    /// Companies that have a name, newest first, with their jobs
    async fn list_named_companies(&self) -> Result<Vec<CompanyListing>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub metadata: UserMetadata,
    pub redirect_to: String,
}

/// Identity provider. Every state change is also published on [`events`].
///
/// [`events`]: IdentityService::events
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Returns the new session, or `None` when the address must be confirmed first
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<AuthSession>, ServiceError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ServiceError>;

    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str)
        -> Result<String, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ServiceError>;

    async fn update_user_password(&self, password: &str) -> Result<AuthUser, ServiceError>;

    /// Adopt a previously persisted session and publish `INITIAL_SESSION`
    /// with whatever survived validation.
    async fn restore_session(
        &self,
        session: Option<AuthSession>,
    ) -> Result<Option<AuthSession>, ServiceError>;

    fn events(&self) -> &AuthEventBus;
}

/// Fan-out of auth state changes to every subscriber.
#[derive(Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthChange>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn publish(&self, event: AuthEvent, session: Option<AuthSession>) {
        tracing::debug!("Auth event {:?}", event);
        // No subscribers is fine
        let _ = self.sender.send(AuthChange { event, session });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.sender.subscribe()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bus_delivers_in_publish_order() {
        let bus = AuthEventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(AuthEvent::SignedIn, None);
        bus.publish(AuthEvent::SignedOut, None);

        for receiver in [&mut first, &mut second] {
            assert_eq!(receiver.recv().await.unwrap().event, AuthEvent::SignedIn);
            assert_eq!(receiver.recv().await.unwrap().event, AuthEvent::SignedOut);
        }
    }
}
