use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{
    Account, AuthEvent, AuthSession, AuthUser, CandidateProfile, CandidateProfileUpsert,
    CompanyListing, CompanyProfile, CompanyProfileUpsert, ErrorResponse, JobListing,
};
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

use super::{AuthEventBus, DataService, IdentityService, SignUpRequest};
use crate::config::SupabaseConfig;
use crate::error::ServiceError;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

const JOBS_SELECT: &str = "*,company_profiles(company_name,logo_url)";
const COMPANIES_SELECT: &str = "*,jobs(id,title,is_active)";

/// Error body of the identity endpoints. Older deployments use
/// `error_description`, newer ones `msg`.
#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

/// Client for a hosted PostgREST (`/rest/v1`) + GoTrue (`/auth/v1`) project.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    events: AuthEventBus,
    current: RwLock<Option<AuthSession>>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base = format!("{}/", config.url.trim_end_matches('/'));
        let base_url = Url::parse(&base)
            .map_err(|e| ServiceError::new(format!("Invalid backend url {}: {}", config.url, e)))?;

        Ok(Self {
            http,
            base_url,
            anon_key: config.anon_key.clone(),
            events: AuthEventBus::new(),
            current: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ServiceError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ServiceError::new(format!("Invalid endpoint {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub fn rest_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, ServiceError> {
        self.endpoint(&format!("rest/v1/{}", table), query)
    }

    pub fn auth_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ServiceError> {
        self.endpoint(&format!("auth/v1/{}", path), query)
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

    /// User token when signed in, anon key otherwise
    fn bearer(&self) -> String {
        self.current_session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn fetch_single<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<T, ServiceError> {
        let filter = format!("eq.{}", id);
        let url = self.rest_url(table, &[("select", "*"), ("id", &filter)])?;
        let response = self
            .request(Method::GET, url)
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ServiceError> {
        let url = self.rest_url(table, query)?;
        let response = self.request(Method::GET, url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, payload: &T) -> Result<(), ServiceError> {
        let url = self.rest_url(table, &[])?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", UPSERT_PREFERENCE)
            .json(payload)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, ServiceError> {
        let url = self.auth_url("token", &[("grant_type", "refresh_token")])?;
        let response = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, ServiceError> {
        let url = self.auth_url("user", &[])?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Pass successful responses through, turn everything else into a
/// [`ServiceError`] carrying the backend's code and message.
async fn check(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(parse_error(status, &body))
}

pub(crate) fn parse_error(status: StatusCode, body: &str) -> ServiceError {
    if let Ok(rest) = serde_json::from_str::<ErrorResponse>(body) {
        let mut error = match rest.code {
            Some(code) => ServiceError::with_code(code, rest.message),
            None => ServiceError::new(rest.message),
        };
        error.status = Some(status.as_u16());
        return error;
    }

    if let Ok(identity) = serde_json::from_str::<IdentityErrorBody>(body) {
        let message = identity
            .msg
            .or(identity.message)
            .or(identity.error_description);
        if let Some(message) = message {
            let mut error = ServiceError::new(message).with_status(status.as_u16());
            error.code = identity.error_code;
            return error;
        }
    }

    let message = if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    };
    ServiceError::new(message).with_status(status.as_u16())
}

/// Sign-up answers with a full session when confirmation is off and with the
/// bare user otherwise.
pub(crate) fn session_from_sign_up(body: serde_json::Value) -> Option<AuthSession> {
    if body.get("access_token").is_some() {
        serde_json::from_value(body).ok()
    } else {
        None
    }
}

#[async_trait]
impl DataService for SupabaseClient {
    async fn fetch_account(&self, id: Uuid) -> Result<Account, ServiceError> {
        self.fetch_single("profiles", id).await
    }

    async fn fetch_candidate_profile(&self, id: Uuid) -> Result<CandidateProfile, ServiceError> {
        self.fetch_single("candidate_profiles", id).await
    }

    async fn upsert_candidate_profile(
        &self,
        payload: &CandidateProfileUpsert,
    ) -> Result<(), ServiceError> {
        self.upsert("candidate_profiles", payload).await
    }

    async fn fetch_company_profile(&self, id: Uuid) -> Result<CompanyProfile, ServiceError> {
        self.fetch_single("company_profiles", id).await
    }

    async fn upsert_company_profile(
        &self,
        payload: &CompanyProfileUpsert,
    ) -> Result<(), ServiceError> {
        self.upsert("company_profiles", payload).await
    }

    async fn list_active_jobs(&self) -> Result<Vec<JobListing>, ServiceError> {
        self.fetch_list(
            "jobs",
            &[
                ("select", JOBS_SELECT),
                ("is_active", "eq.true"),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }

    async fn list_named_companies(&self) -> Result<Vec<CompanyListing>, ServiceError> {
        self.fetch_list(
            "company_profiles",
            &[
                ("select", COMPANIES_SELECT),
                ("company_name", "not.is.null"),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }
}

#[async_trait]
impl IdentityService for SupabaseClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<AuthSession>, ServiceError> {
        let url = self.auth_url("signup", &[("redirect_to", &request.redirect_to)])?;
        let response = self
            .request(Method::POST, url)
            .json(&serde_json::json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
            .send()
            .await?;
        let body: serde_json::Value = check(response).await?.json().await?;

        let session = session_from_sign_up(body);
        if let Some(session) = &session {
            self.set_current(Some(session.clone()));
            self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        }
        Ok(session)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ServiceError> {
        let url = self.auth_url("token", &[("grant_type", "password")])?;
        let response = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: AuthSession = check(response).await?.json().await?;

        self.set_current(Some(session.clone()));
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> Result<String, ServiceError> {
        let url = self.auth_url(
            "authorize",
            &[("provider", provider), ("redirect_to", redirect_to)],
        )?;
        Ok(url.to_string())
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let result = match self.current_session() {
            Some(session) => {
                let url = self.auth_url("logout", &[])?;
                let response = self
                    .http
                    .post(url)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&session.access_token)
                    .send()
                    .await;
                match response {
                    Ok(response) => check(response).await.map(|_| ()),
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };

        // The local session is dropped even when the server call fails
        self.set_current(None);
        self.events.publish(AuthEvent::SignedOut, None);
        result
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ServiceError> {
        let url = self.auth_url("recover", &[("redirect_to", redirect_to)])?;
        let response = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update_user_password(&self, password: &str) -> Result<AuthUser, ServiceError> {
        let mut session = self
            .current_session()
            .ok_or_else(|| ServiceError::new("Auth session missing!").with_status(401))?;

        let url = self.auth_url("user", &[])?;
        let response = self
            .request(Method::PUT, url)
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await?;
        let user: AuthUser = check(response).await?.json().await?;

        session.user = user.clone();
        self.set_current(Some(session.clone()));
        self.events.publish(AuthEvent::UserUpdated, Some(session));
        Ok(user)
    }

    async fn restore_session(
        &self,
        session: Option<AuthSession>,
    ) -> Result<Option<AuthSession>, ServiceError> {
        let Some(session) = session else {
            self.set_current(None);
            self.events.publish(AuthEvent::InitialSession, None);
            return Ok(None);
        };

        let now = chrono::Utc::now().timestamp();
        let (restored, refreshed) = if session.is_expired(now) {
            match session.refresh_token.clone() {
                Some(token) => match self.refresh(&token).await {
                    Ok(fresh) => (Some(fresh), true),
                    Err(e) if e.rejects_credentials() => {
                        tracing::warn!("Persisted session could not be refreshed: {}", e);
                        (None, false)
                    }
                    Err(e) => {
                        tracing::warn!("Keeping persisted session, refresh unavailable: {}", e);
                        (Some(session), false)
                    }
                },
                None => (None, false),
            }
        } else {
            match self.fetch_user(&session.access_token).await {
                Ok(user) => (Some(AuthSession { user, ..session }), false),
                Err(e) if e.rejects_credentials() => {
                    tracing::warn!("Persisted session rejected: {}", e);
                    (None, false)
                }
                Err(e) => {
                    tracing::warn!("Keeping persisted session, identity service unavailable: {}", e);
                    (Some(session), false)
                }
            }
        };

        self.set_current(restored.clone());
        self.events.publish(AuthEvent::InitialSession, restored.clone());
        if refreshed {
            self.events.publish(AuthEvent::TokenRefreshed, restored.clone());
        }
        Ok(restored)
    }

    fn events(&self) -> &AuthEventBus {
        &self.events
    }
}
