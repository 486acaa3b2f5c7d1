use shared_types::{AuthSession, UserKind};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::integrations::DataService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Jobs,
    Companies,
    About,
    CompleteProfile,
    ResetPassword,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Jobs,
        Route::Companies,
        Route::About,
        Route::CompleteProfile,
        Route::ResetPassword,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/registro",
            Route::Dashboard => "/dashboard",
            Route::Jobs => "/vagas",
            Route::Companies => "/empresas",
            Route::About => "/sobre",
            Route::CompleteProfile => "/complete-profile",
            Route::ResetPassword => "/reset-password",
            Route::NotFound => "*",
        }
    }

    /// Query string and trailing slash are ignored; anything unknown is
    /// [`Route::NotFound`].
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::ALL
            .iter()
            .find(|route| route.path() == path)
            .copied()
            .unwrap_or(Route::NotFound)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAccess {
    Redirect(Route),
    Allow(UserKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteProfileAccess {
    Redirect(Route),
    /// Show the onboarding flow for this kind. `None` when neither the account
    /// row nor the identity metadata names one.
    Onboard(Option<UserKind>),
}

/// Account kind from `profiles`, `Ok(None)` when the row does not exist.
async fn account_kind(data: &dyn DataService, id: Uuid) -> Result<Option<UserKind>, ServiceError> {
    match data.fetch_account(id).await {
        Ok(account) => Ok(Some(account.user_kind)),
        Err(e) if e.is_no_rows() => Ok(None),
        Err(e) => Err(e),
    }
}

/// A missing profile row counts as incomplete.
async fn is_profile_complete(data: &dyn DataService, kind: UserKind, id: Uuid) -> bool {
    let result = match kind {
        UserKind::Candidate => data
            .fetch_candidate_profile(id)
            .await
            .map(|profile| profile.is_profile_complete),
        UserKind::Company => data
            .fetch_company_profile(id)
            .await
            .map(|profile| profile.is_profile_complete),
    };
    match result {
        Ok(complete) => complete,
        Err(e) => {
            if !e.is_no_rows() {
                tracing::warn!("Error checking {} profile {}: {}", kind, id, e);
            }
            false
        }
    }
}

pub async fn dashboard_guard(
    data: &dyn DataService,
    session: Option<&AuthSession>,
) -> DashboardAccess {
    let Some(session) = session else {
        return DashboardAccess::Redirect(Route::Login);
    };
    let id = session.user.id;

    match account_kind(data, id).await {
        Err(e) => {
            tracing::error!("Error fetching profile: {}", e);
            DashboardAccess::Redirect(Route::Login)
        }
        Ok(None) => DashboardAccess::Redirect(Route::CompleteProfile),
        Ok(Some(kind)) => {
            if is_profile_complete(data, kind, id).await {
                DashboardAccess::Allow(kind)
            } else {
                DashboardAccess::Redirect(Route::CompleteProfile)
            }
        }
    }
}

pub async fn complete_profile_guard(
    data: &dyn DataService,
    session: Option<&AuthSession>,
) -> CompleteProfileAccess {
    let Some(session) = session else {
        return CompleteProfileAccess::Redirect(Route::Login);
    };
    let id = session.user.id;

    match account_kind(data, id).await {
        Err(e) => {
            tracing::error!("Error fetching profile: {}", e);
            CompleteProfileAccess::Redirect(Route::Login)
        }
        Ok(None) => CompleteProfileAccess::Onboard(session.user.user_kind()),
        Ok(Some(kind)) => {
            if is_profile_complete(data, kind, id).await {
                CompleteProfileAccess::Redirect(Route::Dashboard)
            } else {
                CompleteProfileAccess::Onboard(Some(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;
    use crate::integrations::local::LocalBackend;
    use crate::integrations::{IdentityService, SignUpRequest};
    use shared_types::{CandidateProfileUpsert, UserMetadata};

    #[test]
    fn test_paths_resolve_both_ways() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), route);
        }
        assert_eq!(Route::from_path("/dashboard?user_type=company"), Route::Dashboard);
        assert_eq!(Route::from_path("/vagas/"), Route::Jobs);
        assert_eq!(Route::from_path(""), Route::Home);
        assert_eq!(Route::from_path("/jobs"), Route::NotFound);
    }

    async fn signed_in_candidate(backend: &LocalBackend) -> AuthSession {
        let request = SignUpRequest {
            email: "maria@example.com".to_string(),
            password: "segredo123".to_string(),
            metadata: UserMetadata {
                user_type: UserKind::Candidate,
                full_name: Some("Maria Souza".to_string()),
                company_name: None,
                responsible_name: None,
            },
            redirect_to: "http://localhost:8080/dashboard".to_string(),
        };
        backend.sign_up(&request).await.unwrap();
        backend
            .sign_in_with_password("maria@example.com", "segredo123")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_guards_follow_profile_complete_flag() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);

        assert_eq!(
            dashboard_guard(&backend, None).await,
            DashboardAccess::Redirect(Route::Login)
        );
        assert_eq!(
            complete_profile_guard(&backend, None).await,
            CompleteProfileAccess::Redirect(Route::Login)
        );

        let session = signed_in_candidate(&backend).await;
        assert_eq!(
            dashboard_guard(&backend, Some(&session)).await,
            DashboardAccess::Redirect(Route::CompleteProfile)
        );
        assert_eq!(
            complete_profile_guard(&backend, Some(&session)).await,
            CompleteProfileAccess::Onboard(Some(UserKind::Candidate))
        );

        backend
            .upsert_candidate_profile(&CandidateProfileUpsert {
                id: session.user.id,
                is_profile_complete: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            dashboard_guard(&backend, Some(&session)).await,
            DashboardAccess::Allow(UserKind::Candidate)
        );
        assert_eq!(
            complete_profile_guard(&backend, Some(&session)).await,
            CompleteProfileAccess::Redirect(Route::Dashboard)
        );
    }

    #[tokio::test]
    async fn test_missing_account_goes_to_onboarding() {
        let (_dir, db) = test_database();
        let backend = LocalBackend::new(db.async_connection.clone(), true);
        let session = signed_in_candidate(&backend).await;

        let mut ghost = session.clone();
        ghost.user.id = Uuid::new_v4();
        ghost.user.user_metadata = serde_json::json!({ "user_type": "company" });

        assert_eq!(
            dashboard_guard(&backend, Some(&ghost)).await,
            DashboardAccess::Redirect(Route::CompleteProfile)
        );
        assert_eq!(
            complete_profile_guard(&backend, Some(&ghost)).await,
            CompleteProfileAccess::Onboard(Some(UserKind::Company))
        );
    }
}
