use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::UserKind;

/// Metadata attached to an identity at sign-up time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct UserMetadata {
    pub user_type: UserKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Account kind recorded at sign-up, if the identity carries one.
    pub fn user_kind(&self) -> Option<UserKind> {
        self.user_metadata
            .get("user_type")
            .and_then(|value| value.as_str())
            .and_then(|kind| kind.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is rejected
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One notification on the auth-change stream.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_event_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuthEvent::InitialSession).unwrap(),
            "\"INITIAL_SESSION\""
        );
        assert_eq!(
            serde_json::to_string(&AuthEvent::PasswordRecovery).unwrap(),
            "\"PASSWORD_RECOVERY\""
        );
    }

    #[test]
    fn test_user_kind_from_metadata() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("empresa@example.com".to_string()),
            user_metadata: serde_json::json!({ "user_type": "company", "company_name": "Kobe Log" }),
        };
        assert_eq!(user.user_kind(), Some(UserKind::Company));

        let anonymous = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            user_metadata: serde_json::Value::Null,
        };
        assert_eq!(anonymous.user_kind(), None);
    }
}
