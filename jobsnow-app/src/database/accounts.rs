use crate::database::rows::{self, TableSpec};
use crate::database::AsyncDbConnection;
use anyhow::Result;
use rusqlite::OptionalExtension;
use shared_types::{Account, AuthUser, UserKind};
use uuid::Uuid;

pub const PROFILES: TableSpec = TableSpec {
    name: "profiles",
    columns: &["id", "email", "user_type", "created_at"],
    bool_columns: &[],
    json_columns: &[],
};

/// Message the hosted identity service returns for a duplicate sign-up.
pub const ALREADY_REGISTERED: &str = "User already registered";

pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub user_kind: UserKind,
    pub metadata: serde_json::Value,
    pub confirmed: bool,
}

impl NewAccount {
    pub fn new(
        email: &str,
        password_hash: &str,
        user_kind: UserKind,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password_hash: password_hash.to_string(),
            user_kind,
            metadata,
            confirmed: true,
        }
    }

    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }
}

pub struct StoredUser {
    pub user: AuthUser,
    pub password_hash: String,
    pub email_confirmed: bool,
}

/// Create the identity, its `profiles` row and the empty profile row for its
/// kind, seeded with the names given at sign-up.
pub async fn insert_account(conn: AsyncDbConnection, account: NewAccount) -> Result<Uuid> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;

    let exists: Option<String> = tx
        .query_row(
            "SELECT id FROM auth_users WHERE email = ?",
            [&account.email],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        anyhow::bail!(ALREADY_REGISTERED);
    }

    let id = Uuid::new_v4();
    let now = chrono::Utc::now().timestamp();
    let confirmed_at = account.confirmed.then_some(now);
    let metadata = &account.metadata;

    tx.execute(
        "INSERT INTO auth_users (id, email, password_hash, user_metadata, email_confirmed_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id.to_string(),
            &account.email,
            &account.password_hash,
            metadata.to_string(),
            confirmed_at,
            now
        ],
    )?;

    tx.execute(
        "INSERT INTO profiles (id, email, user_type) VALUES (?, ?, ?)",
        rusqlite::params![id.to_string(), &account.email, account.user_kind.as_str()],
    )?;

    let text = |key: &str| metadata.get(key).and_then(|v| v.as_str()).map(str::to_string);
    match account.user_kind {
        UserKind::Candidate => {
            tx.execute(
                "INSERT INTO candidate_profiles (id, full_name) VALUES (?, ?)",
                rusqlite::params![id.to_string(), text("full_name")],
            )?;
        }
        UserKind::Company => {
            tx.execute(
                "INSERT INTO company_profiles (id, company_name, responsible_name) VALUES (?, ?, ?)",
                rusqlite::params![id.to_string(), text("company_name"), text("responsible_name")],
            )?;
        }
    }

    tx.commit()?;
    Ok(id)
}

fn parse_user(id: String, email: String, metadata: String) -> rusqlite::Result<AuthUser> {
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AuthUser {
        id,
        email: Some(email),
        user_metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

pub async fn find_user_by_email(conn: AsyncDbConnection, email: &str) -> Result<Option<StoredUser>> {
    let conn = conn.lock().await?;
    conn.query_row(
        "SELECT id, email, user_metadata, password_hash, email_confirmed_at
         FROM auth_users WHERE email = ?",
        [email.trim().to_lowercase()],
        |row| {
            Ok(StoredUser {
                user: parse_user(row.get(0)?, row.get(1)?, row.get(2)?)?,
                password_hash: row.get(3)?,
                email_confirmed: row.get::<_, Option<i64>>(4)?.is_some(),
            })
        },
    )
    .optional()
    .map_err(|e| anyhow::anyhow!("Failed to look up user: {}", e))
}

pub async fn get_user(conn: AsyncDbConnection, id: Uuid) -> Result<Option<AuthUser>> {
    let conn = conn.lock().await?;
    conn.query_row(
        "SELECT id, email, user_metadata FROM auth_users WHERE id = ?",
        [id.to_string()],
        |row| parse_user(row.get(0)?, row.get(1)?, row.get(2)?),
    )
    .optional()
    .map_err(|e| anyhow::anyhow!("Failed to get user: {}", e))
}

pub async fn update_password_hash(conn: AsyncDbConnection, id: Uuid, hash: &str) -> Result<()> {
    let conn = conn.lock().await?;
    let updated = conn.execute(
        "UPDATE auth_users SET password_hash = ? WHERE id = ?",
        rusqlite::params![hash, id.to_string()],
    )?;
    if updated == 0 {
        anyhow::bail!("User not found");
    }
    Ok(())
}

pub async fn get_account(conn: AsyncDbConnection, id: Uuid) -> Result<Option<Account>> {
    let conn = conn.lock().await?;
    match rows::fetch_by_id(&conn, &PROFILES, &id.to_string())? {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

pub struct StoredSession {
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: i64,
}

pub async fn insert_session(
    conn: AsyncDbConnection,
    user_id: Uuid,
    access_token: &str,
    refresh_token: &str,
    expires_at: i64,
) -> Result<()> {
    let conn = conn.lock().await?;
    conn.execute(
        "INSERT INTO auth_sessions (access_token, user_id, refresh_token, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![
            access_token,
            user_id.to_string(),
            refresh_token,
            expires_at,
            chrono::Utc::now().timestamp()
        ],
    )?;
    Ok(())
}

pub async fn find_session(conn: AsyncDbConnection, access_token: &str) -> Result<Option<StoredSession>> {
    let conn = conn.lock().await?;
    let row: Option<(String, String, i64)> = conn
        .query_row(
            "SELECT user_id, refresh_token, expires_at FROM auth_sessions WHERE access_token = ?",
            [access_token],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match row {
        Some((user_id, refresh_token, expires_at)) => Ok(Some(StoredSession {
            user_id: Uuid::parse_str(&user_id)?,
            refresh_token,
            expires_at,
        })),
        None => Ok(None),
    }
}

pub async fn delete_session(conn: AsyncDbConnection, access_token: &str) -> Result<()> {
    let conn = conn.lock().await?;
    conn.execute("DELETE FROM auth_sessions WHERE access_token = ?", [access_token])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::profiles::get_candidate_profile;
    use crate::database::test_database;

    #[tokio::test]
    async fn test_insert_account_seeds_profile_rows() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let id = insert_account(
            conn.clone(),
            NewAccount::new(
                "Ana@Example.com",
                "hash",
                UserKind::Candidate,
                serde_json::json!({ "user_type": "candidate", "full_name": "Ana Sato" }),
            ),
        )
        .await
        .unwrap();

        let account = get_account(conn.clone(), id).await.unwrap().unwrap();
        assert_eq!(account.email, "ana@example.com");
        assert_eq!(account.user_kind, UserKind::Candidate);

        let profile = get_candidate_profile(conn.clone(), id).await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Ana Sato"));
        assert!(!profile.is_profile_complete);

        let stored = find_user_by_email(conn, "ana@example.com").await.unwrap().unwrap();
        assert_eq!(stored.user.user_kind(), Some(UserKind::Candidate));
        assert!(stored.email_confirmed);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let account = || NewAccount::new("rh@kobe.jp", "hash", UserKind::Company, serde_json::json!({}));

        insert_account(conn.clone(), account()).await.unwrap();
        let err = insert_account(conn, account()).await.unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }
}
