use crate::database::rows::{self, TableSpec};
use crate::database::AsyncDbConnection;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{CandidateProfile, CandidateProfileUpsert, CompanyProfile, CompanyProfileUpsert};
use uuid::Uuid;

pub const CANDIDATE_PROFILES: TableSpec = TableSpec {
    name: "candidate_profiles",
    columns: &[
        "id",
        "full_name",
        "phone",
        "address",
        "birth_date",
        "nationality",
        "ancestry",
        "bio",
        "languages",
        "resume_url",
        "is_profile_complete",
        "created_at",
        "updated_at",
    ],
    bool_columns: &["is_profile_complete"],
    json_columns: &["languages"],
};

pub const COMPANY_PROFILES: TableSpec = TableSpec {
    name: "company_profiles",
    columns: &[
        "id",
        "company_name",
        "responsible_name",
        "phone",
        "address",
        "website",
        "cnpj",
        "sector",
        "employee_count",
        "founded_year",
        "description",
        "logo_url",
        "is_verified",
        "is_profile_complete",
        "created_at",
        "updated_at",
    ],
    bool_columns: &["is_verified", "is_profile_complete"],
    json_columns: &[],
};

async fn get_profile<T: DeserializeOwned>(
    conn: AsyncDbConnection,
    table: &TableSpec,
    id: Uuid,
) -> Result<Option<T>> {
    let conn = conn.lock().await?;
    match rows::fetch_by_id(&conn, table, &id.to_string())? {
        Some(row) => Ok(Some(serde_json::from_value(row).map_err(|e| {
            anyhow::anyhow!("Failed to decode {} row: {}", table.name, e)
        })?)),
        None => Ok(None),
    }
}

async fn upsert_profile<T: Serialize>(
    conn: AsyncDbConnection,
    table: &TableSpec,
    payload: &T,
) -> Result<()> {
    let serde_json::Value::Object(payload) = serde_json::to_value(payload)? else {
        anyhow::bail!("{} payload must serialize to an object", table.name);
    };
    let conn = conn.lock().await?;
    rows::upsert(&conn, table, &payload)
}

pub async fn get_candidate_profile(
    conn: AsyncDbConnection,
    id: Uuid,
) -> Result<Option<CandidateProfile>> {
    get_profile(conn, &CANDIDATE_PROFILES, id).await
}

pub async fn upsert_candidate_profile(
    conn: AsyncDbConnection,
    payload: &CandidateProfileUpsert,
) -> Result<()> {
    upsert_profile(conn, &CANDIDATE_PROFILES, payload).await
}

pub async fn get_company_profile(
    conn: AsyncDbConnection,
    id: Uuid,
) -> Result<Option<CompanyProfile>> {
    get_profile(conn, &COMPANY_PROFILES, id).await
}

pub async fn upsert_company_profile(
    conn: AsyncDbConnection,
    payload: &CompanyProfileUpsert,
) -> Result<()> {
    upsert_profile(conn, &COMPANY_PROFILES, payload).await
}
