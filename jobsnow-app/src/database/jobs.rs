use crate::database::rows::TableSpec;
use crate::database::{now_timestamp, AsyncDbConnection};
use anyhow::Result;
use serde_json::{Map, Value as JsonValue};
use shared_types::{CompanyListing, CreateJobRequest, Job, JobListing};
use std::collections::HashMap;
use uuid::Uuid;

use super::profiles::COMPANY_PROFILES;

pub const JOBS: TableSpec = TableSpec {
    name: "jobs",
    columns: &[
        "id",
        "company_id",
        "title",
        "description",
        "requirements",
        "location",
        "job_type",
        "sector",
        "salary_min",
        "salary_max",
        "is_active",
        "created_at",
        "updated_at",
    ],
    bool_columns: &["is_active"],
    json_columns: &[],
};

/// Publish a job. `created_at` defaults to now.
pub async fn insert_job(
    conn: AsyncDbConnection,
    request: &CreateJobRequest,
    created_at: Option<&str>,
) -> Result<Job> {
    let id = Uuid::new_v4();
    let created_at = created_at.map(str::to_string).unwrap_or_else(now_timestamp);
    let conn = conn.lock().await?;

    conn.execute(
        "INSERT INTO jobs
         (id, company_id, title, description, requirements, location, job_type, sector,
          salary_min, salary_max, is_active, created_at, updated_at)
          VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id.to_string(),
            request.company_id.to_string(),
            &request.title,
            &request.description,
            request.requirements.as_ref(),
            &request.location,
            request.job_type.as_str(),
            request.sector.map(|sector| sector.as_str()),
            request.salary_min,
            request.salary_max,
            request.is_active,
            &created_at,
            &created_at
        ],
    )?;

    let row = super::rows::fetch_by_id(&conn, &JOBS, &id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Job {} vanished after insert", id))?;
    Ok(serde_json::from_value(row)?)
}

pub async fn list_active_jobs(conn: AsyncDbConnection) -> Result<Vec<JobListing>> {
    let conn = conn.lock().await?;
    let sql = format!(
        "SELECT {}, c.id, c.company_name, c.logo_url
         FROM jobs j
         LEFT JOIN company_profiles c ON c.id = j.company_id
         WHERE j.is_active = 1
         ORDER BY j.created_at DESC",
        JOBS.select_list("j")
    );
    let offset = JOBS.columns.len();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let mut object = JOBS.row_to_json(row, 0)?;
            let company_id: Option<String> = row.get(offset)?;
            let company = match company_id {
                Some(_) => serde_json::json!({
                    "company_name": row.get::<_, Option<String>>(offset + 1)?,
                    "logo_url": row.get::<_, Option<String>>(offset + 2)?,
                }),
                None => JsonValue::Null,
            };
            object.insert("company_profiles".to_string(), company);
            Ok(object)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    decode_rows(rows)
}

pub async fn list_named_companies(conn: AsyncDbConnection) -> Result<Vec<CompanyListing>> {
    let conn = conn.lock().await?;

    let mut jobs_by_company: HashMap<String, Vec<JsonValue>> = HashMap::new();
    {
        let mut stmt = conn.prepare("SELECT company_id, id, title, is_active FROM jobs")?;
        let jobs = stmt.query_map([], |row| {
            let company_id: String = row.get(0)?;
            let summary = serde_json::json!({
                "id": row.get::<_, String>(1)?,
                "title": row.get::<_, String>(2)?,
                "is_active": row.get::<_, Option<bool>>(3)?.unwrap_or(false),
            });
            Ok((company_id, summary))
        })?;
        for job in jobs {
            let (company_id, summary) = job?;
            jobs_by_company.entry(company_id).or_default().push(summary);
        }
    }

    let sql = format!(
        "SELECT {} FROM company_profiles c
         WHERE c.company_name IS NOT NULL
         ORDER BY c.created_at DESC",
        COMPANY_PROFILES.select_list("c")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| COMPANY_PROFILES.row_to_json(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;

    let rows = rows
        .into_iter()
        .map(|mut object| {
            let jobs = object
                .get("id")
                .and_then(|id| id.as_str())
                .and_then(|id| jobs_by_company.remove(id))
                .unwrap_or_default();
            object.insert("jobs".to_string(), JsonValue::Array(jobs));
            object
        })
        .collect();

    decode_rows(rows)
}

fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Map<String, JsonValue>>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(JsonValue::Object(row))
                .map_err(|e| anyhow::anyhow!("Failed to decode row: {}", e))
        })
        .collect()
}
