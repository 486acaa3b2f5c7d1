use crate::database::accounts::{self, NewAccount};
use crate::database::{jobs, profiles, AsyncDbConnection};
use crate::helpers::password::hash_password;
use anyhow::Result;
use shared_types::{CompanyProfileUpsert, CreateJobRequest, JobType, Sector, UserKind};

/// Password of every demo account
pub const DEMO_PASSWORD: &str = "jobsnow123";

struct DemoCompany {
    email: &'static str,
    name: &'static str,
    responsible: &'static str,
    sector: Sector,
    address: &'static str,
    description: &'static str,
    jobs: &'static [DemoJob],
}

struct DemoJob {
    title: &'static str,
    description: &'static str,
    location: &'static str,
    job_type: JobType,
    salary: (Option<i64>, Option<i64>),
}

const DEMO_COMPANIES: &[DemoCompany] = &[
    DemoCompany {
        email: "rh@hamamatsu-parts.example",
        name: "Hamamatsu Parts",
        responsible: "Kenji Watanabe",
        sector: Sector::Manufacturing,
        address: "Hamamatsu, Shizuoka",
        description: "Autopeças para montadoras da região de Tokai.",
        jobs: &[
            DemoJob {
                title: "Operador de Empilhadeira",
                description: "Turno noturno, licença de empilhadeira exigida.",
                location: "Hamamatsu, Shizuoka",
                job_type: JobType::FullTime,
                salary: (Some(250_000), Some(320_000)),
            },
            DemoJob {
                title: "Inspetor de Qualidade",
                description: "Inspeção visual de peças estampadas.",
                location: "Iwata, Shizuoka",
                job_type: JobType::Contract,
                salary: (Some(1_300), None),
            },
        ],
    },
    DemoCompany {
        email: "contato@sakura-bento.example",
        name: "Sakura Bento",
        responsible: "Ana Tanaka",
        sector: Sector::Food,
        address: "Oizumi, Gunma",
        description: "Bentôs e marmitas brasileiras com entrega.",
        jobs: &[DemoJob {
            title: "Auxiliar de Cozinha",
            description: "Preparo de marmitas, meio período pela manhã.",
            location: "Oizumi, Gunma",
            job_type: JobType::PartTime,
            salary: (None, Some(1_150)),
        }],
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub companies: usize,
    pub jobs: usize,
    pub skipped: usize,
}

/// Create demo companies with complete profiles and a few open jobs. Accounts
/// that already exist are skipped, so seeding twice is harmless.
pub async fn seed_demo_data(conn: AsyncDbConnection) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for company in DEMO_COMPANIES {
        if accounts::find_user_by_email(conn.clone(), company.email)
            .await?
            .is_some()
        {
            summary.skipped += 1;
            continue;
        }

        let metadata = serde_json::json!({
            "user_type": "company",
            "company_name": company.name,
            "responsible_name": company.responsible,
        });
        let password_hash = hash_password(DEMO_PASSWORD)?;
        let id = accounts::insert_account(
            conn.clone(),
            NewAccount::new(
                company.email,
                &password_hash,
                UserKind::Company,
                metadata,
            ),
        )
        .await?;

        profiles::upsert_company_profile(
            conn.clone(),
            &CompanyProfileUpsert {
                id,
                address: Some(company.address.to_string()),
                sector: Some(company.sector),
                description: Some(company.description.to_string()),
                is_profile_complete: Some(true),
                ..Default::default()
            },
        )
        .await?;
        summary.companies += 1;

        for job in company.jobs {
            let request = CreateJobRequest {
                company_id: id,
                title: job.title.to_string(),
                description: job.description.to_string(),
                requirements: None,
                location: job.location.to_string(),
                job_type: job.job_type,
                sector: Some(company.sector),
                salary_min: job.salary.0,
                salary_max: job.salary.1,
                is_active: true,
            };
            jobs::insert_job(conn.clone(), &request, None).await?;
            summary.jobs += 1;
        }
    }

    tracing::info!(
        "Seeded {} companies and {} jobs ({} already present)",
        summary.companies,
        summary.jobs,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;

    #[tokio::test]
    async fn test_seed_is_repeatable() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let first = seed_demo_data(conn.clone()).await.unwrap();
        assert_eq!(first.companies, DEMO_COMPANIES.len());
        assert_eq!(first.jobs, 3);

        let second = seed_demo_data(conn.clone()).await.unwrap();
        assert_eq!(second.companies, 0);
        assert_eq!(second.skipped, DEMO_COMPANIES.len());

        let listed = jobs::list_active_jobs(conn.clone()).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|listing| listing.company_name().is_some()));

        let companies = jobs::list_named_companies(conn).await.unwrap();
        assert!(companies.iter().all(|company| company.company.is_profile_complete));
    }
}
