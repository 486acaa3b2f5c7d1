use shared_types::{CompanyListing, JobListing, JobType, Language, Sector};
use std::str::FromStr;
use std::sync::Arc;

use crate::integrations::DataService;
use crate::translations::TranslationStore;

pub const JOBS_SECTION: &str = "jobs";
pub const COMPANIES_SECTION: &str = "companies";
/// Job type and sector names shared by both listings
pub const LABELS_SECTION: &str = "labels";

/// Equality constraint on an enum column. The select inputs send `""` or
/// `"all"` for "no constraint".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFilter<T> {
    Any,
    Only(T),
}

impl<T> Default for EnumFilter<T> {
    fn default() -> Self {
        EnumFilter::Any
    }
}

impl<T: FromStr> EnumFilter<T> {
    pub fn parse(input: &str) -> Result<Self, T::Err> {
        match input.trim() {
            "" | "all" => Ok(EnumFilter::Any),
            value => value.parse().map(EnumFilter::Only),
        }
    }
}

impl<T: PartialEq> EnumFilter<T> {
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            EnumFilter::Any => true,
            EnumFilter::Only(expected) => value == Some(expected),
        }
    }
}

/// Case-insensitive substring test; a blank needle matches everything.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    /// Matched against title, description and company name
    pub search: String,
    pub location: String,
    pub job_type: EnumFilter<JobType>,
    pub sector: EnumFilter<Sector>,
}

impl JobFilter {
    pub fn matches(&self, listing: &JobListing) -> bool {
        let job = &listing.job;
        let search = self.search.trim().is_empty()
            || contains_ci(&job.title, &self.search)
            || contains_ci(&job.description, &self.search)
            || listing
                .company_name()
                .is_some_and(|name| contains_ci(name, &self.search));

        search
            && contains_ci(&job.location, &self.location)
            && self.job_type.matches(Some(&job.job_type))
            && self.sector.matches(job.sector.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyFilter {
    /// Matched against name and description
    pub search: String,
    pub sector: EnumFilter<Sector>,
}

impl CompanyFilter {
    pub fn matches(&self, listing: &CompanyListing) -> bool {
        let company = &listing.company;
        let search = self.search.trim().is_empty()
            || company
                .company_name
                .as_deref()
                .is_some_and(|name| contains_ci(name, &self.search))
            || company
                .description
                .as_deref()
                .is_some_and(|description| contains_ci(description, &self.search));

        search && self.sector.matches(company.sector.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Loading,
    /// Nothing to show, either because nothing was fetched or nothing matches
    Empty,
    Results(usize),
}

/// Fetched once, filtered on every read.
pub struct JobsView {
    data: Arc<dyn DataService>,
    translations: Arc<TranslationStore>,
    jobs: Option<Vec<JobListing>>,
    pub filter: JobFilter,
}

impl JobsView {
    pub fn new(data: Arc<dyn DataService>, translations: Arc<TranslationStore>) -> Self {
        Self {
            data,
            translations,
            jobs: None,
            filter: JobFilter::default(),
        }
    }

    pub async fn load(&mut self) {
        self.translations.request_section(JOBS_SECTION).await;
        self.translations.request_section(LABELS_SECTION).await;

        let jobs = match self.data.list_active_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!("Error fetching jobs: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Loaded {} jobs", jobs.len());
        self.jobs = Some(jobs);
    }

    pub fn visible(&self) -> Vec<&JobListing> {
        self.jobs
            .iter()
            .flatten()
            .filter(|listing| self.filter.matches(listing))
            .collect()
    }

    pub fn display_state(&self) -> DisplayState {
        match &self.jobs {
            None => DisplayState::Loading,
            Some(_) => match self.visible().len() {
                0 => DisplayState::Empty,
                n => DisplayState::Results(n),
            },
        }
    }
}

pub struct CompaniesView {
    data: Arc<dyn DataService>,
    translations: Arc<TranslationStore>,
    companies: Option<Vec<CompanyListing>>,
    pub filter: CompanyFilter,
}

impl CompaniesView {
    pub fn new(data: Arc<dyn DataService>, translations: Arc<TranslationStore>) -> Self {
        Self {
            data,
            translations,
            companies: None,
            filter: CompanyFilter::default(),
        }
    }

    pub async fn load(&mut self) {
        self.translations.request_section(COMPANIES_SECTION).await;
        self.translations.request_section(LABELS_SECTION).await;

        let companies = match self.data.list_named_companies().await {
            Ok(companies) => companies,
            Err(e) => {
                tracing::error!("Error fetching companies: {}", e);
                Vec::new()
            }
        };
        self.companies = Some(companies);
    }

    pub fn visible(&self) -> Vec<&CompanyListing> {
        self.companies
            .iter()
            .flatten()
            .filter(|listing| self.filter.matches(listing))
            .collect()
    }

    pub fn display_state(&self) -> DisplayState {
        match &self.companies {
            None => DisplayState::Loading,
            Some(_) => match self.visible().len() {
                0 => DisplayState::Empty,
                n => DisplayState::Results(n),
            },
        }
    }
}

fn group_thousands(value: i64, separator: char) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn yen(value: i64, language: Language) -> String {
    let separator = match language {
        Language::Pt => '.',
        Language::En | Language::Ja => ',',
    };
    format!("¥{}", group_thousands(value, separator))
}

/// `¥min - ¥max`, "from ¥min" or "up to ¥max"; zero counts as absent.
pub fn format_salary(
    min: Option<i64>,
    max: Option<i64>,
    translations: &TranslationStore,
) -> Option<String> {
    let language = translations.language();
    match (min.filter(|v| *v != 0), max.filter(|v| *v != 0)) {
        (Some(min), Some(max)) => Some(format!("{} - {}", yen(min, language), yen(max, language))),
        (Some(min), None) => Some(format!(
            "{} {}",
            translations.t(JOBS_SECTION, "salaryFrom"),
            yen(min, language)
        )),
        (None, Some(max)) => Some(format!(
            "{} {}",
            translations.t(JOBS_SECTION, "salaryUpTo"),
            yen(max, language)
        )),
        (None, None) => None,
    }
}

/// Localized job type, or the wire value when no label is loaded
pub fn job_type_label(job_type: JobType, translations: &TranslationStore) -> String {
    translations
        .lookup(LABELS_SECTION, &format!("jobType.{}", job_type))
        .unwrap_or_else(|| job_type.to_string())
}

pub fn sector_label(sector: Sector, translations: &TranslationStore) -> String {
    translations
        .lookup(LABELS_SECTION, &format!("sector.{}", sector))
        .unwrap_or_else(|| sector.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::jobs::insert_job;
    use crate::database::test_database;
    use crate::helpers::ClientStorage;
    use crate::integrations::local::LocalBackend;
    use crate::translations::testing::StaticSections;
    use chrono::Utc;
    use shared_types::{CompanyJobSummary, CompanyProfile, CreateJobRequest, Job, JobCompanySummary};
    use uuid::Uuid;

    fn listing(title: &str, location: &str, job_type: JobType, sector: Option<Sector>, company: &str) -> JobListing {
        JobListing {
            job: Job {
                id: Uuid::new_v4(),
                company_id: Uuid::new_v4(),
                title: title.to_string(),
                description: "Vaga com alojamento".to_string(),
                requirements: None,
                location: location.to_string(),
                job_type,
                sector,
                salary_min: None,
                salary_max: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            company_profiles: Some(JobCompanySummary {
                company_name: Some(company.to_string()),
                logo_url: None,
            }),
        }
    }

    fn company(name: &str, description: Option<&str>, sector: Option<Sector>) -> CompanyListing {
        CompanyListing {
            company: CompanyProfile {
                id: Uuid::new_v4(),
                company_name: Some(name.to_string()),
                responsible_name: None,
                phone: None,
                address: None,
                website: None,
                cnpj: None,
                sector,
                employee_count: None,
                founded_year: None,
                description: description.map(str::to_string),
                logo_url: None,
                is_verified: false,
                is_profile_complete: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            jobs: vec![
                CompanyJobSummary {
                    id: Uuid::new_v4(),
                    title: "A".to_string(),
                    is_active: true,
                },
                CompanyJobSummary {
                    id: Uuid::new_v4(),
                    title: "B".to_string(),
                    is_active: false,
                },
            ],
        }
    }

    #[test]
    fn test_job_filter_is_a_conjunction() {
        let forklift = listing("Operador de Empilhadeira", "Hamamatsu", JobType::FullTime, Some(Sector::Manufacturing), "Suzuki Parts");
        let cook = listing("Cozinheiro", "Tokyo", JobType::PartTime, Some(Sector::Food), "Sakura Foods");

        let mut filter = JobFilter {
            search: "suzuki".to_string(),
            ..Default::default()
        };
        assert!(filter.matches(&forklift));
        assert!(!filter.matches(&cook));

        filter.location = "tokyo".to_string();
        assert!(!filter.matches(&forklift));

        filter.search.clear();
        assert!(filter.matches(&cook));

        filter.job_type = EnumFilter::Only(JobType::FullTime);
        assert!(!filter.matches(&cook));

        filter.job_type = EnumFilter::parse("all").unwrap();
        filter.sector = EnumFilter::parse("").unwrap();
        assert!(filter.matches(&cook));
        assert!(EnumFilter::<Sector>::parse("mining").is_err());
    }

    #[test]
    fn test_company_filter_and_active_count() {
        let sakura = company("Sakura Foods", Some("Bentôs artesanais"), Some(Sector::Food));
        let mut filter = CompanyFilter {
            search: "BENTÔS".to_string(),
            sector: EnumFilter::Only(Sector::Food),
        };
        assert!(filter.matches(&sakura));
        filter.sector = EnumFilter::Only(Sector::It);
        assert!(!filter.matches(&sakura));
        assert_eq!(sakura.active_job_count(), 1);
    }

    fn translations(language_entries: &[(&str, &str)]) -> Arc<TranslationStore> {
        let source = StaticSections::default()
            .with(Language::Pt, JOBS_SECTION, &[("salaryFrom", "A partir de"), ("salaryUpTo", "Até")])
            .with(Language::Pt, LABELS_SECTION, language_entries);
        Arc::new(TranslationStore::new(
            Arc::new(source),
            Arc::new(ClientStorage::in_memory()),
            vec![JOBS_SECTION.to_string(), LABELS_SECTION.to_string()],
        ))
    }

    #[tokio::test]
    async fn test_salary_and_labels() {
        let store = translations(&[("jobType.full_time", "Tempo Integral")]);
        store.initialize().await;

        assert_eq!(
            format_salary(Some(250000), Some(1200000), &store).as_deref(),
            Some("¥250.000 - ¥1.200.000")
        );
        assert_eq!(format_salary(Some(900), None, &store).as_deref(), Some("A partir de ¥900"));
        assert_eq!(format_salary(Some(0), Some(3000), &store).as_deref(), Some("Até ¥3.000"));
        assert_eq!(format_salary(None, None, &store), None);

        assert_eq!(job_type_label(JobType::FullTime, &store), "Tempo Integral");
        assert_eq!(job_type_label(JobType::Freelance, &store), "freelance");
        assert_eq!(sector_label(Sector::It, &store), "IT");
    }

    #[tokio::test]
    async fn test_empty_fetch_shows_no_jobs_state() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let mut view = JobsView::new(backend, translations(&[]));

        assert_eq!(view.display_state(), DisplayState::Loading);
        view.load().await;
        assert_eq!(view.display_state(), DisplayState::Empty);
    }

    #[tokio::test]
    async fn test_jobs_view_filters_loaded_rows() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let backend = Arc::new(LocalBackend::new(conn.clone(), true));
        let company_id = crate::database::accounts::insert_account(
            conn.clone(),
            crate::database::accounts::NewAccount::new(
                "rh@suzuki.jp",
                "hash",
                shared_types::UserKind::Company,
                serde_json::json!({ "company_name": "Suzuki Parts" }),
            ),
        )
        .await
        .unwrap();

        for (title, job_type) in [("Soldador", JobType::FullTime), ("Inspetor", JobType::PartTime)] {
            insert_job(
                conn.clone(),
                &CreateJobRequest {
                    company_id,
                    title: title.to_string(),
                    description: "Fábrica".to_string(),
                    requirements: None,
                    location: "Iwata".to_string(),
                    job_type,
                    sector: Some(Sector::Manufacturing),
                    salary_min: None,
                    salary_max: None,
                    is_active: true,
                },
                None,
            )
            .await
            .unwrap();
        }

        let mut view = JobsView::new(backend, translations(&[]));
        view.load().await;
        assert_eq!(view.display_state(), DisplayState::Results(2));

        view.filter.search = "suzuki".to_string();
        view.filter.job_type = EnumFilter::Only(JobType::PartTime);
        let visible = view.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].job.title, "Inspetor");

        view.filter.location = "Osaka".to_string();
        assert_eq!(view.display_state(), DisplayState::Empty);
    }
}
