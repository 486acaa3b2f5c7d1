use async_trait::async_trait;
use chrono::NaiveDate;
use shared_types::{
    CandidateProfile, CandidateProfileUpsert, CompanyProfile, CompanyProfileUpsert, Sector,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ServiceError, ValidationError};
use crate::helpers::validation::{invalid, non_empty};
use crate::integrations::DataService;
use crate::notifications::{SharedNotifier, Toast};
use crate::onboarding::ProfileDraft;

/// Editable profile fields. `None` means unset and is never sent, so saving
/// never overwrites a stored value with an empty one.
#[async_trait]
pub trait ProfileForm: ProfileDraft {
    /// Field names in display order
    const FIELDS: &'static [&'static str];

    async fn fetch(data: &dyn DataService, id: Uuid) -> Result<Self, ServiceError>;

    async fn save(&self, data: &dyn DataService, id: Uuid) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSettings {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub ancestry: Option<String>,
    pub bio: Option<String>,
    pub languages: Option<Vec<String>>,
}

impl From<CandidateProfile> for CandidateSettings {
    fn from(profile: CandidateProfile) -> Self {
        Self {
            full_name: profile.full_name,
            phone: profile.phone,
            address: profile.address,
            birth_date: profile.birth_date,
            nationality: profile.nationality,
            ancestry: profile.ancestry,
            bio: profile.bio,
            languages: (!profile.languages.is_empty()).then_some(profile.languages),
        }
    }
}

impl CandidateSettings {
    pub fn to_upsert(&self, id: Uuid) -> CandidateProfileUpsert {
        CandidateProfileUpsert {
            id,
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            birth_date: self.birth_date,
            nationality: self.nationality.clone(),
            ancestry: self.ancestry.clone(),
            bio: self.bio.clone(),
            languages: self.languages.clone(),
            updated_at: Some(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

impl ProfileDraft for CandidateSettings {
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        let text = non_empty(Some(value));
        match name {
            "full_name" => self.full_name = text,
            "phone" => self.phone = text,
            "address" => self.address = text,
            "birth_date" => {
                self.birth_date = match text {
                    Some(date) => Some(
                        NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                            .map_err(|_| invalid(name, value))?,
                    ),
                    None => None,
                }
            }
            "nationality" => self.nationality = text,
            "ancestry" => self.ancestry = text,
            "bio" => self.bio = text,
            "languages" => {
                let languages: Vec<String> = value
                    .split(',')
                    .filter_map(|language| non_empty(Some(language)))
                    .collect();
                self.languages = (!languages.is_empty()).then_some(languages);
            }
            other => return Err(invalid(other, value)),
        }
        Ok(())
    }

    fn field_value(&self, name: &str) -> Option<String> {
        match name {
            "full_name" => self.full_name.clone(),
            "phone" => self.phone.clone(),
            "address" => self.address.clone(),
            "birth_date" => self.birth_date.map(|date| date.format("%Y-%m-%d").to_string()),
            "nationality" => self.nationality.clone(),
            "ancestry" => self.ancestry.clone(),
            "bio" => self.bio.clone(),
            "languages" => self.languages.as_ref().map(|languages| languages.join(", ")),
            _ => None,
        }
    }
}

#[async_trait]
impl ProfileForm for CandidateSettings {
    const FIELDS: &'static [&'static str] = &[
        "full_name",
        "phone",
        "address",
        "birth_date",
        "nationality",
        "ancestry",
        "bio",
        "languages",
    ];

    async fn fetch(data: &dyn DataService, id: Uuid) -> Result<Self, ServiceError> {
        Ok(data.fetch_candidate_profile(id).await?.into())
    }

    async fn save(&self, data: &dyn DataService, id: Uuid) -> Result<(), ServiceError> {
        data.upsert_candidate_profile(&self.to_upsert(id)).await
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanySettings {
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub cnpj: Option<String>,
    pub sector: Option<Sector>,
    pub employee_count: Option<i32>,
    pub founded_year: Option<i32>,
}

impl From<CompanyProfile> for CompanySettings {
    fn from(profile: CompanyProfile) -> Self {
        Self {
            company_name: profile.company_name,
            responsible_name: profile.responsible_name,
            phone: profile.phone,
            address: profile.address,
            website: profile.website,
            description: profile.description,
            cnpj: profile.cnpj,
            sector: profile.sector,
            employee_count: profile.employee_count,
            founded_year: profile.founded_year,
        }
    }
}

impl CompanySettings {
    pub fn to_upsert(&self, id: Uuid) -> CompanyProfileUpsert {
        CompanyProfileUpsert {
            id,
            company_name: self.company_name.clone(),
            responsible_name: self.responsible_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            website: self.website.clone(),
            cnpj: self.cnpj.clone(),
            sector: self.sector,
            employee_count: self.employee_count,
            founded_year: self.founded_year,
            description: self.description.clone(),
            ..Default::default()
        }
    }
}

fn parse_number(name: &str, value: &str) -> Result<Option<i32>, ValidationError> {
    match non_empty(Some(value)) {
        Some(number) => number
            .parse::<i32>()
            .ok()
            .filter(|number| *number > 0)
            .map(Some)
            .ok_or_else(|| invalid(name, value)),
        None => Ok(None),
    }
}

impl ProfileDraft for CompanySettings {
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        let text = non_empty(Some(value));
        match name {
            "company_name" => self.company_name = text,
            "responsible_name" => self.responsible_name = text,
            "phone" => self.phone = text,
            "address" => self.address = text,
            "website" => self.website = text,
            "description" => self.description = text,
            "cnpj" => self.cnpj = text,
            "sector" => {
                self.sector = match text {
                    Some(sector) => Some(sector.parse().map_err(|_| invalid(name, value))?),
                    None => None,
                }
            }
            "employee_count" => self.employee_count = parse_number(name, value)?,
            "founded_year" => self.founded_year = parse_number(name, value)?,
            other => return Err(invalid(other, value)),
        }
        Ok(())
    }

    fn field_value(&self, name: &str) -> Option<String> {
        match name {
            "company_name" => self.company_name.clone(),
            "responsible_name" => self.responsible_name.clone(),
            "phone" => self.phone.clone(),
            "address" => self.address.clone(),
            "website" => self.website.clone(),
            "description" => self.description.clone(),
            "cnpj" => self.cnpj.clone(),
            "sector" => self.sector.map(|sector| sector.to_string()),
            "employee_count" => self.employee_count.map(|count| count.to_string()),
            "founded_year" => self.founded_year.map(|year| year.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl ProfileForm for CompanySettings {
    const FIELDS: &'static [&'static str] = &[
        "company_name",
        "responsible_name",
        "phone",
        "address",
        "website",
        "description",
        "cnpj",
        "sector",
        "employee_count",
        "founded_year",
    ];

    async fn fetch(data: &dyn DataService, id: Uuid) -> Result<Self, ServiceError> {
        Ok(data.fetch_company_profile(id).await?.into())
    }

    async fn save(&self, data: &dyn DataService, id: Uuid) -> Result<(), ServiceError> {
        data.upsert_company_profile(&self.to_upsert(id)).await
    }
}

/// Fetch-edit-save form over the signed-in account's profile row.
pub struct SettingsForm<F: ProfileForm> {
    pub fields: F,
    account_id: Uuid,
    data: Arc<dyn DataService>,
    notifier: SharedNotifier,
    loading: bool,
}

impl<F: ProfileForm> SettingsForm<F> {
    pub fn new(account_id: Uuid, data: Arc<dyn DataService>, notifier: SharedNotifier) -> Self {
        Self {
            fields: F::default(),
            account_id,
            data,
            notifier,
            loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        self.fields.set_field(name, value)
    }

    /// Populate from the stored row. A missing row leaves the form empty;
    /// other failures are logged and leave it at defaults.
    pub async fn load(&mut self) {
        match F::fetch(self.data.as_ref(), self.account_id).await {
            Ok(fields) => self.fields = fields,
            Err(e) if e.is_no_rows() => {
                tracing::debug!("No profile row yet for {}", self.account_id);
                self.fields = F::default();
            }
            Err(e) => {
                tracing::error!("Error fetching profile: {}", e);
                self.fields = F::default();
            }
        }
    }

    /// Upsert the current fields. The form keeps what was submitted.
    pub async fn submit(&mut self) -> Result<(), ServiceError> {
        self.loading = true;
        let result = self.fields.save(self.data.as_ref(), self.account_id).await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.notifier.notify(Toast::success(
                    "settings.savedTitle",
                    "settings.savedDescription",
                ));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error updating profile: {}", e);
                self.notifier.notify(
                    Toast::error("settings.saveErrorTitle", "settings.saveErrorDescription")
                        .with_detail(e.message.clone()),
                );
                Err(e)
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
    use crate::notifications::testing::RecordingNotifier;
    use shared_types::{AuthSession, UserKind, UserMetadata};

    async fn sign_up(backend: &LocalBackend, kind: UserKind) -> AuthSession {
        backend
            .sign_up(&SignUpRequest {
                email: format!("{}@example.com", kind),
                password: "segredo123".to_string(),
                metadata: UserMetadata {
                    user_type: kind,
                    full_name: Some("Ana Sato".to_string()),
                    company_name: Some("Kobe Log".to_string()),
                    responsible_name: Some("Kenji".to_string()),
                },
                redirect_to: String::new(),
            })
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_blank_input_is_unset() {
        let mut fields = CompanySettings::default();
        fields.set_field("phone", "   ").unwrap();
        fields.set_field("sector", "").unwrap();
        assert_eq!(fields.phone, None);
        assert_eq!(fields.sector, None);

        let payload = serde_json::to_value(fields.to_upsert(Uuid::nil())).unwrap();
        let object = payload.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("id"));
    }

    #[test]
    fn test_candidate_field_parsing() {
        let mut fields = CandidateSettings::default();
        fields.set_field("birth_date", "1990-04-12").unwrap();
        fields.set_field("languages", "N2, Inglês,").unwrap();
        assert_eq!(fields.birth_date, NaiveDate::from_ymd_opt(1990, 4, 12));
        assert_eq!(
            fields.languages,
            Some(vec!["N2".to_string(), "Inglês".to_string()])
        );
        assert!(fields.set_field("birth_date", "12/04/1990").is_err());
        assert!(fields.to_upsert(Uuid::nil()).updated_at.is_some());
    }

    #[tokio::test]
    async fn test_load_missing_row_gives_empty_form() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let mut form: SettingsForm<CompanySettings> = SettingsForm::new(
            Uuid::new_v4(),
            backend,
            Arc::new(RecordingNotifier::default()),
        );
        form.fields.company_name = Some("stale".to_string());
        form.load().await;
        assert_eq!(form.fields, CompanySettings::default());
    }

    #[tokio::test]
    async fn test_submit_keeps_unset_columns() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let session = sign_up(&backend, UserKind::Company).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut form: SettingsForm<CompanySettings> =
            SettingsForm::new(session.user.id, backend.clone(), notifier.clone());
        form.load().await;
        assert_eq!(form.fields.company_name.as_deref(), Some("Kobe Log"));

        form.set_field("sector", "logistics").unwrap();
        form.submit().await.unwrap();
        assert!(!notifier.last().unwrap().is_error());

        // A fresh form with only a phone must not clear the sector
        let mut other: SettingsForm<CompanySettings> =
            SettingsForm::new(session.user.id, backend.clone(), notifier.clone());
        other.set_field("phone", "078-000-0000").unwrap();
        other.submit().await.unwrap();

        let profile = backend.fetch_company_profile(session.user.id).await.unwrap();
        assert_eq!(profile.sector, Some(Sector::Logistics));
        assert_eq!(profile.phone.as_deref(), Some("078-000-0000"));
        assert_eq!(profile.company_name.as_deref(), Some("Kobe Log"));
    }

    #[tokio::test]
    async fn test_submit_failure_notifies() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut form: SettingsForm<CandidateSettings> =
            SettingsForm::new(Uuid::new_v4(), backend, notifier.clone());
        form.set_field("full_name", "Ana").unwrap();

        assert!(form.submit().await.is_err());
        assert!(notifier.last().unwrap().is_error());
        assert_eq!(form.fields.full_name.as_deref(), Some("Ana"));
    }
}
