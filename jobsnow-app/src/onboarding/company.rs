use async_trait::async_trait;
use chrono::Datelike;
use shared_types::{CompanyProfileUpsert, Sector, UserKind};
use uuid::Uuid;

use super::{
    filled, text, FieldDescriptor, FieldKind, OnboardingFlow, ProfileDraft,
    StepDefinition,
};
use crate::error::{ServiceError, ValidationError};
use crate::helpers::validation::invalid;
use crate::integrations::DataService;

/// Head-count choices, each stored as a representative number, with the
/// label key of its range.
pub const EMPLOYEE_RANGES: [(i32, &str); 6] = [
    (1, "employees.upTo10"),
    (25, "employees.upTo50"),
    (75, "employees.upTo100"),
    (250, "employees.upTo500"),
    (1000, "employees.upTo1000"),
    (5000, "employees.moreThan1000"),
];

const EMPLOYEE_VALUES: &[&str] = &["1", "25", "75", "250", "1000", "5000"];

pub const SECTOR_VALUES: &[&str] = &[
    "IT",
    "retail",
    "construction",
    "manufacturing",
    "services",
    "education",
    "healthcare",
    "tourism",
    "food",
    "logistics",
    "other",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDraft {
    pub company_name: String,
    pub responsible_name: String,
    pub cnpj: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub sector: Option<Sector>,
    pub employee_count: i32,
    pub founded_year: i32,
    pub description: String,
}

impl Default for CompanyDraft {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            responsible_name: String::new(),
            cnpj: String::new(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            sector: None,
            employee_count: 0,
            founded_year: chrono::Utc::now().year(),
            description: String::new(),
        }
    }
}

impl CompanyDraft {
    /// Blank optional text is sent as unset, so the stored value is kept.
    pub fn to_upsert(&self, id: Uuid) -> CompanyProfileUpsert {
        CompanyProfileUpsert {
            id,
            company_name: text(&self.company_name),
            responsible_name: text(&self.responsible_name),
            phone: text(&self.phone),
            address: text(&self.address),
            website: text(&self.website),
            cnpj: text(&self.cnpj),
            sector: self.sector,
            employee_count: Some(self.employee_count),
            founded_year: Some(self.founded_year),
            description: text(&self.description),
            is_profile_complete: Some(true),
            ..Default::default()
        }
    }
}

impl ProfileDraft for CompanyDraft {
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        match name {
            "company_name" => self.company_name = value.to_string(),
            "responsible_name" => self.responsible_name = value.to_string(),
            "cnpj" => self.cnpj = value.to_string(),
            "address" => self.address = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "website" => self.website = value.to_string(),
            "sector" => {
                self.sector = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.trim().parse().map_err(|_| invalid(name, value))?)
                }
            }
            "employee_count" => {
                self.employee_count = value
                    .trim()
                    .parse::<i32>()
                    .ok()
                    .filter(|count| EMPLOYEE_RANGES.iter().any(|(range, _)| range == count))
                    .ok_or_else(|| invalid(name, value))?
            }
            "founded_year" => {
                self.founded_year = value.trim().parse::<i32>().map_err(|_| invalid(name, value))?
            }
            "description" => self.description = value.to_string(),
            other => return Err(invalid(other, value)),
        }
        Ok(())
    }

    fn field_value(&self, name: &str) -> Option<String> {
        match name {
            "company_name" => text(&self.company_name),
            "responsible_name" => text(&self.responsible_name),
            "cnpj" => text(&self.cnpj),
            "address" => text(&self.address),
            "phone" => text(&self.phone),
            "website" => text(&self.website),
            "sector" => self.sector.map(|sector| sector.to_string()),
            "employee_count" => (self.employee_count > 0).then(|| self.employee_count.to_string()),
            "founded_year" => Some(self.founded_year.to_string()),
            "description" => text(&self.description),
            _ => None,
        }
    }
}

pub struct CompanyFlow;

#[async_trait]
impl OnboardingFlow for CompanyFlow {
    type Draft = CompanyDraft;

    fn kind(&self) -> UserKind {
        UserKind::Company
    }

    fn steps(&self) -> Vec<StepDefinition<CompanyDraft>> {
        vec![
            StepDefinition {
                title_key: "company.steps.identification",
                fields: vec![
                    FieldDescriptor::required("company_name", "fields.companyName", FieldKind::Text),
                    FieldDescriptor::required(
                        "responsible_name",
                        "fields.responsibleName",
                        FieldKind::Text,
                    ),
                    FieldDescriptor::optional("cnpj", "fields.cnpj", FieldKind::Text),
                ],
                can_proceed: |draft| filled(&draft.company_name) && filled(&draft.responsible_name),
            },
            StepDefinition {
                title_key: "company.steps.contact",
                fields: vec![
                    FieldDescriptor::required("address", "fields.address", FieldKind::Text),
                    FieldDescriptor::optional("phone", "fields.phone", FieldKind::Text),
                    FieldDescriptor::optional("website", "fields.website", FieldKind::Text),
                ],
                can_proceed: |draft| filled(&draft.address),
            },
            StepDefinition {
                title_key: "company.steps.sector",
                fields: vec![FieldDescriptor::required(
                    "sector",
                    "fields.sector",
                    FieldKind::Choice(SECTOR_VALUES),
                )],
                can_proceed: |draft| draft.sector.is_some(),
            },
            StepDefinition {
                title_key: "company.steps.size",
                fields: vec![
                    FieldDescriptor::required(
                        "employee_count",
                        "fields.employeeCount",
                        FieldKind::Choice(EMPLOYEE_VALUES),
                    ),
                    FieldDescriptor::optional("founded_year", "fields.foundedYear", FieldKind::Number),
                ],
                can_proceed: |draft| draft.employee_count > 0,
            },
            StepDefinition {
                title_key: "company.steps.about",
                fields: vec![FieldDescriptor::optional(
                    "description",
                    "fields.description",
                    FieldKind::LongText,
                )],
                can_proceed: |_| true,
            },
        ]
    }

    async fn persist(
        &self,
        data: &dyn DataService,
        account_id: Uuid,
        draft: &CompanyDraft,
    ) -> Result<(), ServiceError> {
        data.upsert_company_profile(&draft.to_upsert(account_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;
    use crate::error::WizardError;
    use crate::integrations::local::LocalBackend;
    use crate::integrations::{IdentityService, SignUpRequest};
    use crate::notifications::testing::RecordingNotifier;
    use crate::onboarding::Wizard;
    use crate::routes::Route;
    use shared_types::UserMetadata;
    use std::sync::Arc;

    #[test]
    fn test_defaults_and_field_parsing() {
        let mut draft = CompanyDraft::default();
        assert_eq!(draft.founded_year, chrono::Utc::now().year());

        draft.set_field("sector", "IT").unwrap();
        assert_eq!(draft.sector, Some(Sector::It));
        assert!(draft.set_field("sector", "mining").is_err());
        assert!(draft.set_field("employee_count", "30").is_err());
        draft.set_field("employee_count", "250").unwrap();
        assert_eq!(draft.employee_count, 250);
    }

    #[test]
    fn test_unset_sector_is_omitted_from_payload() {
        let draft = CompanyDraft {
            company_name: "Kobe Log".to_string(),
            ..Default::default()
        };
        let payload = serde_json::to_value(draft.to_upsert(Uuid::nil())).unwrap();
        assert!(payload.get("sector").is_none());
        assert!(payload.get("cnpj").is_none());
        assert_eq!(payload["is_profile_complete"], true);
    }

    #[tokio::test]
    async fn test_company_flow_end_to_end() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let session = backend
            .sign_up(&SignUpRequest {
                email: "rh@kobe.jp".to_string(),
                password: "segredo123".to_string(),
                metadata: UserMetadata {
                    user_type: UserKind::Company,
                    full_name: None,
                    company_name: Some("Kobe Log".to_string()),
                    responsible_name: Some("Kenji".to_string()),
                },
                redirect_to: String::new(),
            })
            .await
            .unwrap()
            .unwrap();

        let mut wizard = Wizard::new(CompanyFlow, backend.clone(), Arc::new(RecordingNotifier::default()));
        assert_eq!(wizard.total_steps(), 5);

        wizard.set_field("company_name", "Kobe Log").unwrap();
        assert_eq!(wizard.next(), Err(WizardError::StepIncomplete { step: 1 }));
        wizard.set_field("responsible_name", "Kenji").unwrap();
        wizard.next().unwrap();
        wizard.set_field("address", "Kobe, Hyogo").unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.next(), Err(WizardError::StepIncomplete { step: 3 }));
        wizard.set_field("sector", "logistics").unwrap();
        wizard.next().unwrap();
        wizard.set_field("employee_count", "75").unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.next(), Err(WizardError::AtLastStep));

        assert_eq!(wizard.finish(Some(&session.user)).await, Ok(Route::Dashboard));
        let profile = backend.fetch_company_profile(session.user.id).await.unwrap();
        assert!(profile.is_profile_complete);
        assert_eq!(profile.sector, Some(Sector::Logistics));
        assert_eq!(profile.employee_count, Some(75));
    }
}
