use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{CandidateProfileUpsert, UserKind};
use std::str::FromStr;
use uuid::Uuid;

use super::{
    filled, parse_yes_no, text, FieldDescriptor, FieldKind, OnboardingFlow,
    ProfileDraft, StepDefinition,
};
use crate::error::{ServiceError, ValidationError};
use crate::helpers::validation::invalid;
use crate::integrations::DataService;

/// JLPT levels, plus native speakers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JapaneseLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
    Nativo,
}

impl JapaneseLevel {
    pub const ALL: [JapaneseLevel; 6] = [
        JapaneseLevel::N5,
        JapaneseLevel::N4,
        JapaneseLevel::N3,
        JapaneseLevel::N2,
        JapaneseLevel::N1,
        JapaneseLevel::Nativo,
    ];

    pub const VALUES: &'static [&'static str] = &["N5", "N4", "N3", "N2", "N1", "Nativo"];

    pub fn as_str(&self) -> &'static str {
        match self {
            JapaneseLevel::N5 => "N5",
            JapaneseLevel::N4 => "N4",
            JapaneseLevel::N3 => "N3",
            JapaneseLevel::N2 => "N2",
            JapaneseLevel::N1 => "N1",
            JapaneseLevel::Nativo => "Nativo",
        }
    }
}

impl FromStr for JapaneseLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        JapaneseLevel::ALL
            .iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| invalid("japanese_level", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateDraft {
    pub full_name: String,
    pub phone: String,
    pub is_immigrant: bool,
    pub nationality: String,
    pub ancestry: String,
    pub speaks_japanese: bool,
    pub japanese_level: Option<JapaneseLevel>,
    pub address: String,
    pub bio: String,
}

impl CandidateDraft {
    /// Stored `languages`: the level alone, or nothing
    pub fn languages(&self) -> Vec<String> {
        match (self.speaks_japanese, self.japanese_level) {
            (true, Some(level)) => vec![level.as_str().to_string()],
            _ => Vec::new(),
        }
    }

    /// Blank optional text is sent as unset, so the stored value is kept.
    pub fn to_upsert(&self, id: Uuid) -> CandidateProfileUpsert {
        CandidateProfileUpsert {
            id,
            full_name: text(&self.full_name),
            phone: text(&self.phone),
            address: text(&self.address),
            nationality: text(&self.nationality),
            ancestry: text(&self.ancestry),
            bio: text(&self.bio),
            languages: Some(self.languages()),
            is_profile_complete: Some(true),
            updated_at: Some(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

impl ProfileDraft for CandidateDraft {
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        match name {
            "full_name" => self.full_name = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "is_immigrant" => self.is_immigrant = parse_yes_no(name, value)?,
            "nationality" => self.nationality = value.to_string(),
            "ancestry" => self.ancestry = value.to_string(),
            "speaks_japanese" => self.speaks_japanese = parse_yes_no(name, value)?,
            "japanese_level" => {
                self.japanese_level = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            "address" => self.address = value.to_string(),
            "bio" => self.bio = value.to_string(),
            other => return Err(invalid(other, value)),
        }
        Ok(())
    }

    fn field_value(&self, name: &str) -> Option<String> {
        match name {
            "full_name" => text(&self.full_name),
            "phone" => text(&self.phone),
            "is_immigrant" => Some(self.is_immigrant.to_string()),
            "nationality" => text(&self.nationality),
            "ancestry" => text(&self.ancestry),
            "speaks_japanese" => Some(self.speaks_japanese.to_string()),
            "japanese_level" => self.japanese_level.map(|level| level.as_str().to_string()),
            "address" => text(&self.address),
            "bio" => text(&self.bio),
            _ => None,
        }
    }
}

pub struct CandidateFlow;

#[async_trait]
impl OnboardingFlow for CandidateFlow {
    type Draft = CandidateDraft;

    fn kind(&self) -> UserKind {
        UserKind::Candidate
    }

    fn steps(&self) -> Vec<StepDefinition<CandidateDraft>> {
        vec![
            StepDefinition {
                title_key: "candidate.steps.personal",
                fields: vec![
                    FieldDescriptor::required("full_name", "fields.fullName", FieldKind::Text),
                    FieldDescriptor::optional("phone", "fields.phone", FieldKind::Text),
                ],
                can_proceed: |draft| filled(&draft.full_name),
            },
            StepDefinition {
                title_key: "candidate.steps.immigration",
                fields: vec![FieldDescriptor::required(
                    "is_immigrant",
                    "fields.isImmigrant",
                    FieldKind::YesNo,
                )],
                can_proceed: |_| true,
            },
            StepDefinition {
                title_key: "candidate.steps.origin",
                fields: vec![
                    FieldDescriptor::required("nationality", "fields.nationality", FieldKind::Text),
                    FieldDescriptor::optional("ancestry", "fields.ancestry", FieldKind::Text),
                ],
                can_proceed: |draft| filled(&draft.nationality),
            },
            StepDefinition {
                title_key: "candidate.steps.japanese",
                fields: vec![
                    FieldDescriptor::required(
                        "speaks_japanese",
                        "fields.speaksJapanese",
                        FieldKind::YesNo,
                    ),
                    // Required only when speaks_japanese is set
                    FieldDescriptor::optional(
                        "japanese_level",
                        "fields.japaneseLevel",
                        FieldKind::Choice(JapaneseLevel::VALUES),
                    ),
                ],
                can_proceed: |draft| !draft.speaks_japanese || draft.japanese_level.is_some(),
            },
            StepDefinition {
                title_key: "candidate.steps.address",
                fields: vec![FieldDescriptor::required(
                    "address",
                    "fields.address",
                    FieldKind::Text,
                )],
                can_proceed: |draft| filled(&draft.address),
            },
            StepDefinition {
                title_key: "candidate.steps.about",
                fields: vec![FieldDescriptor::optional("bio", "fields.bio", FieldKind::LongText)],
                can_proceed: |_| true,
            },
        ]
    }

    async fn persist(
        &self,
        data: &dyn DataService,
        account_id: Uuid,
        draft: &CandidateDraft,
    ) -> Result<(), ServiceError> {
        data.upsert_candidate_profile(&draft.to_upsert(account_id)).await
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
    use shared_types::{AuthSession, UserMetadata};
    use std::sync::Arc;

    async fn signed_in(backend: &LocalBackend) -> AuthSession {
        backend
            .sign_up(&SignUpRequest {
                email: "ana@example.com".to_string(),
                password: "segredo123".to_string(),
                metadata: UserMetadata {
                    user_type: UserKind::Candidate,
                    full_name: Some("Ana".to_string()),
                    company_name: None,
                    responsible_name: None,
                },
                redirect_to: String::new(),
            })
            .await
            .unwrap()
            .unwrap()
    }

    fn fill_through_step_four(wizard: &mut Wizard<CandidateFlow>) {
        wizard.set_field("full_name", "Ana Sato").unwrap();
        wizard.next().unwrap();
        wizard.set_field("is_immigrant", "sim").unwrap();
        wizard.next().unwrap();
        wizard.set_field("nationality", "Brasileira").unwrap();
        wizard.set_field("ancestry", "Japonesa").unwrap();
        wizard.next().unwrap();
    }

    #[tokio::test]
    async fn test_japanese_without_level_blocks_next() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let mut wizard = Wizard::new(CandidateFlow, backend, Arc::new(RecordingNotifier::default()));

        assert_eq!(wizard.next(), Err(WizardError::StepIncomplete { step: 1 }));
        fill_through_step_four(&mut wizard);
        assert_eq!(wizard.current_step(), 4);

        wizard.set_field("speaks_japanese", "yes").unwrap();
        assert_eq!(wizard.next(), Err(WizardError::StepIncomplete { step: 4 }));
        wizard.set_field("japanese_level", "n2").unwrap();
        assert_eq!(wizard.next(), Ok(5));

        // Going back keeps what was typed
        wizard.previous().unwrap();
        wizard.previous().unwrap();
        assert_eq!(wizard.draft().nationality, "Brasileira");
    }

    #[tokio::test]
    async fn test_finish_rechecks_every_step() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let session = signed_in(&backend).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let mut wizard = Wizard::new(CandidateFlow, backend.clone(), notifier.clone());

        fill_through_step_four(&mut wizard);
        wizard.next().unwrap();
        wizard.set_field("address", "Hamamatsu").unwrap();
        wizard.next().unwrap();
        assert!(wizard.is_last_step());

        // Step 1 emptied after it was passed
        wizard.draft_mut().full_name = "  ".to_string();
        assert_eq!(
            wizard.finish(Some(&session.user)).await,
            Err(WizardError::StepIncomplete { step: 1 })
        );
        assert!(notifier.last().unwrap().is_error());

        wizard.draft_mut().full_name = "Ana Sato".to_string();
        assert_eq!(wizard.finish(Some(&session.user)).await, Ok(Route::Dashboard));

        let profile = backend.fetch_candidate_profile(session.user.id).await.unwrap();
        assert!(profile.is_profile_complete);
        assert!(profile.languages.is_empty());
        assert_eq!(profile.ancestry.as_deref(), Some("Japonesa"));
        assert_eq!(profile.bio, None);
    }

    #[tokio::test]
    async fn test_rejected_save_stays_on_last_step() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let session = signed_in(&backend).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let mut wizard = Wizard::new(CandidateFlow, backend.clone(), notifier.clone());

        fill_through_step_four(&mut wizard);
        wizard.next().unwrap();
        wizard.set_field("address", "Hamamatsu").unwrap();
        wizard.next().unwrap();

        // The backend no longer accepts writes for this user
        backend.sign_out().await.unwrap();

        let result = wizard.finish(Some(&session.user)).await;
        match result {
            Err(WizardError::Save(e)) => assert_eq!(e.code.as_deref(), Some("42501")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(wizard.current_step(), wizard.total_steps());
        let toast = notifier.last().unwrap();
        assert!(toast.is_error());
        assert_eq!(toast.description, "onboarding.saveErrorDescription");

        let profile = backend.fetch_candidate_profile(session.user.id).await.unwrap();
        assert!(!profile.is_profile_complete);
        assert_eq!(profile.address, None);
    }

    #[tokio::test]
    async fn test_finish_only_at_last_step() {
        let (_dir, db) = test_database();
        let backend = Arc::new(LocalBackend::new(db.async_connection.clone(), true));
        let mut wizard = Wizard::new(CandidateFlow, backend, Arc::new(RecordingNotifier::default()));
        assert_eq!(
            wizard.finish(None).await,
            Err(WizardError::NotAtLastStep { last: 6 })
        );
    }

    #[test]
    fn test_languages_from_level() {
        let mut draft = CandidateDraft {
            speaks_japanese: true,
            japanese_level: Some(JapaneseLevel::Nativo),
            ..Default::default()
        };
        assert_eq!(draft.languages(), vec!["Nativo".to_string()]);

        draft.speaks_japanese = false;
        assert!(draft.languages().is_empty());
        assert!(draft.set_field("japanese_level", "N6").is_err());
    }
}
