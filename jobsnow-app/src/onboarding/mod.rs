pub mod candidate;
pub mod company;

use async_trait::async_trait;
use shared_types::{AuthUser, UserKind};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ServiceError, ValidationError, WizardError};
use crate::helpers::validation::{invalid, non_empty};
use crate::integrations::DataService;
use crate::notifications::{SharedNotifier, Toast};
use crate::routes::Route;

pub use candidate::{CandidateDraft, CandidateFlow, JapaneseLevel};
pub use company::{CompanyDraft, CompanyFlow, EMPLOYEE_RANGES};

/// Translation section of every onboarding label.
pub const ONBOARDING_SECTION: &str = "onboarding";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    YesNo,
    Number,
    /// One of a fixed set of wire values
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label_key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, label_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label_key,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, label_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label_key,
            kind,
            required: false,
        }
    }
}

pub struct StepDefinition<D> {
    pub title_key: &'static str,
    pub fields: Vec<FieldDescriptor>,
    /// True when the step's required fields are filled in `draft`
    pub can_proceed: fn(&D) -> bool,
}

/// Form data collected across the steps of a flow.
pub trait ProfileDraft: Clone + Default + Send + Sync {
    /// Apply raw user input to the named field
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError>;

    /// Current value of the named field, formatted for display
    fn field_value(&self, name: &str) -> Option<String>;
}

#[async_trait]
pub trait OnboardingFlow: Send + Sync {
    type Draft: ProfileDraft;

    fn kind(&self) -> UserKind;

    fn steps(&self) -> Vec<StepDefinition<Self::Draft>>;

    /// Write the whole record, marking it complete
    async fn persist(
        &self,
        data: &dyn DataService,
        account_id: Uuid,
        draft: &Self::Draft,
    ) -> Result<(), ServiceError>;
}

pub(crate) fn text(value: &str) -> Option<String> {
    non_empty(Some(value))
}

pub(crate) fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

pub(crate) fn parse_yes_no(field: &str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "y" | "sim" | "s" | "true" | "はい" => Ok(true),
        "no" | "n" | "nao" | "não" | "false" | "いいえ" => Ok(false),
        _ => Err(invalid(field, value)),
    }
}

/// Multi-step onboarding form. Steps are numbered from 1; moving between them
/// never discards what was typed.
pub struct Wizard<F: OnboardingFlow> {
    flow: F,
    steps: Vec<StepDefinition<F::Draft>>,
    current_step: usize,
    draft: F::Draft,
    data: Arc<dyn DataService>,
    notifier: SharedNotifier,
    saving: bool,
}

impl<F: OnboardingFlow> Wizard<F> {
    pub fn new(flow: F, data: Arc<dyn DataService>, notifier: SharedNotifier) -> Self {
        let steps = flow.steps();
        Self {
            flow,
            steps,
            current_step: 1,
            draft: F::Draft::default(),
            data,
            notifier,
            saving: false,
        }
    }

    pub fn kind(&self) -> UserKind {
        self.flow.kind()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.total_steps()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Percentage shown on the progress bar
    pub fn progress(&self) -> u8 {
        (self.current_step * 100 / self.total_steps().max(1)) as u8
    }

    pub fn step(&self) -> &StepDefinition<F::Draft> {
        &self.steps[self.current_step - 1]
    }

    pub fn draft(&self) -> &F::Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut F::Draft {
        &mut self.draft
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        self.draft.set_field(name, value)
    }

    pub fn can_proceed(&self, step: usize) -> bool {
        step >= 1
            && self
                .steps
                .get(step - 1)
                .is_some_and(|definition| (definition.can_proceed)(&self.draft))
    }

    pub fn next(&mut self) -> Result<usize, WizardError> {
        if self.is_last_step() {
            return Err(WizardError::AtLastStep);
        }
        if !self.can_proceed(self.current_step) {
            return Err(WizardError::StepIncomplete {
                step: self.current_step,
            });
        }
        self.current_step += 1;
        Ok(self.current_step)
    }

    pub fn previous(&mut self) -> Result<usize, WizardError> {
        if self.current_step <= 1 {
            return Err(WizardError::AtFirstStep);
        }
        self.current_step -= 1;
        Ok(self.current_step)
    }

    /// First step whose required fields are not satisfied
    fn first_incomplete_step(&self) -> Option<usize> {
        (1..=self.total_steps()).find(|step| !self.can_proceed(*step))
    }

    /// Save the whole profile with the completion flag set. Only available at
    /// the last step, and every step is checked again since earlier answers
    /// may have been edited after they were passed.
    pub async fn finish(&mut self, user: Option<&AuthUser>) -> Result<Route, WizardError> {
        let last = self.total_steps();
        if self.current_step != last {
            return Err(WizardError::NotAtLastStep { last });
        }
        if let Some(step) = self.first_incomplete_step() {
            self.notifier.notify(Toast::error(
                "onboarding.incompleteTitle",
                "onboarding.incompleteDescription",
            ));
            return Err(WizardError::StepIncomplete { step });
        }
        let Some(user) = user else {
            self.notifier.notify(Toast::error(
                "onboarding.saveErrorTitle",
                ValidationError::NotSignedIn.message_key(),
            ));
            return Err(ValidationError::NotSignedIn.into());
        };

        self.saving = true;
        let result = self
            .flow
            .persist(self.data.as_ref(), user.id, &self.draft)
            .await;
        self.saving = false;

        match result {
            Ok(()) => {
                tracing::info!("Completed {} profile for {}", self.kind(), user.id);
                self.notifier.notify(Toast::success(
                    "onboarding.completeTitle",
                    "onboarding.completeDescription",
                ));
                Ok(Route::Dashboard)
            }
            Err(e) => {
                tracing::error!("Error completing profile: {}", e);
                self.notifier.notify(
                    Toast::error("onboarding.saveErrorTitle", "onboarding.saveErrorDescription")
                        .with_detail(e.message.clone()),
                );
                Err(WizardError::Save(e))
            }
        }
    }
}
