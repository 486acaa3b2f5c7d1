use thiserror::Error;

/// PostgREST code for a single-row request that matched nothing.
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Failure reported by the external data/identity service.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ServiceError {
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            status: None,
        }
    }

    pub fn no_rows() -> Self {
        Self::with_code(NO_ROWS_CODE, "JSON object requested, multiple (or no) rows returned")
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// A single-row fetch found nothing. Callers treat this as an empty state.
    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }

    /// The server answered and refused the credentials (bad grant, expired or
    /// revoked token). Transport failures and server errors carry no such answer.
    pub fn rejects_credentials(&self) -> bool {
        matches!(self.status, Some(400 | 401 | 403))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|status| status.as_u16());
        Self {
            code: None,
            message: e.to_string(),
            status,
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(format!("{e:#}"))
    }
}

/// Failures caught before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must have at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
    #[error("'{value}' is not a valid value for {field}")]
    InvalidValue { field: String, value: String },
    #[error("you must be signed in")]
    NotSignedIn,
}

impl ValidationError {
    /// Key of the localized description in the `notifications` section.
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::PasswordMismatch => "validation.passwordMismatch",
            ValidationError::PasswordTooShort { .. } => "validation.passwordTooShort",
            ValidationError::Required { .. } => "validation.required",
            ValidationError::InvalidEmail(_) => "validation.invalidEmail",
            ValidationError::InvalidValue { .. } => "validation.invalidValue",
            ValidationError::NotSignedIn => "validation.notSignedIn",
        }
    }
}

/// User-facing categories for identity failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("this e-mail is already registered")]
    AlreadyRegistered,
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("e-mail not confirmed")]
    EmailNotConfirmed,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// Map a raw service message onto a known category by substring.
    pub fn categorize(error: &ServiceError) -> Self {
        let message = error.message.to_lowercase();
        if message.contains("already registered") {
            AuthError::AlreadyRegistered
        } else if message.contains("invalid login credentials") {
            AuthError::InvalidCredentials
        } else if message.contains("email not confirmed") {
            AuthError::EmailNotConfirmed
        } else {
            AuthError::Unexpected(error.message.clone())
        }
    }

    /// Key of the localized description in the `notifications` section.
    pub fn message_key(&self) -> &'static str {
        match self {
            AuthError::AlreadyRegistered => "auth.alreadyRegistered",
            AuthError::InvalidCredentials => "auth.invalidCredentials",
            AuthError::EmailNotConfirmed => "auth.emailNotConfirmed",
            AuthError::Validation(e) => e.message_key(),
            AuthError::Unexpected(_) => "generic.unexpected",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WizardError {
    #[error("step {step} has required fields left empty")]
    StepIncomplete { step: usize },
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error("finish is only available at step {last}")]
    NotAtLastStep { last: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to save profile: {0}")]
    Save(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("translation not found: {language}/{section}")]
    NotFound { language: String, section: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid translation file {language}/{section}: {source}")]
    Parse {
        language: String,
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_known_messages() {
        let cases = [
            ("User already registered", AuthError::AlreadyRegistered),
            ("Invalid login credentials", AuthError::InvalidCredentials),
            ("Email not confirmed", AuthError::EmailNotConfirmed),
        ];
        for (message, expected) in cases {
            assert_eq!(AuthError::categorize(&ServiceError::new(message)), expected);
        }

        match AuthError::categorize(&ServiceError::new("rate limit exceeded")) {
            AuthError::Unexpected(message) => assert_eq!(message, "rate limit exceeded"),
            other => panic!("unexpected category: {other:?}"),
        }
    }

    #[test]
    fn test_no_rows_detection() {
        assert!(ServiceError::no_rows().is_no_rows());
        assert!(!ServiceError::with_code("42501", "permission denied").is_no_rows());
        assert!(!ServiceError::new("timeout").is_no_rows());
    }

    #[test]
    fn test_credential_rejection_needs_an_answer() {
        assert!(ServiceError::new("invalid JWT").with_status(401).rejects_credentials());
        assert!(ServiceError::with_code("refresh_token_not_found", "Invalid Refresh Token")
            .with_status(400)
            .rejects_credentials());
        assert!(!ServiceError::new("error sending request").rejects_credentials());
        assert!(!ServiceError::new("Bad Gateway").with_status(502).rejects_credentials());
    }
}
