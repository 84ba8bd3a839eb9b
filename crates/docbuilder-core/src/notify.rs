//! User-facing notifications built from action errors.

use docsign_core::SigningError;
use serde::{Deserialize, Serialize};
use shared_types::StoreError;

use crate::error::{BuilderError, WizardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }

    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn warning(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, message)
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }
}

impl From<&WizardError> for Notification {
    fn from(e: &WizardError) -> Self {
        Notification::warning("Check this step", e.to_string())
    }
}

impl From<&SigningError> for Notification {
    fn from(e: &SigningError) -> Self {
        match e {
            SigningError::Store(store) => store_failure("Signing failed", store),
            SigningError::Pad(_) => Notification::error("Signing failed", e.to_string()),
            _ => Notification::warning("Cannot sign yet", e.to_string()),
        }
    }
}

impl From<&BuilderError> for Notification {
    fn from(e: &BuilderError) -> Self {
        match e {
            BuilderError::Wizard(w) => w.into(),
            BuilderError::Signing(s) => s.into(),
            BuilderError::Store(s) => store_failure("Could not save", s),
            BuilderError::Export(_) => Notification::error("PDF export failed", e.to_string()),
            BuilderError::Forbidden(_) => Notification::error("Not allowed", e.to_string()),
        }
    }
}

fn store_failure(title: &str, e: &StoreError) -> Notification {
    match e {
        StoreError::Conflict(_) | StoreError::AlreadySigned(_) => {
            Notification::warning(title, format!("{}. Reload and try again.", e))
        }
        _ => Notification::error(title, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignerError;
    use crate::wizard::WizardStep;

    #[test]
    fn validation_errors_are_warnings() {
        let n = Notification::from(&BuilderError::Wizard(WizardError::StepIncomplete {
            step: WizardStep::SelectClient,
            reason: "Choose a client".into(),
        }));
        assert_eq!(n.level, NotificationLevel::Warning);
        assert!(n.message.contains("Choose a client"));

        let n = Notification::from(&WizardError::Signer(SignerError::NoSigners));
        assert_eq!(n.level, NotificationLevel::Warning);
    }

    #[test]
    fn persistence_errors_are_errors() {
        let n = Notification::from(&BuilderError::Store(StoreError::Backend("timeout".into())));
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.title, "Could not save");
    }

    #[test]
    fn signing_precondition_is_warning() {
        let n = Notification::from(&SigningError::AgreementRequired);
        assert_eq!(n.level, NotificationLevel::Warning);
        assert_eq!(n.message, "You must agree to sign this document electronically");
    }
}
