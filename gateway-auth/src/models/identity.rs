//! Identity model - one binding between a principal and an authentication provider account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::ServiceError;

/// Identity entity. `id` is the account name at `provider` (a username for password providers,
/// the subject claim for external ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Identity {
    #[validate(length(min = 1, max = 255))]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub provider: String,
    pub latest_login: Option<DateTime<Utc>>,
}

impl Identity {
    /// Create an identity recorded at its first successful login.
    pub fn new(provider: &str, id: &str, now: DateTime<Utc>) -> Result<Self, ServiceError> {
        let identity = Self {
            id: id.to_string(),
            provider: provider.to_string(),
            latest_login: Some(now),
        };
        identity.validate()?;
        Ok(identity)
    }

    pub fn matches(&self, provider: &str, id: &str) -> bool {
        self.provider == provider && self.id == id
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.latest_login = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_records_login() {
        let now = Utc::now();
        let identity = Identity::new("orcid", "0000-0002-1825-0097", now).unwrap();
        assert_eq!(identity.latest_login, Some(now));
        assert!(identity.matches("orcid", "0000-0002-1825-0097"));
        assert!(!identity.matches("toy", "0000-0002-1825-0097"));
    }

    #[test]
    fn test_identity_length_limits() {
        let now = Utc::now();
        assert!(Identity::new("toy", &"a".repeat(255), now).is_ok());

        let err = Identity::new("toy", &"a".repeat(256), now).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = Identity::new(&"p".repeat(256), "alice", now).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
