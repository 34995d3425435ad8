//! Value types shared across the publishing pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Suffix appended to a scheduling key to form the artifact storage key.
pub const ARTIFACT_KEY_SUFFIX: &str = "_custom_processed.png";

/// Identifier grouping work units, typically a week-start date such as `2025-11-07`.
///
/// The key is embedded in storage keys and workflow inputs, so it may not
/// contain path separators, `..`, or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchedulingKey(String);

impl SchedulingKey {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DomainError::invalid_key(raw, "must not be empty"));
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(DomainError::invalid_key(raw, "must not contain path separators"));
        }
        if raw.contains("..") {
            return Err(DomainError::invalid_key(raw, "must not contain `..`"));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::invalid_key(
                raw,
                "must not contain whitespace or control characters",
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic storage key of the rendered artifact for this scheduling key.
    pub fn artifact_key(&self) -> String {
        format!("{}{ARTIFACT_KEY_SUFFIX}", self.0)
    }
}

impl TryFrom<String> for SchedulingKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SchedulingKey> for String {
    fn from(value: SchedulingKey) -> Self {
        value.0
    }
}

impl FromStr for SchedulingKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SchedulingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a scheduler run that found at least one due item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub published_count: u64,
}

/// Accepted request to run the remote rendering workflow. Acceptance is not completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDispatchRequest {
    pub scheduling_key: SchedulingKey,
    pub work_unit_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_week_start_dates() {
        let key = SchedulingKey::parse("2025-11-07").expect("valid key");
        assert_eq!(key.as_str(), "2025-11-07");
        assert_eq!(key.artifact_key(), "2025-11-07_custom_processed.png");
    }

    #[test]
    fn rejects_keys_that_could_escape_storage() {
        for raw in ["", "../etc", "2025/11/07", "a\\b", "2025 11 07", "x\ty"] {
            assert!(
                SchedulingKey::parse(raw).is_err(),
                "`{raw}` should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: SchedulingKey = serde_json::from_str(r#""2025-11-14""#).expect("valid");
        assert_eq!(ok.to_string(), "2025-11-14");

        let err = serde_json::from_str::<SchedulingKey>(r#""../x""#);
        assert!(err.is_err());
    }
}
