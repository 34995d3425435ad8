use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid scheduling key `{key}`: {reason}")]
    InvalidSchedulingKey { key: String, reason: &'static str },
    #[error("handshake cannot move from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl DomainError {
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSchedulingKey {
            key: key.into(),
            reason,
        }
    }
}
