use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Facebook app credentials not configured")]
    NotConfigured,
    #[error("Token exchange failed: {message}")]
    Provider {
        message: String,
        details: Option<String>,
    },
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Server-side trade of an authorization code with the identity provider.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
    -> Result<IssuedToken, IssuerError>;
}
