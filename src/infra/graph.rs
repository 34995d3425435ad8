//! Facebook Graph API token issuer.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::warn;

use crate::application::oauth::{IssuedToken, IssuerError, TokenIssuer};

#[derive(Debug, Clone)]
pub struct GraphTokenClient {
    client: Client,
    graph_base: Url,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<GraphErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: Option<String>,
}

impl GraphTokenClient {
    pub fn new(
        client: Client,
        graph_base: Url,
        app_id: Option<String>,
        app_secret: Option<String>,
    ) -> Self {
        let credentials = match (app_id, app_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        };
        Self {
            client,
            graph_base,
            credentials,
        }
    }

    fn token_url(&self, pairs: &[(&str, &str)]) -> Result<Url, IssuerError> {
        let endpoint = format!(
            "{}/oauth/access_token",
            self.graph_base.as_str().trim_end_matches('/')
        );
        let mut url =
            Url::parse(&endpoint).map_err(|err| IssuerError::Transport(err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<TokenBody, IssuerError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| IssuerError::Transport(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| IssuerError::Transport(err.to_string()))?;

        let body: TokenBody = serde_json::from_str(&text).map_err(|_| IssuerError::Provider {
            message: format!("unexpected response ({status})"),
            details: Some(text.clone()),
        })?;

        if let Some(error) = &body.error {
            return Err(IssuerError::Provider {
                message: error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
                details: Some(text),
            });
        }
        if !status.is_success() {
            return Err(IssuerError::Provider {
                message: format!("provider responded with {status}"),
                details: Some(text),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl TokenIssuer for GraphTokenClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<IssuedToken, IssuerError> {
        let (app_id, app_secret) = self.credentials.as_ref().ok_or(IssuerError::NotConfigured)?;

        let short_url = self.token_url(&[
            ("client_id", app_id.as_str()),
            ("client_secret", app_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ])?;
        let short = self.fetch(short_url).await?;
        let short_token = short.access_token.ok_or_else(|| IssuerError::Provider {
            message: "no access token in response".to_string(),
            details: None,
        })?;

        // Upgrade to a long-lived token; the short-lived one is still usable on failure.
        let long_url = self.token_url(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", app_id.as_str()),
            ("client_secret", app_secret.as_str()),
            ("fb_exchange_token", short_token.as_str()),
        ])?;
        match self.fetch(long_url).await {
            Ok(TokenBody {
                access_token: Some(access_token),
                expires_in,
                ..
            }) => Ok(IssuedToken {
                access_token,
                expires_in,
            }),
            Ok(_) => Ok(IssuedToken {
                access_token: short_token,
                expires_in: short.expires_in,
            }),
            Err(err) => {
                warn!(
                    target = "infra::graph",
                    op = "oauth::long_lived_upgrade",
                    result = "fallback",
                    error = %err,
                    "Long-lived token upgrade failed; keeping short-lived token"
                );
                Ok(IssuedToken {
                    access_token: short_token,
                    expires_in: short.expires_in,
                })
            }
        }
    }
}
