//! Client for the same-origin `/api/oauth/token` endpoint used by the popup.

use async_trait::async_trait;
use pressroom_api_types::{TokenExchangeRequest, TokenExchangeResponse};
use reqwest::{Client, Url};

use crate::application::oauth::{ExchangeError, TokenExchanger};

pub const TOKEN_EXCHANGE_PATH: &str = "/api/oauth/token";

#[derive(Debug, Clone)]
pub struct HttpTokenExchanger {
    client: Client,
    origin: Url,
}

impl HttpTokenExchanger {
    pub fn new(client: Client, origin: Url) -> Self {
        Self { client, origin }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<String, ExchangeError> {
        let url = self
            .origin
            .join(TOKEN_EXCHANGE_PATH)
            .map_err(|err| ExchangeError::Transport(err.to_string()))?;
        let request = TokenExchangeRequest {
            code: Some(code.to_string()),
            redirect_uri: Some(redirect_uri.to_string()),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| ExchangeError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .json::<TokenExchangeResponse>()
            .await
            .map_err(|err| {
                ExchangeError::Transport(format!("unreadable response ({status}): {err}"))
            })?;

        match body.access_token {
            Some(token) if status.is_success() && !token.is_empty() => Ok(token),
            _ => Err(ExchangeError::Endpoint {
                message: body.error,
            }),
        }
    }
}
