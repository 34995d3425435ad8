//! Popup-side handling of the provider redirect.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use metrics::counter;
use pressroom_api_types::AuthMessage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::application::oauth::session::{AuthError, ChildContext, open_popup};
use crate::domain::oauth::{
    EXCHANGE_FAILED, EXCHANGE_TIMED_OUT, Handshake, HandshakeState, NETWORK_ERROR,
    NO_CODE_RECEIVED, RedirectOutcome, RedirectParams, redirect_uri_from,
};

pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

pub const METRIC_OAUTH_HANDSHAKES_TOTAL: &str = "pressroom_oauth_handshakes_total";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The endpoint answered without a token; `message` is its `error` text when present.
    #[error("token endpoint rejected the code: {}", .message.as_deref().unwrap_or("no error text"))]
    Endpoint { message: Option<String> },
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
}

/// Same-origin endpoint that trades an authorization code for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<String, ExchangeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReport {
    pub state: HandshakeState,
    pub message: AuthMessage,
}

#[derive(Clone)]
pub struct OAuthCoordinator {
    exchanger: Arc<dyn TokenExchanger>,
    exchange_timeout: Duration,
}

impl OAuthCoordinator {
    pub fn new(exchanger: Arc<dyn TokenExchanger>, exchange_timeout: Duration) -> Self {
        Self {
            exchanger,
            exchange_timeout,
        }
    }

    /// Inspect the redirect once, settle the handshake, post one message, close the context.
    pub async fn run<C>(&self, ctx: &mut C) -> HandshakeReport
    where
        C: ChildContext + ?Sized,
    {
        let mut handshake = Handshake::new();
        let params = RedirectParams::from_url(ctx.location());

        let message = match params.classify() {
            RedirectOutcome::Denied(reason) => AuthMessage::Error { error: reason },
            RedirectOutcome::MissingCode => AuthMessage::Error {
                error: NO_CODE_RECEIVED.to_string(),
            },
            RedirectOutcome::Code(code) => {
                settle(&mut handshake, HandshakeState::Exchanging);
                let redirect_uri = redirect_uri_from(ctx.location());
                self.exchange(&code, &redirect_uri).await
            }
        };

        let terminal = if message.is_success() {
            HandshakeState::Succeeded
        } else {
            HandshakeState::Failed
        };
        settle(&mut handshake, terminal);

        let target_origin = ctx.opener_origin().to_string();
        ctx.post_to_opener(&message, &target_origin);
        ctx.close();

        counter!(METRIC_OAUTH_HANDSHAKES_TOTAL, "outcome" => terminal.as_str()).increment(1);
        match &message {
            AuthMessage::Success { .. } => info!(
                target = "application::oauth::coordinator",
                op = "oauth::handshake",
                result = "succeeded",
                "Authorization handshake succeeded"
            ),
            AuthMessage::Error { error } => warn!(
                target = "application::oauth::coordinator",
                op = "oauth::handshake",
                result = "failed",
                reason = %error,
                "Authorization handshake failed"
            ),
        }

        HandshakeReport {
            state: handshake.state(),
            message,
        }
    }

    /// Drive both halves of a popup handshake for `location` and return the opener's verdict.
    ///
    /// The opener stops waiting after `session_timeout` even while the exchange is in flight.
    pub async fn complete_in_popup(
        &self,
        opener_origin: impl Into<String>,
        location: Url,
        session_timeout: Duration,
    ) -> Result<String, AuthError> {
        let (mut popup, session) = open_popup(opener_origin, location);
        let verdict = session.await_token(session_timeout);
        tokio::pin!(verdict);

        tokio::select! {
            verdict = &mut verdict => return verdict,
            _ = self.run(&mut popup) => {}
        }
        verdict.await
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> AuthMessage {
        let call = self.exchanger.exchange(code, redirect_uri);
        let error = match tokio::time::timeout(self.exchange_timeout, call).await {
            Ok(Ok(access_token)) => return AuthMessage::Success { access_token },
            Ok(Err(ExchangeError::Endpoint { message })) => message
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| EXCHANGE_FAILED.to_string()),
            Ok(Err(ExchangeError::Transport(_))) => NETWORK_ERROR.to_string(),
            Err(_) => EXCHANGE_TIMED_OUT.to_string(),
        };
        AuthMessage::Error { error }
    }
}

fn settle(handshake: &mut Handshake, next: HandshakeState) {
    if let Err(err) = handshake.advance(next) {
        warn!(
            target = "application::oauth::coordinator",
            error = %err,
            "Ignored illegal handshake transition"
        );
    }
}
