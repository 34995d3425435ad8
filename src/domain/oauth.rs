//! Authorization-code handshake state and redirect parsing.

use url::Url;

use crate::domain::error::DomainError;

pub const NO_CODE_RECEIVED: &str = "No authorization code received";
pub const EXCHANGE_FAILED: &str = "Failed to exchange code for token";
pub const NETWORK_ERROR: &str = "Network error during authentication";
pub const EXCHANGE_TIMED_OUT: &str = "Token exchange timed out";

/// Query parameters the identity provider appends to the redirect target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// What a redirect asks the coordinator to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Code(String),
    Denied(String),
    MissingCode,
}

impl RedirectParams {
    /// Read the first occurrence of each parameter; empty values count as absent.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (name, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let slot = match name.as_ref() {
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// An `error` wins over a `code`; the description is preferred over the bare error.
    pub fn classify(&self) -> RedirectOutcome {
        if let Some(error) = &self.error {
            let message = self
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            return RedirectOutcome::Denied(message);
        }
        match &self.code {
            Some(code) => RedirectOutcome::Code(code.clone()),
            None => RedirectOutcome::MissingCode,
        }
    }
}

/// Redirect URI registered with the provider: the current location without query or fragment.
pub fn redirect_uri_from(location: &Url) -> String {
    let mut uri = location.clone();
    uri.set_query(None);
    uri.set_fragment(None);
    uri.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingRedirect,
    Exchanging,
    Succeeded,
    Failed,
}

impl HandshakeState {
    pub fn as_str(self) -> &'static str {
        match self {
            HandshakeState::AwaitingRedirect => "awaiting_redirect",
            HandshakeState::Exchanging => "exchanging",
            HandshakeState::Succeeded => "succeeded",
            HandshakeState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::Succeeded | HandshakeState::Failed)
    }

    fn allows(self, next: HandshakeState) -> bool {
        matches!(
            (self, next),
            (HandshakeState::AwaitingRedirect, HandshakeState::Exchanging)
                | (HandshakeState::AwaitingRedirect, HandshakeState::Failed)
                | (HandshakeState::Exchanging, HandshakeState::Succeeded)
                | (HandshakeState::Exchanging, HandshakeState::Failed)
        )
    }
}

/// One popup's handshake. Terminal states accept no further transitions.
#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::AwaitingRedirect,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn advance(&mut self, next: HandshakeState) -> Result<(), DomainError> {
        if !self.state.allows(next) {
            return Err(DomainError::IllegalTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }
}
