//! Opener/popup pair connected by an origin-scoped message channel.

use std::time::Duration;

use pressroom_api_types::AuthMessage;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;
use url::Url;

/// How long the opener waits for the popup before giving up.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Provider(String),
    #[error("authentication cancelled")]
    Cancelled,
    #[error("authentication timed out")]
    TimedOut,
}

/// Browsing context the coordinator runs in.
pub trait ChildContext: Send {
    fn location(&self) -> &Url;

    /// Origin of the window that opened this context.
    fn opener_origin(&self) -> &str;

    /// Deliver `message` to the opener if, and only if, its origin equals `target_origin`.
    fn post_to_opener(&mut self, message: &AuthMessage, target_origin: &str);

    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    Message {
        origin: String,
        message: AuthMessage,
    },
    Closed,
}

/// Open a popup at `location` for an opener served from `opener_origin`.
pub fn open_popup(opener_origin: impl Into<String>, location: Url) -> (PopupWindow, AuthSession) {
    let opener_origin = opener_origin.into();
    let (sender, events) = unbounded_channel();
    let popup = PopupWindow {
        opener_origin: opener_origin.clone(),
        location,
        sender: Some(sender),
    };
    let session = AuthSession {
        opener_origin,
        events,
    };
    (popup, session)
}

/// Popup side of the pair. Dropping it closes the popup.
#[derive(Debug)]
pub struct PopupWindow {
    opener_origin: String,
    location: Url,
    sender: Option<UnboundedSender<PopupEvent>>,
}

impl PopupWindow {
    pub fn navigate(&mut self, location: Url) {
        self.location = location;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }
}

impl ChildContext for PopupWindow {
    fn location(&self) -> &Url {
        &self.location
    }

    fn opener_origin(&self) -> &str {
        &self.opener_origin
    }

    fn post_to_opener(&mut self, message: &AuthMessage, target_origin: &str) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        if target_origin != self.opener_origin {
            debug!(
                target = "application::oauth::session",
                target_origin,
                opener_origin = %self.opener_origin,
                "Dropped message addressed to a different origin"
            );
            return;
        }
        let _ = sender.send(PopupEvent::Message {
            origin: self.location.origin().ascii_serialization(),
            message: message.clone(),
        });
    }

    fn close(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(PopupEvent::Closed);
        }
    }
}

impl Drop for PopupWindow {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opener side of the pair.
#[derive(Debug)]
pub struct AuthSession {
    opener_origin: String,
    events: UnboundedReceiver<PopupEvent>,
}

impl AuthSession {
    /// Wait for the popup's verdict. Messages from other origins are ignored.
    pub async fn await_token(mut self, timeout: Duration) -> Result<String, AuthError> {
        match tokio::time::timeout(timeout, self.next_verdict()).await {
            Ok(verdict) => verdict,
            Err(_) => Err(AuthError::TimedOut),
        }
    }

    async fn next_verdict(&mut self) -> Result<String, AuthError> {
        loop {
            match self.events.recv().await {
                Some(PopupEvent::Message { origin, message }) if origin == self.opener_origin => {
                    return match message {
                        AuthMessage::Success { access_token } => Ok(access_token),
                        AuthMessage::Error { error } => Err(AuthError::Provider(error)),
                    };
                }
                Some(PopupEvent::Message { origin, .. }) => {
                    debug!(
                        target = "application::oauth::session",
                        origin = %origin,
                        "Ignored message from foreign origin"
                    );
                }
                Some(PopupEvent::Closed) | None => return Err(AuthError::Cancelled),
            }
        }
    }
}
