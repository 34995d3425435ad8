mod coordinator;
mod issuer;
mod session;

pub use coordinator::{
    DEFAULT_EXCHANGE_TIMEOUT, ExchangeError, HandshakeReport, METRIC_OAUTH_HANDSHAKES_TOTAL,
    OAuthCoordinator, TokenExchanger,
};
pub use issuer::{IssuedToken, IssuerError, TokenIssuer};
pub use session::{
    AuthError, AuthSession, ChildContext, DEFAULT_SESSION_TIMEOUT, PopupEvent, PopupWindow,
    open_popup,
};
