pub mod callback_server;
pub mod error;
pub mod flow;
pub mod pages;
pub mod pkce;
pub mod types;

pub use {
    callback_server::{AuthorizationHandler, CallbackParams, CallbackServer, validate_callback},
    error::{Error, Result},
    flow::{OAuthFlow, TokenExchanger},
    pkce::{CHALLENGE_METHOD, base64url, generate_pkce, generate_state},
    types::{AuthorizationRequest, OAuthConfig, OAuthTokens, PkceChallenge, PkceSession},
};
