use std::time::Duration;

use {
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
    url::Url,
};

use crate::pkce;

/// OAuth 2.0 provider configuration for a public (secretless) client.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    /// Must match the redirect URI registered with the provider byte for byte.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

/// Tokens returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub struct OAuthTokens {
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl OAuthTokens {
    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }
}

/// PKCE challenge pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// One in-flight authorization: created when the flow starts, consumed by the
/// first callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceSession {
    pub pkce: PkceChallenge,
    pub state: String,
    pub client_id: String,
}

impl PkceSession {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            pkce: pkce::generate_pkce(),
            state: pkce::generate_state(),
            client_id: client_id.into(),
        }
    }
}

/// Authorization URL to show the user, plus the session it belongs to.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub session: PkceSession,
}
