use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    error::{Error, Result},
    pkce::CHALLENGE_METHOD,
    types::{AuthorizationRequest, OAuthConfig, OAuthTokens, PkceSession},
};

/// Redeems an authorization code for tokens.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code(&self, code: &str, session: &PkceSession) -> Result<OAuthTokens>;
}

/// Authorization Code + PKCE flow for a public client.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Create a fresh session and the URL the user has to visit.
    pub fn start(&self) -> Result<AuthorizationRequest> {
        let session = PkceSession::new(self.config.client_id.trim());
        let url = self.authorization_url(&session)?;
        Ok(AuthorizationRequest { url, session })
    }

    pub fn authorization_url(&self, session: &PkceSession) -> Result<Url> {
        let mut url = Url::parse(&self.config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &session.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &session.state)
            .append_pair("code_challenge", &session.pkce.challenge)
            .append_pair("code_challenge_method", CHALLENGE_METHOD);
        Ok(url)
    }

    /// Exchange the authorization code. Sends the original verifier, not the
    /// challenge. A non-success status is returned as-is, never retried.
    pub async fn exchange(&self, code: &str, session: &PkceSession) -> Result<OAuthTokens> {
        debug!(token_url = %self.config.token_url, "exchanging authorization code");
        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", session.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", session.pkce.verifier.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "token exchange rejected");
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: OAuthTokens = serde_json::from_str(&body)?;
        info!(
            expires_in = tokens.expires_in,
            has_refresh_token = tokens.refresh_token.is_some(),
            "received access token"
        );
        Ok(tokens)
    }
}

#[async_trait]
impl TokenExchanger for OAuthFlow {
    async fn exchange_code(&self, code: &str, session: &PkceSession) -> Result<OAuthTokens> {
        self.exchange(code, session).await
    }
}
