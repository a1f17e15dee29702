use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, SecretString},
    serde::de::DeserializeOwned,
    tracing::debug,
};

use crate::{
    error::{ProviderError, Result},
    types::{CreatedPost, DataEnvelope, UserInfo},
};

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

/// Bearer-authenticated calls made with a user access token.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Identify the user owning `access_token`.
    async fn whoami(&self, access_token: &SecretString) -> Result<UserInfo>;

    /// Publish a text post as that user.
    async fn create_post(&self, access_token: &SecretString, text: &str) -> Result<CreatedPost>;
}

/// reqwest-backed [`ProviderClient`] for the v2 REST API.
pub struct HttpProviderClient {
    client: reqwest::Client,
    api_base: String,
}

impl HttpProviderClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

impl Default for HttpProviderClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

/// Turn a response into `T` from its `data` envelope, or an `Api` error carrying the body.
async fn read_data<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    let envelope: DataEnvelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.data)
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn whoami(&self, access_token: &SecretString) -> Result<UserInfo> {
        debug!("fetching authenticated user");
        let resp = self
            .client
            .get(self.url("/2/users/me"))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;
        read_data(resp).await
    }

    async fn create_post(&self, access_token: &SecretString, text: &str) -> Result<CreatedPost> {
        debug!(len = text.len(), "creating post");
        let resp = self
            .client
            .post(self.url("/2/tweets"))
            .bearer_auth(access_token.expose_secret())
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        read_data(resp).await
    }
}
