use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration. Every field has a default so an absent file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BirdhouseConfig {
    pub provider: ProviderConfig,
    pub callback: CallbackConfig,
    pub store: StoreConfig,
}

/// Provider endpoints and the scopes requested during authorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub auth_url: String,
    pub token_url: String,
    /// Base URL for REST calls (`/2/users/me`, `/2/tweets`).
    pub api_base: String,
    /// Public profile base used to build links to created posts.
    pub web_base: String,
    pub scopes: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://twitter.com/i/oauth2/authorize".into(),
            token_url: "https://api.twitter.com/2/oauth2/token".into(),
            api_base: "https://api.twitter.com".into(),
            web_base: "https://twitter.com".into(),
            scopes: vec![
                "tweet.read".into(),
                "tweet.write".into(),
                "users.read".into(),
                "offline.access".into(),
            ],
        }
    }
}

/// Local callback listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CallbackConfig {
    /// Address the listener binds to.
    pub bind: String,
    /// Host used in the redirect URI. Must match the provider registration.
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Delay between the terminal callback and listener shutdown.
    pub grace_ms: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            host: "localhost".into(),
            port: 3002,
            path: "/callback".into(),
            grace_ms: 2000,
        }
    }
}

impl CallbackConfig {
    /// Listener route, with the leading `/` added when the file leaves it out.
    pub fn route_path(&self) -> String {
        let path = self.path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// Redirect URI registered with the provider, e.g. `http://localhost:3002/callback`.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.route_path())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./server/accounts.json"),
        }
    }
}
