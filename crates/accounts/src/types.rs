use {
    chrono::{DateTime, Utc},
    secrecy::{ExposeSecret, SecretString},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{Result, TokenCipher};

/// How an account authenticates against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    /// OAuth 2.0 user-context bearer token.
    #[serde(rename = "oauth2")]
    OAuth2,
    /// Legacy OAuth 1.0a signed requests. Read and preserved, never created here.
    #[serde(rename = "oauth1")]
    OAuth1,
}

/// One connected identity as persisted in the account store.
///
/// The display name is written as `name`. Older stores may carry
/// `displayName` instead of, or next to, `name`; it is read as a fallback and
/// kept in `extra` so rewrites don't drop it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AccountRecordRepr")]
pub struct AccountRecord {
    pub id: String,
    pub username: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// Keys this version does not know about, kept so rewrites don't drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape accepted when reading a record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecordRepr {
    id: String,
    username: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    auth_type: AuthType,
    #[serde(default)]
    encrypted_access_token: Option<String>,
    #[serde(default)]
    encrypted_refresh_token: Option<String>,
    #[serde(default)]
    encrypted_client_id: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<AccountRecordRepr> for AccountRecord {
    fn from(repr: AccountRecordRepr) -> Self {
        let mut extra = repr.extra;
        if let Some(legacy) = &repr.display_name {
            extra.insert("displayName".into(), Value::String(legacy.clone()));
        }
        let display_name = repr.name.or(repr.display_name).unwrap_or_default();

        Self {
            id: repr.id,
            username: repr.username,
            display_name,
            auth_type: repr.auth_type,
            encrypted_access_token: repr.encrypted_access_token,
            encrypted_refresh_token: repr.encrypted_refresh_token,
            encrypted_client_id: repr.encrypted_client_id,
            expires_at: repr.expires_at,
            verified: repr.verified,
            added_at: repr.added_at,
            extra,
        }
    }
}

/// Identity returned by the provider's "who am I" endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

/// Plaintext secrets for a freshly authorized account.
#[derive(Debug)]
pub struct AccountSecrets {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub client_id: String,
}

impl AccountRecord {
    /// Build a verified OAuth 2.0 record, sealing each secret individually.
    ///
    /// A missing refresh token leaves the field out rather than sealing an
    /// empty string.
    pub fn seal_oauth2(
        identity: AccountIdentity,
        secrets: &AccountSecrets,
        expires_at: Option<DateTime<Utc>>,
        cipher: &TokenCipher,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let encrypted_refresh_token = secrets
            .refresh_token
            .as_ref()
            .map(|t| cipher.encrypt(t.expose_secret()))
            .transpose()?;

        Ok(Self {
            id: identity.id,
            username: identity.username,
            display_name: identity.display_name,
            auth_type: AuthType::OAuth2,
            encrypted_access_token: Some(cipher.encrypt(secrets.access_token.expose_secret())?),
            encrypted_refresh_token,
            encrypted_client_id: Some(cipher.encrypt(&secrets.client_id)?),
            expires_at,
            verified: true,
            added_at: Some(now),
            extra: Map::new(),
        })
    }

    /// True when `expires_at` is known and strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t < now)
    }

    /// Matches either the provider id or the username (with or without `@`).
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.id == key || self.username.eq_ignore_ascii_case(key.trim_start_matches('@'))
    }
}
