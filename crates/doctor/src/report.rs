use std::fmt;

use {
    birdhouse_accounts::{AccountRecord, AuthType},
    birdhouse_provider::UserInfo,
    chrono::{DateTime, Utc},
};

/// How a failed test post should be remediated, keyed on the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// 403: the app or the grant lacks write permission.
    Permission,
    /// 401: the token is invalid, expired or revoked.
    InvalidCredential,
    Other,
}

impl FailureCategory {
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(403) => Self::Permission,
            Some(401) => Self::InvalidCredential,
            _ => Self::Other,
        }
    }

    pub fn guidance(self) -> &'static [&'static str] {
        match self {
            Self::Permission => &[
                "A 403 usually means the app lacks write permission.",
                "Open the developer portal, select the app and go to its settings.",
                "Under \"User authentication settings\" enable \"Read and write\".",
                "Reconnect the account after changing permissions.",
            ],
            Self::InvalidCredential => &[
                "A 401 usually means the access token is invalid or expired.",
                "The user may have revoked access.",
                "Reconnect the account with `birdhouse auth login`.",
            ],
            Self::Other => &[
                "App permissions must include \"Read and write\".",
                "The granted scopes must include tweet.write.",
                "The user must authorize with write permissions.",
                "Check whether API rate limits are exceeded.",
            ],
        }
    }
}

/// Why verification stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("no accounts found in the account store")]
    NoAccounts,

    #[error("no stored account matches \"{0}\"")]
    AccountNotFound(String),

    #[error("auth type {0:?} cannot be verified with a bearer token")]
    UnsupportedAuthType(AuthType),

    #[error("the account has no stored access token")]
    MissingToken,

    #[error("token is EXPIRED (expired {minutes_ago} minutes ago)")]
    Expired { minutes_ago: i64 },

    #[error("could not decrypt the access token: {0}")]
    Decrypt(String),

    #[error("identity check failed: {0}")]
    Identity(String),

    #[error("test post failed: {message}")]
    Post {
        category: FailureCategory,
        message: String,
    },
}

impl Failure {
    /// Remediation lines printed under the failure.
    pub fn guidance(&self) -> &'static [&'static str] {
        match self {
            Self::NoAccounts | Self::AccountNotFound(_) => {
                &["Connect an account with `birdhouse auth login`."]
            },
            Self::UnsupportedAuthType(_) | Self::MissingToken | Self::Expired { .. } => &[
                "The account needs to be reconnected with fresh credentials.",
                "Run `birdhouse auth login` to get a new access token.",
            ],
            Self::Decrypt(_) => &[
                "ACCOUNT_STORE_KEY must be the key the account was saved with.",
                "If the key was lost, reconnect the account.",
            ],
            Self::Identity(_) => &[
                "Check that the access token is correct.",
                "Verify the app has \"Read and write\" permissions.",
                "The token may be expired or revoked.",
            ],
            Self::Post { category, .. } => category.guidance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub auth_type: AuthType,
    pub verified: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AccountRecord> for AccountSummary {
    fn from(record: &AccountRecord) -> Self {
        Self {
            id: record.id.clone(),
            username: record.username.clone(),
            display_name: record.display_name.clone(),
            auth_type: record.auth_type,
            verified: record.verified,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Unknown,
    Remaining { minutes: i64 },
    Overdue { minutes: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub text: String,
    pub url: String,
}

/// Everything the harness learned, in the order it learned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub account: Option<AccountSummary>,
    pub expiry: Option<ExpiryStatus>,
    pub token_length: Option<usize>,
    pub identity: Option<UserInfo>,
    pub test_message: Option<String>,
    pub post: Option<PublishedPost>,
    pub post_skipped: bool,
    pub failure: Option<Failure>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub(crate) fn fail(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }
}

fn auth_type_label(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::OAuth2 => "oauth2",
        AuthType::OAuth1 => "oauth1",
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(account) = &self.account {
            writeln!(
                f,
                "Testing account: @{} ({})",
                account.username, account.display_name
            )?;
            writeln!(f, "   Auth type:  {}", auth_type_label(account.auth_type))?;
            writeln!(f, "   Verified:   {}", account.verified)?;
            match account.expires_at {
                Some(at) => writeln!(f, "   Expires at: {}", at.to_rfc3339())?,
                None => writeln!(f, "   Expires at: unknown")?,
            }
        }

        match self.expiry {
            Some(ExpiryStatus::Remaining { minutes }) => {
                writeln!(f, "   ✓ Token is valid (expires in {minutes} minutes)")?
            },
            Some(ExpiryStatus::Unknown) => {
                writeln!(f, "   ? Token expiry unknown, continuing")?
            },
            Some(ExpiryStatus::Overdue { .. }) | None => {},
        }

        if let Some(len) = self.token_length {
            writeln!(f, "\nDecrypting access token...")?;
            writeln!(f, "   ✓ Access token decrypted (length: {len})")?;
        }

        if let Some(user) = &self.identity {
            writeln!(f, "\nTest 1: verifying credentials...")?;
            writeln!(f, "   ✓ Account verified:")?;
            writeln!(f, "      ID:       {}", user.id)?;
            writeln!(f, "      Username: @{}", user.username)?;
            writeln!(f, "      Name:     {}", user.name)?;
        }

        if let Some(message) = &self.test_message {
            writeln!(f, "\nTest 2: posting a test message...")?;
            writeln!(f, "   Message: \"{message}\"")?;
        }

        if let Some(post) = &self.post {
            writeln!(f, "   ✓ Post created:")?;
            writeln!(f, "      Post ID: {}", post.id)?;
            writeln!(f, "      Text:    {}", post.text)?;
            writeln!(f, "      URL:     {}", post.url)?;
        }

        if self.post_skipped && self.passed() {
            writeln!(f, "\nTest 2 skipped (--skip-post)")?;
        }

        match &self.failure {
            None => writeln!(f, "\n✓ All checks passed.")?,
            Some(failure) => {
                writeln!(f, "\n✗ FAILED: {failure}")?;
                writeln!(f, "\nTo fix this:")?;
                for line in failure.guidance() {
                    writeln!(f, "   - {line}")?;
                }
            },
        }
        Ok(())
    }
}
