use {
    birdhouse_accounts::{AuthType, StoreDocument, TokenCipher},
    birdhouse_provider::ProviderClient,
    chrono::{DateTime, Utc},
    secrecy::ExposeSecret,
    tracing::{info, warn},
};

use crate::report::{
    AccountSummary, ExpiryStatus, Failure, FailureCategory, PublishedPost, VerificationReport,
};

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Account id or username. The first stored account when `None`.
    pub account: Option<String>,
    /// Publish a test post after the identity check.
    pub post: bool,
    /// Test post text. A timestamped default when `None`.
    pub message: Option<String>,
    /// Public site base used to build the post URL.
    pub web_base: String,
}

pub fn default_test_message(now: DateTime<Utc>) -> String {
    format!(
        "Test post from birdhouse - {} 🚀",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Whole minutes between two instants, rounded to the nearest minute.
fn rounded_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_seconds() + 30).div_euclid(60)
}

/// Verify one stored account: expiry, decryption, identity, then optionally a
/// live test post. Stops at the first failure; an expired token makes no
/// network calls at all.
pub async fn verify_account(
    doc: &StoreDocument,
    cipher: &TokenCipher,
    provider: &dyn ProviderClient,
    options: &HarnessOptions,
    now: DateTime<Utc>,
) -> VerificationReport {
    let mut report = VerificationReport {
        post_skipped: !options.post,
        ..Default::default()
    };

    if doc.is_empty() {
        return report.fail(Failure::NoAccounts);
    }
    let Some(record) = doc.select(options.account.as_deref()) else {
        let key = options.account.clone().unwrap_or_default();
        return report.fail(Failure::AccountNotFound(key));
    };
    report.account = Some(AccountSummary::from(record));
    info!(account_id = %record.id, username = %record.username, "verifying account");

    match record.expires_at {
        Some(at) if record.is_expired_at(now) => {
            let minutes_ago = rounded_minutes(at, now);
            report.expiry = Some(ExpiryStatus::Overdue {
                minutes: minutes_ago,
            });
            return report.fail(Failure::Expired { minutes_ago });
        },
        Some(at) => {
            report.expiry = Some(ExpiryStatus::Remaining {
                minutes: rounded_minutes(now, at),
            });
        },
        None => report.expiry = Some(ExpiryStatus::Unknown),
    }

    if record.auth_type != AuthType::OAuth2 {
        return report.fail(Failure::UnsupportedAuthType(record.auth_type));
    }
    let Some(encrypted) = record.encrypted_access_token.as_deref() else {
        return report.fail(Failure::MissingToken);
    };
    let access_token = match cipher.decrypt_secret(encrypted) {
        Ok(token) => token,
        Err(e) => {
            warn!(account_id = %record.id, error = %e, "access token did not decrypt");
            return report.fail(Failure::Decrypt(e.to_string()));
        },
    };
    report.token_length = Some(access_token.expose_secret().len());

    match provider.whoami(&access_token).await {
        Ok(user) => report.identity = Some(user),
        Err(e) => {
            warn!(account_id = %record.id, error = %e, "identity check failed");
            return report.fail(Failure::Identity(e.to_string()));
        },
    }

    if !options.post {
        return report;
    }

    let message = options
        .message
        .clone()
        .unwrap_or_else(|| default_test_message(now));
    report.test_message = Some(message.clone());

    match provider.create_post(&access_token, &message).await {
        Ok(created) => {
            info!(account_id = %record.id, post_id = %created.id, "test post created");
            let url = format!(
                "{}/{}/status/{}",
                options.web_base.trim_end_matches('/'),
                record.username,
                created.id
            );
            report.post = Some(PublishedPost {
                id: created.id,
                text: created.text,
                url,
            });
            report
        },
        Err(e) => {
            let category = FailureCategory::from_status(e.status());
            warn!(account_id = %record.id, ?category, error = %e, "test post failed");
            report.fail(Failure::Post {
                category,
                message: e.to_string(),
            })
        },
    }
}
