use std::path::PathBuf;

use {
    async_trait::async_trait,
    chrono::{DateTime, TimeDelta, Utc},
    tracing::info,
};

use {
    birdhouse_accounts::{AccountIdentity, AccountRecord, AccountSecrets, AccountStore, TokenCipher},
    birdhouse_oauth::{AuthorizationHandler, Error, PkceSession, Result, TokenExchanger, pages},
    birdhouse_provider::{ProviderClient, UserInfo},
};

/// An account that completed the flow and was written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccount {
    pub user: UserInfo,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub store_path: PathBuf,
}

/// Finishes an accepted callback: exchange the code, confirm the identity,
/// seal the tokens and upsert the account record.
pub struct ConnectHandler<E, P> {
    exchanger: E,
    provider: P,
    store: AccountStore,
    cipher: TokenCipher,
}

impl<E, P> ConnectHandler<E, P> {
    pub fn new(exchanger: E, provider: P, store: AccountStore, cipher: TokenCipher) -> Self {
        Self {
            exchanger,
            provider,
            store,
            cipher,
        }
    }
}

fn expiry_from(expires_in: Option<u64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(expires_in?).ok()?;
    now.checked_add_signed(TimeDelta::try_seconds(secs)?)
}

#[async_trait]
impl<E, P> AuthorizationHandler for ConnectHandler<E, P>
where
    E: TokenExchanger + 'static,
    P: ProviderClient + 'static,
{
    type Output = ConnectedAccount;

    async fn complete(&self, code: &str, session: &PkceSession) -> Result<ConnectedAccount> {
        println!("  Exchanging code for access token...");
        let tokens = self.exchanger.exchange_code(code, session).await?;
        println!("✓ Access token received");

        println!("  Verifying identity with the provider...");
        let user = self
            .provider
            .whoami(&tokens.access_token)
            .await
            .map_err(|e| Error::Verification(e.to_string()))?;
        println!("✓ User verified: @{} ({})", user.username, user.name);

        let now = Utc::now();
        let expires_at = expiry_from(tokens.expires_in, now);
        let has_refresh_token = tokens.refresh_token.is_some();
        let secrets = AccountSecrets {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            client_id: session.client_id.clone(),
        };
        let identity = AccountIdentity {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.name.clone(),
        };

        println!("  Saving account to {}...", self.store.path().display());
        let record = AccountRecord::seal_oauth2(identity, &secrets, expires_at, &self.cipher, now)
            .map_err(|e| Error::Persist(e.to_string()))?;
        self.store
            .upsert(record)
            .map_err(|e| Error::Persist(e.to_string()))?;
        info!(account_id = %user.id, username = %user.username, "account saved");

        Ok(ConnectedAccount {
            user,
            expires_at,
            has_refresh_token,
            store_path: self.store.path().to_path_buf(),
        })
    }

    fn success_page(&self, account: &ConnectedAccount) -> String {
        let refresh = if account.has_refresh_token {
            "Available"
        } else {
            "Not provided"
        };
        pages::success_page(
            "Account Connected Successfully!",
            &[
                ("Username:", format!("@{}", account.user.username)),
                ("Name:", account.user.name.clone()),
                ("User ID:", account.user.id.clone()),
                ("Token Type:", "OAuth 2.0 User Context".to_string()),
                ("Refresh Token:", refresh.to_string()),
            ],
            "Your account can now post.",
        )
    }
}
