use {
    anyhow::{Result, bail},
    chrono::{DateTime, Utc},
    clap::Subcommand,
};

use {
    birdhouse_accounts::AccountStore,
    birdhouse_config::BirdhouseConfig,
    birdhouse_onboarding::{SetupOptions, print_summary, run_setup},
};

use crate::store_cipher;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Connect an account through the OAuth 2.0 PKCE browser flow.
    Login {
        /// App client id. Prompted for when not given.
        #[arg(long, env = "BIRDHOUSE_CLIENT_ID")]
        client_id: Option<String>,
        /// Open the authorization URL in the default browser.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// Show every stored account and its token expiry.
    Status,
    /// Remove a stored account.
    Logout {
        /// Account id or username.
        #[arg(long)]
        account: String,
    },
}

pub async fn handle_auth(action: AuthAction, config: &BirdhouseConfig) -> Result<()> {
    match action {
        AuthAction::Login { client_id, open } => login(config, client_id, open).await,
        AuthAction::Status => status(config),
        AuthAction::Logout { account } => logout(config, &account),
    }
}

async fn login(config: &BirdhouseConfig, client_id: Option<String>, open: bool) -> Result<()> {
    let account = run_setup(config, store_cipher(), SetupOptions {
        client_id,
        open_browser: open,
    })
    .await?;
    print_summary(&account);
    Ok(())
}

fn expiry_label(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = expires_at else {
        return "expiry unknown".to_string();
    };
    if at >= now {
        let remaining = (at - now).num_seconds();
        let hours = remaining / 3600;
        let mins = (remaining % 3600) / 60;
        format!("valid ({hours}h {mins}m remaining)")
    } else {
        "expired".to_string()
    }
}

fn status(config: &BirdhouseConfig) -> Result<()> {
    let store = AccountStore::new(&config.store.path);
    let doc = store.read();
    if doc.unreadable_count() > 0 {
        println!(
            "{} unreadable entries in {} are kept as-is.",
            doc.unreadable_count(),
            store.path().display()
        );
    }
    if doc.is_empty() {
        println!("No connected accounts in {}.", store.path().display());
        return Ok(());
    }
    let now = Utc::now();
    for account in &doc.accounts {
        println!(
            "@{} ({}) id={} [{}]",
            account.username,
            account.display_name,
            account.id,
            expiry_label(account.expires_at, now)
        );
    }
    Ok(())
}

fn logout(config: &BirdhouseConfig, key: &str) -> Result<()> {
    let store = AccountStore::new(&config.store.path);
    match store.remove(key)? {
        Some(removed) => {
            println!("Removed @{} ({})", removed.username, removed.id);
            Ok(())
        },
        None => bail!("no stored account matches \"{key}\""),
    }
}
