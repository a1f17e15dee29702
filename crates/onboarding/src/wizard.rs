use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, bail},
    tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    tracing::{info, warn},
};

use {
    birdhouse_accounts::{AccountStore, TokenCipher},
    birdhouse_config::BirdhouseConfig,
    birdhouse_oauth::{CallbackServer, OAuthConfig, OAuthFlow},
    birdhouse_provider::HttpProviderClient,
};

use crate::connect::{ConnectHandler, ConnectedAccount};

const RULE: &str = "═════════════════════════════════════════════════════════";

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Client id from the provider's developer portal. Prompted for when absent.
    pub client_id: Option<String>,
    /// Open the authorization URL in the default browser.
    pub open_browser: bool,
}

fn print_banner(redirect_uri: &str) {
    println!(
        "
Birdhouse account setup (OAuth 2.0 user context)

This connects an account with tokens that are allowed to post.

Before you start:
  1. Open the developer portal and select your app
  2. Under \"User authentication settings\" set permissions to \"Read and write\"
  3. Set the app type to \"Web App\"
  4. Add the callback URL: {redirect_uri}
  5. Save and copy the Client ID
"
    );
}

async fn prompt(question: &str) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Run the interactive setup: PKCE session, local callback listener,
/// authorization URL, then wait for the provider redirect.
pub async fn run_setup(
    config: &BirdhouseConfig,
    cipher: TokenCipher,
    options: SetupOptions,
) -> anyhow::Result<ConnectedAccount> {
    let redirect_uri = config.callback.redirect_uri();
    print_banner(&redirect_uri);

    let client_id = match options.client_id {
        Some(id) => id.trim().to_string(),
        None => prompt("Enter your app Client ID: ").await?,
    };
    if client_id.is_empty() {
        bail!("a client ID is required");
    }

    println!("\nStarting OAuth 2.0 Authorization Code flow with PKCE...\n");
    let flow = OAuthFlow::new(OAuthConfig {
        client_id,
        auth_url: config.provider.auth_url.clone(),
        token_url: config.provider.token_url.clone(),
        redirect_uri,
        scopes: config.provider.scopes.clone(),
    });
    let request = flow.start()?;

    let handler = Arc::new(ConnectHandler::new(
        flow,
        HttpProviderClient::new(&config.provider.api_base),
        AccountStore::new(&config.store.path),
        cipher,
    ));
    let bind_addr = format!("{}:{}", config.callback.bind, config.callback.port);
    let route = config.callback.route_path();
    let server = CallbackServer::start(&bind_addr, &route, request.session, handler)
        .await
        .with_context(|| format!("could not start the callback listener on {bind_addr}{route}"))?;
    println!("✓ Local callback server started on {}", server.local_addr());

    println!("\n{RULE}\nOpen this URL in your browser:\n{RULE}");
    println!("{}", request.url);
    println!("{RULE}\n");

    if options.open_browser && open::that(request.url.as_str()).is_err() {
        warn!("could not open a browser, open the URL manually");
    }

    println!("Waiting for authorization (Ctrl-C to abort)...\n");
    let grace = Duration::from_millis(config.callback.grace_ms);
    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let account = server.wait_or_cancel(grace, cancel).await?;
    info!(username = %account.user.username, "setup complete");
    Ok(account)
}

/// Console summary printed after a successful setup.
pub fn print_summary(account: &ConnectedAccount) {
    let expires = account
        .expires_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".into());
    println!("\n{RULE}");
    println!("  SUCCESS! Account connected");
    println!("{RULE}");
    println!("  Username:          @{}", account.user.username);
    println!("  Name:              {}", account.user.name);
    println!("  ID:                {}", account.user.id);
    println!("  Token expires:     {expires}");
    println!(
        "  Has refresh token: {}",
        if account.has_refresh_token { "yes" } else { "no" }
    );
    println!("  Saved to:          {}", account.store_path.display());
    println!("{RULE}\n");
}
