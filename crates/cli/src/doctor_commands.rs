use {
    anyhow::{Result, bail},
    chrono::Utc,
    clap::Args,
};

use {
    birdhouse_accounts::AccountStore,
    birdhouse_config::BirdhouseConfig,
    birdhouse_doctor::{HarnessOptions, verify_account},
    birdhouse_provider::HttpProviderClient,
};

use crate::store_cipher;

#[derive(Args)]
pub struct DoctorArgs {
    /// Account id or username. Defaults to the first stored account.
    #[arg(long)]
    pub account: Option<String>,
    /// Only check expiry and identity; do not publish a test post.
    #[arg(long, default_value_t = false)]
    pub skip_post: bool,
    /// Text for the test post.
    #[arg(long)]
    pub message: Option<String>,
}

pub async fn handle_doctor(args: DoctorArgs, config: &BirdhouseConfig) -> Result<()> {
    let store = AccountStore::new(&config.store.path);
    println!("Reading {}...", store.path().display());
    let doc = store.read();

    let provider = HttpProviderClient::new(&config.provider.api_base);
    let options = HarnessOptions {
        account: args.account,
        post: !args.skip_post,
        message: args.message,
        web_base: config.provider.web_base.clone(),
    };
    let report = verify_account(&doc, &store_cipher(), &provider, &options, Utc::now()).await;
    println!("\n{report}");

    if !report.passed() {
        bail!("account verification failed");
    }
    Ok(())
}
