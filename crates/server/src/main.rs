use lead_verifier::AppResources;
use lead_verifier::api::start_webserver;
use lead_verifier::config::load_config_or_panic;
use lead_verifier::verifier::SmtpVerifier;
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "lead_verifier=info,hyper=warn,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    // Load config
    let config = Arc::new(load_config_or_panic());

    let provider = crypto::aws_lc_rs::default_provider();
    CryptoProvider::install_default(provider)
        .map_err(|_| color_eyre::Report::msg("Failed to install crypto provider"))?;

    // Set up SeaORM database connection
    let db = Arc::new(Database::connect(&config.database_url).await?);

    let verifier = SmtpVerifier::new(config.verifier.clone())?;
    let resources = AppResources::new(db, config.clone(), Arc::new(verifier));

    tracing::info!(
        listen_addr = %config.listen_addr,
        max_concurrency = config.queue.max_concurrency,
        smtp_check = config.verifier.smtp_check,
        "Starting lead verifier"
    );

    start_webserver(resources).await?;
    Ok(())
}
