use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webwatch::{
    audit::PagespeedInvoker,
    config::AppConfig,
    http_client::create_retryable_http_client,
    persistence::SqliteRepository,
    probe::HttpProber,
    supervisor::Supervisor,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the `app.yaml` configuration file.
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the monitoring supervisor.
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_supervisor(cli.config_dir.as_deref()).await?,
    }

    Ok(())
}

async fn run_supervisor(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(database_url = %config.database_url, audit_endpoint = %config.audit_endpoint, "Configuration loaded.");

    tracing::debug!("Initializing repository...");
    let repo = Arc::new(SqliteRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let prober = Arc::new(HttpProber::new(config.probe_timeout));

    let audit_client =
        create_retryable_http_client(&config.http_retry, reqwest::Client::new());
    let invoker = Arc::new(PagespeedInvoker::new(
        audit_client,
        config.audit_endpoint.clone(),
        config.audit_api_key.clone(),
        config.audit_timeout,
    ));
    tracing::info!(retry_policy = ?config.http_retry, "Audit engine client initialized with retry policy.");

    let supervisor = Supervisor::builder()
        .config(config)
        .repository(repo)
        .prober(prober)
        .invoker(invoker)
        .build()
        .await?;

    tracing::info!("Supervisor initialized, starting monitoring...");

    supervisor.run().await?;

    Ok(())
}
