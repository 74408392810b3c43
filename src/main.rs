mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use reliefweb_sync::api::{self, AppState, models::ResourceSnapshot};
use reliefweb_sync::config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Server(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            let state = AppState::build(config)?;
            api::run(address, state).await?;
        }
        Commands::Schema(args) => {
            let state = AppState::build(config)?;
            match state.resources.client().get_post_api_json_schema(&args.kind).await? {
                Some(schema) => {
                    info!(kind = %args.kind, bytes = schema.raw.len(), "Schema retrieved");
                    println!("{}", serde_json::to_string_pretty(&schema.decoded)?);
                }
                None => warn!(kind = %args.kind, "Unable to retrieve the JSON schema"),
            }
        }
        Commands::Ping(args) => {
            let state = AppState::build(config)?;
            let outcome = state.resources.handle_ping(&args.resource_uuid).await?;
            state.resources.flush()?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::List => {
            let state = AppState::build(config)?;
            let snapshots: Vec<ResourceSnapshot> = state
                .resources
                .store()
                .list()?
                .iter()
                .map(ResourceSnapshot::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Commands::PurgeFiles => {
            let grace = config.storage.temporary_grace;
            let state = AppState::build(config)?;
            let purged = state
                .resources
                .attachments()
                .purge_temporary(grace.as_duration())
                .await?;
            info!(purged, grace = %grace, "Temporary attachments purged");
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
