use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "reliefweb-sync")]
#[command(about = "ReliefWeb API client and submission sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook HTTP server
    Server(ServerArgs),
    /// Fetch the POST API JSON schema of a resource type
    Schema(SchemaArgs),
    /// Refresh a submitted resource as if ReliefWeb had pinged it
    Ping(PingArgs),
    /// Print the status of every stored resource
    List,
    /// Delete temporary attachments older than the configured grace period
    PurgeFiles,
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to, defaults to `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Schema type, for example `report`
    #[arg(default_value = "report")]
    pub kind: String,
}

#[derive(clap::Args, Debug)]
pub struct PingArgs {
    pub resource_uuid: Uuid,
}
