//! mcwatchctl - control CLI for mcwatchd

use anyhow::Result;
use clap::Parser;
use mcwatchctl::cli::{Cli, Commands, TrackCommands};
use mcwatchctl::client::DaemonClient;
use mcwatchctl::output;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new(&cli.url)?;

    match cli.command {
        Commands::Status { server, json } => {
            let status = client.status(&server).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", output::format_status(&server, &status));
            }
        }
        Commands::Servers { json } => {
            let servers = client.servers().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&servers)?);
            } else {
                println!("{}", output::format_servers(&servers));
            }
        }
        Commands::Track { action } => match action {
            TrackCommands::On { server, channel } => {
                println!("{}", client.track_on(&server, channel).await?);
            }
            TrackCommands::Off { server } => {
                println!("{}", client.track_off(&server).await?);
            }
            TrackCommands::List => {
                println!("{}", output::format_tracking(&client.tracking().await?));
            }
        },
    }

    Ok(())
}
