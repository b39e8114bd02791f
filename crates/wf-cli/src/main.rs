// SPDX-License-Identifier: MIT

//! `wf`: a thin HTTP client for a running `wfd` server profile (§6).

mod client;
mod exit_error;

use clap::{Parser, Subcommand};
use client::Client;
use exit_error::ExitError;
use std::path::PathBuf;
use wf_core::NodeId;

#[derive(Parser)]
#[command(name = "wf", about = "Client for the workflow engine daemon")]
struct Cli {
    /// Base URL of the daemon's HTTP API, e.g. https://wf.example.com.
    #[arg(long, env = "WF_URL")]
    url: String,

    /// Bearer token from the server's token file.
    #[arg(long, env = "WF_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one or more nodes from a JSON file (an array of node objects).
    Add {
        /// Path to a JSON file holding an array of nodes; `-` reads stdin.
        file: PathBuf,
    },
    /// Queue one or more nodes for killing.
    Kill {
        /// Ids of the nodes to kill.
        ids: Vec<String>,
    },
    /// Fetch a node and its full history.
    Get {
        /// Id of the node to fetch.
        id: String,
    },
    /// Tail the rate-limited change stream until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::from(e.code.clamp(0, 255) as u8)
        }
    }
}

async fn run() -> Result<(), ExitError> {
    let cli = Cli::parse();
    let client = Client::new(cli.url, cli.token);

    match cli.command {
        Command::Add { file } => add(&client, &file).await,
        Command::Kill { ids } => kill(&client, ids).await,
        Command::Get { id } => get(&client, &id).await,
        Command::Watch => watch(&client).await,
    }
}

async fn add(client: &Client, file: &PathBuf) -> Result<(), ExitError> {
    let raw = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())
            .map_err(|e| ExitError::new(2, format!("failed to read stdin: {e}")))?
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| ExitError::new(2, format!("failed to read {}: {e}", file.display())))?
    };
    let nodes: Vec<wf_core::Node> =
        serde_json::from_str(&raw).map_err(|e| ExitError::new(2, format!("invalid node JSON: {e}")))?;
    let response = client.add_nodes(nodes).await?;
    println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
    Ok(())
}

async fn kill(client: &Client, ids: Vec<String>) -> Result<(), ExitError> {
    let ids = ids.into_iter().map(NodeId::from_string).collect();
    let response = client.kill(ids).await?;
    println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
    Ok(())
}

async fn get(client: &Client, id: &str) -> Result<(), ExitError> {
    let response = client.target(NodeId::from_string(id)).await?;
    println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
    Ok(())
}

async fn watch(client: &Client) -> Result<(), ExitError> {
    client
        .watch_changes(|event| {
            println!("{}", serde_json::to_string(&event).unwrap_or_default());
            true
        })
        .await
}
