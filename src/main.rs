//! Chat Relay - Entry Point
//!
//! `serve` runs the relay server with stdin as operator input;
//! `connect` runs a terminal client.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use chat_relay::cli::{Cli, Command, ConnectArgs, ServeArgs};
use chat_relay::{
    ChatClient, DisplaySink, LineTypist, OutboundTypist, ServerController, TracingSink,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await?,
        Command::Connect(args) => connect(args).await?,
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn DisplaySink> = Arc::new(TracingSink);
    let mut controller = ServerController::new(args.to_config(), sink);
    controller.start()?;

    let mut typist = LineTypist::stdin();
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Without a signal handler only /quit ends the server
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    controller.operate(&mut typist, interrupt).await?;
    Ok(())
}

async fn connect(args: ConnectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn DisplaySink> = Arc::new(TracingSink);
    let mut client = ChatClient::connect(args.server, args.wire.to_wire(), sink).await?;
    let mut typist = LineTypist::stdin();

    while let Some(line) = typist.next_message().await? {
        if line.trim() == "/quit" {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = client.send(&line).await {
            error!("Send failed: {}", e);
            break;
        }
    }

    client.disconnect().await;
    Ok(())
}
