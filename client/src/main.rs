use std::time::Duration;

use clap::Parser;
use client::console::{forward_lines, render_event};
use client::{ClientConfig, Session};
use shared::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Edit waypoints from stdin and stream routes from a routing server"
)]
struct Args {
    /// Host name of the routing server
    #[arg(long, env = "ROUTE_SERVER_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// WebSocket port of the routing server
    #[arg(long, env = "ROUTE_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Delay before reconnecting after the connection drops
    #[arg(long, env = "RECONNECT_DELAY_MS", default_value_t = 2000)]
    reconnect_delay_ms: u64,

    /// Print routes as JSON arrays
    #[arg(long)]
    json: bool,
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: Endpoint::new(self.host.clone(), self.port),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            json: self.json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout only carries routes.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "client=debug,shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().config();
    let json = config.json;
    tracing::info!("routing server: {}", config.endpoint.url());

    let (command_tx, command_rx) = mpsc::channel(64);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    let input = tokio::spawn(forward_lines(
        BufReader::new(tokio::io::stdin()),
        command_tx,
    ));

    let output = tokio::spawn(async move {
        while let Some(event) = update_rx.recv().await {
            match render_event(&event, json) {
                Ok(Some(text)) => println!("{text}"),
                Ok(None) => {}
                Err(err) => tracing::error!("cannot print route: {err}"),
            }
        }
    });

    Session::new(config, update_tx).run(command_rx).await?;
    output.await?;
    input.await??;

    Ok(())
}
