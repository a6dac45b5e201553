use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle::client::{Client, ClientConfig, Event, EventKind, WsRelayStore};
use huddle::model::IceServerConfig;
use huddle::relay::{RelayConfig, RelayServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Peer-to-peer rooms over a tiny signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a signaling relay.
    Serve {
        #[arg(long, env = "HUDDLE_BIND", default_value = "0.0.0.0:7070")]
        bind: SocketAddr,

        /// Sessions must present this token.
        #[arg(long, env = "HUDDLE_TOKEN")]
        token: Option<String>,
    },
    /// Join a room and chat with its members. Lines typed on stdin are
    /// broadcast to every open link.
    Join {
        /// Room to join.
        room: String,

        #[arg(long, env = "HUDDLE_RELAY", default_value = "ws://127.0.0.1:7070/ws")]
        relay: String,

        #[arg(long, env = "HUDDLE_TOKEN")]
        token: Option<String>,

        /// STUN server URL; repeat for several. Defaults to public servers.
        #[arg(long = "stun")]
        stun: Vec<String>,

        /// Skip STUN entirely (peers on the same host or LAN).
        #[arg(long, conflicts_with = "stun")]
        local: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { bind, token } => serve(bind, token).await,
        Commands::Join {
            room,
            relay,
            token,
            stun,
            local,
        } => join(room, relay, token, client_config(stun, local)).await,
    }
}

fn client_config(stun: Vec<String>, local: bool) -> ClientConfig {
    if local {
        return ClientConfig::local();
    }
    let mut config = ClientConfig::default();
    if !stun.is_empty() {
        config.ice_servers = stun.into_iter().map(IceServerConfig::stun).collect();
    }
    config
}

async fn serve(bind: SocketAddr, token: Option<String>) -> Result<()> {
    let config = RelayConfig {
        bind,
        auth_token: token,
    };
    let server = RelayServer::bind(config).await?;

    println!(
        "{} {}",
        "📡 Relay listening on".green().bold(),
        format!("ws://{}/ws", server.local_addr()?).cyan()
    );
    server.serve().await
}

async fn join(
    room: String,
    relay: String,
    token: Option<String>,
    config: ClientConfig,
) -> Result<()> {
    let mut store = WsRelayStore::new(relay.clone());
    if let Some(token) = token {
        store = store.with_token(token);
    }

    let client = Client::new(&config, Arc::new(store)).context("Failed to start client")?;
    for kind in [
        EventKind::Open,
        EventKind::Close,
        EventKind::Error,
        EventKind::Join,
        EventKind::RemoteJoin,
        EventKind::RemoteLeave,
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Receive,
        EventKind::RemoteStream,
    ] {
        client.on(kind, print_event).await?;
    }

    println!("{} {}", "🔌 Connecting to".cyan(), relay);
    let room = client
        .join(room)
        .await
        .with_context(|| format!("Failed to join via {}", relay))?;
    let role = match client.local_id().await? {
        Some(id) if room.is_host(&id) => "host".yellow().bold(),
        _ => "guest".normal(),
    };
    println!(
        "{} {} as {}",
        "✨ Joined".green().bold(),
        room.room_id.to_string().bold(),
        role
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                client.broadcast(serde_json::json!({ "text": line })).await?;
                debug!("Broadcast line to {} peers", client.connection_count().await?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", "👋 Leaving".dimmed());
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Open(id) => println!("{} {}", "relay session".dimmed(), id),
        Event::Close(id) => println!("{} {}", "relay session closed".red(), id),
        Event::Error(e) => eprintln!("{} {}", "error:".red().bold(), e),
        Event::Join(Some(host)) => println!("{} {}", "host is".dimmed(), host),
        Event::Join(None) => println!("{}", "room has no host, waiting".yellow()),
        Event::RemoteJoin(id) => println!("{} {}", "+".green(), id),
        Event::RemoteLeave(id) => println!("{} {}", "-".red(), id),
        Event::Connect(id) => println!("{} {}", "linked with".green().bold(), id),
        Event::Disconnect(id) => println!("{} {}", "unlinked from".yellow(), id),
        Event::Receive { from, data } => match data.get("text").and_then(|t| t.as_str()) {
            Some(text) => println!("{} {}", format!("[{}]", from).cyan(), text),
            None => println!("{} {}", format!("[{}]", from).cyan(), data),
        },
        Event::RemoteStream { from, stream } => {
            println!("{} {:?} from {}", "stream".magenta(), stream.kind, from)
        }
    }
}
