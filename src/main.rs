use std::path::PathBuf;

use clap::Parser;
use marquee_core::Config;

/// Room-scoped real-time theme synchronization server.
#[derive(Parser, Debug)]
#[command(name = "marquee", version)]
struct Args {
    /// Room identifier clients must join.
    #[arg(long, env = "ROOM", default_value = "HALLOWEEN")]
    room: String,

    /// Shared secret for the control role and lock changes.
    #[arg(long, env = "PARTY_KEY", default_value = "changeme")]
    party_key: String,

    /// Theme seeded for the room at startup.
    #[arg(long, env = "DEFAULT_THEME", default_value = "ghosts")]
    default_theme: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directory the static front-end pages are served from.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config {
        room: args.room,
        party_key: args.party_key,
        default_theme: args.default_theme,
        port: args.port,
        public_dir: args.public_dir,
    };

    tracing::info!(room = %config.room, "starting marquee server");

    let handle = marquee_server::start(config)
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "marquee server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}
