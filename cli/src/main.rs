//! Showtime booking - CLI server
//!
//! Headless seat-reservation service suitable for deployment as a systemd
//! service, Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/showtime/config.toml)
//! showtime-service
//!
//! # Custom config path
//! showtime-service --config /etc/showtime/config.toml
//!
//! # Override the port and seed a demo showing
//! showtime-service --api-port 8081 --seed-demo
//!
//! # Validate config without starting
//! showtime-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use showtime::config::{AppConfig, CONFIG_ENV};
use showtime::server::{init_tracing, ServerHandle, ServerOptions};

/// Showtime booking: seat holds, payments and expiry for theatre showings.
#[derive(Parser, Debug)]
#[command(
    name = "showtime-service",
    version,
    about = "Seat reservation and checkout service for theatre showings",
    long_about = "Showtime booking: REST API for locking seats, recording payments \
                  and confirming reservations, with a background reclaimer for \
                  expired holds.\n\n\
                  Default config: ~/.config/showtime/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Seed a demo showing if the store has none.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(showtime::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) if cli.check => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Err(e) = config.validate() {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        println!("   Config file   : {}", config_path.display());
        println!("   API address   : {}", config.api_address());
        println!("   Database      : {}", config.database.url);
        println!("   Hold duration : {}s", config.reservations.hold_duration_secs);
        println!("   Sweep interval: {}s", config.reservations.sweep_interval_secs);
        println!("   Log level     : {}", config.logging.level);
        return Ok(());
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        seed_demo: cli.seed_demo,
    })
    .await?;

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
