//! promptgrid HTTP server
//!
//! Starts an Axum web server that fans prompt sequences out to the configured
//! chat providers and serves the CRUD API.

use clap::Parser;
use promptgrid::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    store::Database,
    telemetry,
};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle subcommands before touching config or storage
    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Wrote configuration template to {path}");
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    // Load configuration
    let config = Config::from_file(&cli.config)?;

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting promptgrid server on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        chatbots = config.chatbots.len(),
        db_path = %config.storage.path.display(),
        "Loaded configuration"
    );

    // Open storage (creates the schema on first start)
    let store = Database::open(&config.storage.path)?;

    // Build application state and router
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(config, store)?;
    let app = handlers::router(state);

    // Create socket address
    let addr = SocketAddr::from((
        host.parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
