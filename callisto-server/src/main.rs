use anyhow::Result;
use callisto_server::{config::Config, routes, state::AppState};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "callisto-server")]
#[command(about = "Encrypted reporting and matching server")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = "CALLISTO_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Match every pending group once, for deployments that defer matching
    FindMatches,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callisto_server=debug,callisto_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let state = AppState::new(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, state).await,
        Command::FindMatches => {
            let matched = state.services.matching.run_pending().await?;
            flush_outbox(&state);
            println!("{matched} reports matched");
            Ok(())
        }
    }
}

async fn serve(config: &Config, state: AppState) -> Result<()> {
    let outbox_state = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(5));
        loop {
            tick.tick().await;
            flush_outbox(&outbox_state);
        }
    });

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting callisto-server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Hand queued mail to the delivery log
fn flush_outbox(state: &AppState) {
    for email in state.outbox.drain() {
        tracing::info!(
            name = %email.name,
            site_id = email.site_id,
            recipients = email.to.len(),
            encrypted = email.encrypted_for.is_some(),
            "email dispatched"
        );
    }
}
