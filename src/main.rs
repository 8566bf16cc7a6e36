use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use digital_products::config::Settings;
use digital_products::db::{AppState, create_pool};
use digital_products::handlers;

#[derive(Parser, Debug)]
#[command(name = "digital-products")]
#[command(about = "License issuance service for digital products")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the event ingest server (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digital_products=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    let pool = create_pool(&settings.database_path)
        .with_context(|| format!("failed to open database at {}", settings.database_path))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitDb => {
            tracing::info!("Schema ready at {}", settings.database_path);
            Ok(())
        }
        Command::Serve => serve(settings, pool).await,
    }
}

async fn serve(settings: Settings, pool: digital_products::db::DbPool) -> Result<()> {
    let state = AppState::new(pool, settings.license.clone());
    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = settings.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "Auto-assign on registration: {}, on purchase: {}, require login: {}",
        settings.license.auto_assign_licenses_on_user_registration,
        settings.license.auto_assign_user_on_purchase,
        settings.license.require_logged_in_user
    );

    axum::serve(listener, app).await?;
    Ok(())
}
