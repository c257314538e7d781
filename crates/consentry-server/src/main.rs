//! Consentry — cookie consent service for the marketing site.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod admin;
mod routes;
mod state;
mod sync_worker;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CONSENTRY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("Consentry — cookie consent service");
    println!();
    println!("Usage: consentry [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  status [visitor-id]      Show stored consent (all records, or one visitor)");
    println!("  clear <visitor-id>       Withdraw a visitor's stored consent");
    println!("  help                     Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "status" => {
                let (config, storage) = admin::open_storage(&resolve_data_dir())?;
                match args.get(2) {
                    Some(visitor) => {
                        admin::print_report(&admin::visitor_report(&config, &storage, visitor)?)
                    }
                    None => admin::print_report(&admin::storage_report(&storage)?),
                }
                return Ok(());
            }
            "clear" => {
                let Some(visitor) = args.get(2) else {
                    eprintln!("Usage: consentry clear <visitor-id>");
                    std::process::exit(1);
                };
                let (config, storage) = admin::open_storage(&resolve_data_dir())?;
                let removed = admin::clear_visitor(&config, &storage, visitor)?;
                println!(
                    "{}",
                    if removed {
                        "Consent record removed"
                    } else {
                        "No consent record on file"
                    }
                );
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'consentry help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = consentry_core::ConsentConfig::from_env(&data_dir)?;
    let port = config.port;

    let storage = consentry_store::SqliteStorage::open(&config.data_paths.consent_db)
        .map_err(|e| anyhow::anyhow!("Failed to open consent store: {}", e))?;

    // Downstream consent sync (optional)
    let webhook = config
        .sync_webhook
        .clone()
        .map(|url| sync_worker::start_sync_worker(url, config.sync_timeout()))
        .transpose()?;
    if webhook.is_none() {
        info!("No CONSENTRY_SYNC_WEBHOOK set, consent signals will not be forwarded");
    }

    let state = Arc::new(AppState::new(config, storage, webhook));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Consentry server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
