use clap::Parser;
use log::info;
use server::db::PgStore;
use server::routes::{build_router, AppState};
use server::sessions::SessionManager;
use server::store::{InMemoryStore, Store};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};

/// Main-method of the application.
/// Parses command-line arguments, connects the store, and serves the API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// PostgreSQL connection string (falls back to DATABASE_URL)
        #[clap(long)]
        database_url: Option<String>,
        /// Keep all state in memory instead of PostgreSQL
        #[clap(long)]
        in_memory: bool,
    }

    env_logger::init();
    let args = Args::parse();

    let store: Arc<dyn Store> = if args.in_memory {
        info!("using the in-memory store; all data is lost on shutdown");
        Arc::new(InMemoryStore::new())
    } else {
        let url = args
            .database_url
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or("set --database-url or DATABASE_URL, or pass --in-memory")?;
        let store = PgStore::connect(&url).await?;
        store.ensure_schema().await?;
        Arc::new(store)
    };

    let sessions = Arc::new(RwLock::new(SessionManager::new()));

    // Sweep expired sessions in the background
    {
        let sessions = Arc::clone(&sessions);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(60));
            loop {
                timer.tick().await;
                let purged = sessions.write().await.purge_expired();
                if purged > 0 {
                    info!("purged {} expired sessions", purged);
                }
            }
        });
    }

    let app = build_router(AppState { store, sessions });

    let address = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C, shutting down gracefully...");
}
