use chrono::Duration;
use kvant_hex::application::notifications::{LogSink, NotificationQueue};
use kvant_hex::application::password::Passwords;
use kvant_hex::application::token::JwtService;
use kvant_hex::config::Config;
use kvant_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use kvant_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT / JWT_SECRET when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        port = %config.server_port,
        sqlite = config.database_url.is_some(),
        token_ttl_hours = config.token_ttl_hours,
        "configuration loaded"
    );
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    let (notifications, _worker) = NotificationQueue::start(LogSink);
    let jwt = JwtService::new(&config.jwt_secret, Duration::hours(config.token_ttl_hours));
    let state = AppState::new(repo, Passwords::default(), jwt, notifications);

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(state, server_cfg).await?;
    http.run().await
}
