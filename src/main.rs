// src/main.rs

use dotenvy::dotenv;
use examtrainer::config::Config;
use examtrainer::routes;
use examtrainer::state::AppState;
use examtrainer::utils::mail::{Mailer, NoopMailer, SmtpMailer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool.
    // Foreign keys must be on for the attempt transaction to be meaningful.
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("DATABASE_URL must be a valid sqlite URL")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_options)
        .await
        .expect("Failed to open the database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Outbound mail: real SMTP when configured, log-only otherwise.
    let mailer: Arc<dyn Mailer> = match &config.smtp_host {
        Some(host) => {
            let smtp = SmtpMailer::from_config(&config, host).expect("Failed to set up SMTP");
            tracing::info!("SMTP relay configured: {}", host);
            Arc::new(smtp)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outbound mail will only be logged");
            Arc::new(NoopMailer)
        }
    };

    // Create AppState
    let state = AppState {
        pool,
        config: config.clone(),
        mailer,
        http: reqwest::Client::new(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("examtrainer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}
