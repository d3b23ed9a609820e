// src/main.rs

use careermate::config::{Config, StoreBackend};
use careermate::error::AppError;
use careermate::models::user::NewUser;
use careermate::report::ReportPipeline;
use careermate::routes;
use careermate::state::AppState;
use careermate::store::UserStore;
use careermate::utils::hash::hash_password;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
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

    let reports = match ReportPipeline::from_config(&config.report) {
        Ok(Some(pipeline)) => {
            tracing::info!("PDF report pipeline enabled");
            Some(pipeline)
        }
        Ok(None) => {
            tracing::warn!("PDF_RENDERER_URL or SMTP settings missing, reports are disabled");
            None
        }
        Err(e) => {
            tracing::error!("Failed to set up report pipeline, reports are disabled: {}", e);
            None
        }
    };

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = connect_with_retry(&config.database_url).await;

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            AppState::postgres(pool, config.clone(), reports)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores, data is lost on restart");
            AppState::in_memory(config.clone(), reports)
        }
    };

    // Seed Admin User
    if let Err(e) = seed_admin_user(state.users.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> PgPool {
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");
    pool
}

async fn seed_admin_user(users: &dyn UserStore, config: &Config) -> Result<(), AppError> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if users.find_by_username(username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);

            users
                .create(NewUser {
                    username: username.clone(),
                    email: None,
                    password_hash: hash_password(password)?,
                    role: "admin".to_string(),
                })
                .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
