// src/main.rs
use legal_backend::api::{create_app_router, AppState};
use legal_backend::config::AppConfig;
use legal_backend::db::create_db_pool;
use migration::{Migrator, MigratorTrait};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legal_backend=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting Legal Backend server...");

    let app_config = AppConfig::from_env()?;
    tracing::info!(
        environment = %app_config.environment,
        server_addr = %app_config.server_addr(),
        "Configuration loaded"
    );

    let db_pool = create_db_pool(&app_config).await?;
    tracing::info!("Database pool created successfully.");

    // 起動時に未適用のマイグレーションを適用する
    Migrator::up(&db_pool, None).await?;
    tracing::info!("Database migrations applied.");

    let app_state = AppState::build(db_pool, &app_config)?;
    let app_router = create_app_router(app_state);

    let server_addr = app_config.server_addr();
    tracing::info!("Router configured. Server listening on {}", server_addr);

    let listener = TcpListener::bind(&server_addr).await?;
    axum::serve(listener, app_router.into_make_service()).await?;

    Ok(())
}
