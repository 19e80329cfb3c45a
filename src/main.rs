use tower_http::trace::TraceLayer;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rainfall_register::api::{create_router, AppState};
use rainfall_register::config::Config;
use rainfall_register::services::RegisterCleaningService;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rainfall_register=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting rainfall register service with config: {:?}", config);

    let cleaning_service = RegisterCleaningService::from_config(&config);
    info!(
        "Totals tolerance: abs {} / rel {}, zero as missing: {}",
        config.totals_tolerance.abs(),
        config.totals_tolerance.rel(),
        config.zero_as_missing
    );

    let app_state = AppState { cleaning_service };
    let app = create_router(app_state).layer(TraceLayer::new_for_http());

    let addr = config.server_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
