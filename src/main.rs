use std::net::Ipv4Addr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_api::{config::Config, create_app, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todo_api=debug,tower_http=info"));
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    });

    let state = AppState::from_config(&config).expect("initializing database");
    info!(
        database = %config.database_path,
        model = %config.openai_model,
        provider_key = config.openai_api_key.is_some(),
        "state initialized"
    );

    let app = create_app(state);
    let addr = (Ipv4Addr::UNSPECIFIED, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("binding listener");

    info!("running on {addr:?}");

    axum::serve(listener, app).await.expect("failed serving");
}
