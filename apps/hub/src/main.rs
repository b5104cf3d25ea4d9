use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::LocalSet;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use orchestration_hub::api;
use orchestration_hub::bridge::{SyncBridge, TracingNotifier};
use orchestration_hub::config::AppConfig;
use orchestration_hub::infrastructure::WebSocketConnector;
use orchestration_hub::registry::OrchestrationContext;
use orchestration_hub::transport::TransportChannel;

// The registry and bridge are single-threaded, so everything runs on one
// thread inside a LocalSet.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    LocalSet::new().run_until(run(config)).await
}

async fn run(config: AppConfig) -> ExitCode {
    let context = OrchestrationContext::new(config.registry.clone());
    let channel = TransportChannel::new(
        config.transport.clone(),
        Arc::new(WebSocketConnector::default()),
    );
    let bridge = SyncBridge::new(context.clone(), channel, Rc::new(TracingNotifier));

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(bridge.subscribe())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = match TcpListener::bind(config.http_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(addr = %config.http_addr, error = %err, "Failed to bind address");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Server listening on {}", config.http_addr);
    tracing::info!("Orchestration channel at {}", config.transport.url);

    let shutdown = context.shutdown_token();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });

    let driver = tokio::task::spawn_local({
        let bridge = bridge.clone();
        async move { bridge.run().await }
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
    context.shutdown();

    if let Err(err) = driver.await {
        tracing::error!(error = %err, "Bridge task failed");
    }

    match server.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Server failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "Server task failed");
            ExitCode::FAILURE
        }
    }
}
