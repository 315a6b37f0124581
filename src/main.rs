use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use schoolhouse::logging::{init_tracing, shutdown_tracer};
use schoolhouse::metrics::{init_metrics, metrics_app};
use schoolhouse::router::init_router;
use schoolhouse::state::init_app_state;
use schoolhouse_config::ServerConfig;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await;

    let limiters = state.rate_limiters.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            limiters.retain_recent();
        }
    });

    if let Some(handle) = init_metrics() {
        let metrics_addr = server_config.metrics_bind_address();
        tokio::spawn(async move {
            match tokio::net::TcpListener::bind(&metrics_addr).await {
                Ok(listener) => {
                    info!("Metrics available on http://{}/metrics", metrics_addr);
                    if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                        error!(error = %e, "Metrics server stopped");
                    }
                }
                Err(e) => error!(error = %e, address = %metrics_addr, "Failed to bind metrics listener"),
            }
        });
    }

    let app = init_router(state);
    let addr = server_config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, address = %addr, "Failed to bind API listener");
            std::process::exit(1);
        }
    };

    info!("Server running on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Scalar UI available at http://{}/scalar", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!(error = %e, "Server error");
    }

    shutdown_tracer().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
