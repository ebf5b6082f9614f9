//! Wedsnap - a guest photo and video sharing service.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wedsnap::{
    config::Config,
    media::media_records,
    server::{create_router, RouterConfig},
    storage::{GcsStore, ObjectStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Project: {}", config.project_id);
    info!("  Bucket: {}", config.bucket);
    if let Some(ref endpoint) = config.storage_endpoint {
        info!("  Storage endpoint: {}", endpoint);
    }
    info!(
        "  Upload ceiling: {} MB (server route)",
        config.max_upload_bytes / (1024 * 1024)
    );

    // Create the storage client
    let store = build_store(&config);

    // Test storage connectivity. A failure here is not fatal: credentials
    // may arrive later (mounted secret, rotated key file) and every request
    // resolves them afresh, so the API keeps serving and returns 500s until
    // the credential problem is fixed.
    info!("Checking storage access...");
    match store.list_objects().await {
        Ok(objects) => {
            let media = media_records(objects, &config.bucket);
            info!("  Connected successfully");
            info!("  Found {} media file(s) in bucket", media.len());
        }
        Err(e) => {
            warn!("  Storage check failed: {}", e);
            warn!("  Requests will fail until credentials and bucket access are fixed");
        }
    }

    // Build the router
    let router_config = build_router_config(&config);
    let router = create_router(store, config.bucket.clone(), router_config);

    // Bind and serve
    let addr = config.bind_address();
    info!("Server listening on http://{}", addr);
    info!("  Gallery: http://{}/api/photos", addr);
    info!("  Health:  http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Create the storage client from the configuration.
fn build_store(config: &Config) -> GcsStore {
    let chain = config.credential_chain();
    let store = GcsStore::new(&config.bucket, chain);
    match config.storage_endpoint {
        Some(ref endpoint) => {
            store.with_endpoints(endpoint, format!("{}/token", endpoint.trim_end_matches('/')))
        }
        None => store,
    }
}

/// Build RouterConfig from the application configuration.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wedsnap=debug,tower_http=debug"
    } else {
        "wedsnap=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
