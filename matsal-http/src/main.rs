//! HTTP server for matsal that exposes school lunch menus from every registered provider.

mod config;
mod error;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::{ServiceExt, extract::Request};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use matsal_core::{model::ProviderInfo, plugin::PluginRegistry, service::MatsalService};
use matsal_provider_mashie::{self as mashie, MashieConfig};
use matsal_provider_skolmaten::{self as skolmaten, SkolmatenConfig};

use crate::config::Config;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with(fmt::layer())
        .init();

    let config = Config::from_env()?;

    let client = Client::builder()
        .user_agent(routes::SERVER)
        .build()?;

    let registry = Arc::new(registry(&client, &config));
    let service = Arc::new(MatsalService::new(registry));
    for provider in service.providers() {
        info!(id = %provider.id, name = %provider.name, "provider registered");
    }

    let app = routes::app(AppState::new(service, config.cache_max_age)?);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "matsal listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("matsal stopped");
    Ok(())
}

/// Providers in the order menus are listed.
fn registry(client: &Client, config: &Config) -> PluginRegistry {
    let mashie_host = |base_url: &str| MashieConfig {
        base_url: base_url.to_owned(),
        retry: config.retry.clone(),
    };

    PluginRegistry::new(vec![
        skolmaten::plugin(
            client.clone(),
            SkolmatenConfig {
                base_url: config.skolmaten_base_url.clone(),
                retry: config.retry.clone(),
                titles: config.titles,
            },
        ),
        mashie::plugin(
            client.clone(),
            ProviderInfo::new("sodexo", "Sodexo"),
            mashie_host(&config.sodexo_base_url),
        ),
        mashie::plugin(
            client.clone(),
            ProviderInfo::new("mpi", "MPI"),
            mashie_host(&config.mpi_base_url),
        ),
    ])
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
