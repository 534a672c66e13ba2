//! Command handlers.

use crate::config::AppConfig;
use anyhow::Context;
use console::style;
use paygate_api::{ApiSettings, AppState, build_app};
use paygate_billing::StripeClient;
use paygate_core::{KeyManager, fingerprint as fingerprint_of};
use paygate_db::MemoryStore;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Run the API server until Ctrl-C.
pub async fn serve(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let billing = StripeClient::new(config.stripe.client_config()?)?;
    let webhooks = config.stripe.webhook_verifier()?;
    if !webhooks.is_signed() {
        warn!("Webhook signatures are NOT verified; anyone can forge billing events");
    }

    let keys = KeyManager::new().with_key_bytes(config.keys.key_bytes)?;
    let settings = ApiSettings::new(config.stripe.price_id.as_str(), &config.server.public_url)
        .with_expose_store(config.server.expose_store)
        .with_reveal_ttl(Duration::from_secs(config.server.reveal_ttl_seconds));
    if settings.expose_store {
        warn!("/mock/db is enabled; customer records are publicly readable");
    }

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        store,
        Arc::new(billing),
        keys,
        webhooks,
        settings,
    );
    let app = build_app(Arc::new(state));

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, public_url = %config.server.public_url, "Paygate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Print a fresh key and its fingerprint. Nothing is stored.
pub async fn keygen(config: &AppConfig) -> anyhow::Result<()> {
    let manager = KeyManager::new().with_key_bytes(config.keys.key_bytes)?;
    let generated = manager.generate(&MemoryStore::new()).await?;

    println!("{} Generated API key", style("✓").green());
    println!("  Key:         {}", style(generated.api_key.expose()).bold());
    println!("  Fingerprint: {}", generated.fingerprint);
    println!(
        "  {}",
        style("The key is not recorded anywhere; copy it now.").dim()
    );
    Ok(())
}

/// Print the fingerprint a key is stored under.
pub fn fingerprint(key: Option<String>) -> anyhow::Result<()> {
    let key = match key {
        Some(key) => key,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read key from stdin")?;
            buf
        }
    };

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("no key given");
    }

    println!("{}", fingerprint_of(key));
    Ok(())
}

/// Print the effective configuration with secrets masked.
pub fn show_config(config: &AppConfig) {
    println!("{}", style("Paygate configuration").bold());
    println!("{:#?}", config);
}
