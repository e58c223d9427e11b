//! `attr-gateway`: HTTP entry point to the attribute converter.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the cipher format registry and install it process-wide.
//! 4. Resolve the encode format.
//! 5. Build the Axum router and start the server.

mod config;
mod server;
mod telemetry;

use anyhow::{Context, Result};
use attr_crypt::{registry, EphemeralSecretProvider, FormatRegistry};
use tracing::{info, warn};

use config::Config;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "attr-gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. Format registry
    // -----------------------------------------------------------------------
    // Keys are regenerated on every start: stored AES values do not survive a restart.
    let registry = registry::install(FormatRegistry::builtin(&EphemeralSecretProvider))
        .context("failed to install format registry")?;
    if registry.degraded_count() > 0 {
        warn!(
            degraded = registry.degraded_count(),
            "some cipher formats have no key material"
        );
    }

    // -----------------------------------------------------------------------
    // 4. Encode format
    // -----------------------------------------------------------------------
    let encode_tag = cfg
        .encode_format
        .clone()
        .unwrap_or_else(|| registry.default_format().tag().to_owned());
    let format = registry
        .lookup_by_tag(&encode_tag)
        .with_context(|| format!("ENCODE_FORMAT {encode_tag} is not a registered format"))?;
    if format.algorithm().is_none() {
        warn!(format = format.name(), "encode format is passthrough; values are stored unencrypted");
    }

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(registry, encode_tag);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
