//! Outpost - headless host/client sandbox
//!
//! Loads settings and the bundled catalog, then plays a scripted session
//! between an authoritative host and one client over the loopback hub.
//!
//! Pass `--write-settings` to save the current settings (defaults when no
//! file exists yet) and exit.

mod sandbox;
mod settings;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sandbox::Sandbox;
use settings::Settings;

fn main() -> Result<()> {
    let settings = Settings::load();

    // RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.level))
        .context("Invalid log level in settings")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    if std::env::args().skip(1).any(|arg| arg == "--write-settings") {
        return settings.save();
    }

    info!("Starting Outpost sandbox...");
    info!(
        "Session: {} inventory slots, {} station slots, {} Hz",
        settings.session.inventory_slots,
        settings.session.station_buffer_slots,
        settings.session.tick_rate
    );

    let catalog = sandbox::load_catalog()?;
    let mut sandbox = Sandbox::new(&settings, catalog)?;
    sandbox.run(settings.sandbox.ticks)?;
    sandbox.report();

    info!("Sandbox finished");
    Ok(())
}
