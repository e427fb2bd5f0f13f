//! Headless simulator that plays bot-only games and reports statistics.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod runner;
mod settings;
mod sinks;

use runner::Simulation;
use settings::SimSettings;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SimSettings::from_env()?;
    let config = settings.load_config()?;
    let board = settings.load_board()?;

    info!(
        "Simulating {} games with {} players (seed {:?})",
        settings.games, settings.players, settings.seed
    );

    let summary = Simulation::new(settings, config, board).run()?;

    info!(
        "{} of {} games finished, {:.1} turns on average",
        summary.finished, summary.games, summary.average_turns
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
