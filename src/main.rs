use clap::Parser;
use odds_watch::cli::{Cli, Commands};
use odds_watch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _guard = odds_watch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting odds monitor");
            args.execute(config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Source: {}", config.source.base_url);
            println!(
                "  Events: {}h window, sport_id={:?}",
                config.events.hours, config.events.sport_id
            );
            println!(
                "  Interest: min_drop_pct={}, min_probability_gain={}, ticks={}",
                config.interest.min_drop_pct,
                config.interest.min_probability_gain,
                if config.interest.use_ticks { "on" } else { "off" }
            );
            println!(
                "  Alerts: cooldown={}s, pending_ttl={}s, reverse_suppress={}s, cap={}/cycle",
                config.alerts.cooldown_secs,
                config.alerts.pending_ttl_secs,
                config.alerts.reverse_suppress_secs,
                config.alerts.max_per_cycle
            );
            println!(
                "  Schedule: every {}s, budget {}s",
                config.schedule.poll_interval_secs, config.schedule.cycle_budget_secs
            );
        }
    }

    Ok(())
}
