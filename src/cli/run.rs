//! Run command implementation

use crate::alert::{TelegramConfig, TelegramSender};
use crate::config::Config;
use crate::ingest::HttpSnapshotSource;
use crate::pipeline::Monitor;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Skip the warm-up baseline cycle and alert immediately
    #[arg(long)]
    pub no_warmup: bool,
}

impl RunArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if self.no_warmup {
            config.alerts.warmup = false;
        }

        let source = Arc::new(HttpSnapshotSource::new(config.source.to_source_config())?);

        let delivery = &config.delivery;
        let telegram: TelegramConfig = TelegramSender::from_env(
            &delivery.bot_token_env,
            &delivery.chat_id_env,
            delivery.silent,
        )?;
        let sink = Arc::new(TelegramSender::new(telegram)?);

        let poll_interval = Duration::from_secs(config.schedule.poll_interval_secs.max(1));
        tracing::info!(
            base_url = %config.source.base_url,
            hours = config.events.hours,
            min_drop_pct = %config.interest.min_drop_pct,
            poll_secs = poll_interval.as_secs(),
            "monitor starting"
        );

        let mut monitor = Monitor::new(config, source, sink)?;

        if self.once {
            monitor.run_cycle().await?;
            return Ok(());
        }

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = monitor.run_cycle().await {
                // persistence failures land here; retry on the next interval
                tracing::error!(error = %format!("{err:#}"), "cycle aborted");
            }
        }
    }
}
