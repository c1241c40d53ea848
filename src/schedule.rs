//! Timer-driven dispatch using stored defaults.

use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::{
    config::ScheduleConfig,
    engine::{Engine, Submission},
};

/// Run a dispatch with stored defaults every `interval_secs`, forever.
/// Abort reports are logged; the loop never dies on one.
pub async fn run(engine: Arc<Engine>, config: ScheduleConfig) {
    let period = Duration::from_secs(config.interval_secs.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick fires immediately; the schedule starts one period out
    ticker.tick().await;

    info!(interval_secs = config.interval_secs, "schedule started");

    loop {
        ticker.tick().await;
        info!("scheduled dispatch starting");

        let outcome = engine.run(Submission::default()).await;
        if outcome.aborted {
            warn!(report = %outcome.report, "scheduled dispatch aborted");
        } else {
            info!("scheduled dispatch finished");
        }
    }
}
