use stashlink_core::AppError;
use stashlink_storage::{SweepReport, TempSpace};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Reclaims scratch sessions older than the session TTL, on demand and on a
/// timer.
pub struct SweepService {
    temp_space: TempSpace,
    max_age: Duration,
    interval: Option<Duration>,
}

impl SweepService {
    /// An `interval_secs` of 0 disables the timer; manual sweeps still work.
    pub fn new(temp_space: TempSpace, max_age_secs: u64, interval_secs: u64) -> Self {
        Self {
            temp_space,
            max_age: Duration::from_secs(max_age_secs),
            interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        }
    }

    #[tracing::instrument(skip(self), fields(root = %self.temp_space.root().display()))]
    pub async fn run_once(&self) -> Result<SweepReport, AppError> {
        let report = self.temp_space.sweep_expired(self.max_age).await?;
        tracing::info!(
            scanned = report.entries.len(),
            removed = report.removed,
            "Scratch sweep complete"
        );
        Ok(report)
    }

    /// Start the periodic sweep. Returns `None` when the timer is disabled.
    pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let period = self.interval?;
        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Scheduled scratch sweep failed");
                }
            }
        }))
    }
}
