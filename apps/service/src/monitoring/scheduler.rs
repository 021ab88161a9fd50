use chrono::Utc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::coordinator::SiteCoordinator;

/// Monitoring scheduler - probes active sites once their frequency elapses
pub struct MonitoringScheduler {
    coordinator: SiteCoordinator,
    tick: Duration,
}

impl MonitoringScheduler {
    /// `tick` bounds how late a due probe may start
    pub fn new(coordinator: SiteCoordinator, tick: Duration) -> Self {
        Self { coordinator, tick }
    }

    /// Run the scheduling loop until the returned handle is aborted
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut timer = interval(tick);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                let started = coordinator.probe_due(Utc::now()).await;
                if started > 0 {
                    debug!("Scheduled {} probes", started);
                }
            }
        })
    }
}
