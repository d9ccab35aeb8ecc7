use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{self, MemberStore};

/// Runs the expiry sweep every `period`, independent of request traffic.
/// The first sweep happens one period after start; `main` sweeps once at boot.
pub fn start(store: MemberStore, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "starting expiry scheduler");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            debug!("running scheduled expiry sweep");
            match store.auto_expire(store::today()).await {
                Ok(expired) => debug!(expired = expired.len(), "scheduled expiry sweep done"),
                Err(e) => warn!(error = %e, "scheduled expiry sweep failed"),
            }
        }
    })
}
