// ── Status poller ──
//
// Fixed-period status fetch, plus stats while the dashboard view is
// active. Polls run one at a time inside this task, so a slow response
// delays the schedule instead of piling requests up; ticks missed in the
// meantime are skipped. A manual trigger wakes the loop early and resets
// the period, and triggers that arrive while a poll is outstanding
// collapse into one follow-up poll.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::controller::{Dashboard, Update};
use crate::store::View;

pub(crate) async fn poll_task(
    dashboard: Dashboard,
    tx: mpsc::Sender<Update>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let trigger = dashboard.poll_trigger();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = trigger.notified() => interval.reset(),
            _ = interval.tick() => {}
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = poll_once(&dashboard, &tx) => {}
        }
    }

    debug!("poll task exiting");
}

async fn poll_once(dashboard: &Dashboard, tx: &mpsc::Sender<Update>) {
    if dashboard.view() == View::Dashboard {
        let (status, stats) = tokio::join!(
            dashboard.fetch_status(tx),
            dashboard.fetch_stats(tx)
        );
        if let Err(e) = status {
            debug!(error = %e, "status poll failed");
        }
        if let Err(e) = stats {
            debug!(error = %e, "stats poll failed");
        }
    } else if let Err(e) = dashboard.fetch_status(tx).await {
        debug!(error = %e, "status poll failed");
    }
}
