use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::events::PowerEvent;
use crate::platform::power::{PowerMonitor, PowerStatus};

/// Reads the charging state once immediately, then polls and emits on changes only.
#[instrument(skip_all)]
pub async fn run(
    monitor: PowerMonitor,
    poll_interval: Duration,
    to_viewer: Sender<PowerEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let initial = read_status(&monitor).await.unwrap_or(PowerStatus::Unknown);
    let mut charging = initial.is_charging();
    info!(status = ?initial, charging, "initial power status");
    if to_viewer.send(PowerEvent::from_charging(charging)).await.is_err() {
        return Ok(());
    }

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting power task");
                break;
            }
            _ = ticker.tick() => {
                let Some(status) = read_status(&monitor).await else {
                    continue;
                };
                let now_charging = status.is_charging();
                if now_charging == charging {
                    continue;
                }
                charging = now_charging;
                let event = PowerEvent::from_charging(charging);
                info!(?event, ?status, "power state changed");
                if to_viewer.send(event).await.is_err() {
                    warn!("viewer channel closed; exiting power task");
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn read_status(monitor: &PowerMonitor) -> Option<PowerStatus> {
    let monitor = monitor.clone();
    match tokio::task::spawn_blocking(move || monitor.read()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(err)) => {
            warn!("power status unavailable: {err:#}");
            None
        }
        Err(err) => {
            warn!("power status reader panicked: {err}");
            None
        }
    }
}
