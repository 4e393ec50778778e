use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::controller::{ReminderController, TickOutcome};

// Set to true to trace every scheduler tick
const ENABLE_LOGS: bool = false;

use crate::log_info;

/// Polls the controller every `tick_interval` until cancelled.
pub async fn scheduler_loop(
    controller: ReminderController,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match controller.tick().await {
                    TickOutcome::Idle => log_info!("scheduler tick: nothing due"),
                    TickOutcome::Raised(alarm) => {
                        log_info!("scheduler tick: raised {}", alarm.record_id)
                    }
                    TickOutcome::StillAlarming(alarm) => {
                        log_info!("scheduler tick: waiting on dismissal of {}", alarm.record_id)
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log::info!("reminder scheduler shutting down");
                break;
            }
        }
    }
}
