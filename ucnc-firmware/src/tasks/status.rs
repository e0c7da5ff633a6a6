//! Status report task
//!
//! Logs the snapshots published by the motion task whenever the state
//! changes, and a position line at most once per second while moving.

use defmt::*;
use embassy_time::{Duration, Instant};

use ucnc_core::state::State;

use crate::channels::STATUS;

/// Minimum interval between position lines
const REPORT_INTERVAL_MS: u64 = 1000;

/// Status report task
#[embassy_executor::task]
pub async fn status_task() {
    info!("Status task started");

    let mut last_state = State::Idle;
    let mut last_report = Instant::now();

    loop {
        let status = STATUS.wait().await;

        if status.state != last_state {
            info!("State: {:?} -> {:?}", last_state, status.state);
            if let State::Alarm(fault) = status.state {
                error!("Alarm: {:?}", fault);
            }
            last_state = status.state;
        }

        let moving = status.step_rate > 0;
        if moving && last_report.elapsed() >= Duration::from_millis(REPORT_INTERVAL_MS) {
            info!(
                "Pos: X{} Y{} Z{} A{} rate={} steps/s queued={} F{}% R{}% S{}%",
                status.position[0],
                status.position[1],
                status.position[2],
                status.position[3],
                status.step_rate,
                status.queued,
                status.feed_override,
                status.rapid_override,
                status.spindle_override,
            );
            last_report = Instant::now();
        }
    }
}
