//! Step tick task
//!
//! Runs the interpolator at the period it asks for and drives the step
//! pins with the result. Each tick is checked from the instant it was due
//! to the end of its handler; finishing later than the next tick latches a
//! timing fault.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Instant, Timer, TICK_HZ};

use ucnc_core::interpolator::{DeadlineMonitor, Interpolator, InterpolatorState};
use ucnc_core::traits::StepPort;

use crate::board::PinStepPort;
use crate::channels::{MOTION_SHARED, SETTINGS_RELOAD};

/// Convert an interpolator period to embassy-time ticks
fn period_ticks(period: u32, timer_hz: u32) -> u64 {
    (period as u64 * TICK_HZ / timer_hz.max(1) as u64).max(1)
}

/// Step tick task
#[embassy_executor::task]
pub async fn stepper_task(
    mut interpolator: Interpolator<'static>,
    mut port: PinStepPort<Output<'static>>,
    mut timer_hz: u32,
) {
    info!("Stepper tick task started ({} Hz timer)", timer_hz);

    let mut monitor = DeadlineMonitor::new();
    let mut reported = 0;
    let mut next = Instant::now();

    port.enable(true);

    loop {
        let due = next;

        if interpolator.state() == InterpolatorState::Idle {
            if let Some(settings) = SETTINGS_RELOAD.try_take() {
                interpolator.configure(&settings);
                timer_hz = settings.timer_hz;
                debug!("Stepper settings reloaded");
            }
        }

        let output = interpolator.tick();
        output.apply(&mut port);

        let period = Duration::from_ticks(period_ticks(output.period, timer_hz));
        let finished = Instant::now();
        let budget = period.as_ticks().min(u32::MAX as u64) as u32;
        let on_time =
            monitor.check_tick(due.as_ticks(), finished.as_ticks(), budget, &MOTION_SHARED);
        if !on_time && monitor.overruns() != reported {
            reported = monitor.overruns();
            warn!(
                "Tick overrun: {} ticks late (budget {}, worst {})",
                finished.as_ticks().saturating_sub(due.as_ticks()),
                budget,
                monitor.worst()
            );
        }

        next += period;
        if !on_time {
            // Already faulted; restart the schedule instead of bursting
            next = next.max(finished);
        }
        Timer::at(next).await;
    }
}
