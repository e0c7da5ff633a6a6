//! Limit switch, e-stop and door inputs
//!
//! Switches are wired normally-closed to ground with pull-ups, so a broken
//! wire reads as tripped.

use defmt::*;
use embassy_futures::select::{select4, Either4};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Timer};

use ucnc_core::state::FaultKind;

use crate::channels::{RealtimeCommand, REALTIME};

/// Contact bounce settle time
const DEBOUNCE_MS: u64 = 20;

/// Hard limits and emergency stop
#[embassy_executor::task]
pub async fn limits_task(limits: [Input<'static>; 3], mut estop: Input<'static>) {
    info!("Limits task started");

    let [mut x, mut y, mut z] = limits;

    loop {
        let fault = match select4(
            x.wait_for_high(),
            y.wait_for_high(),
            z.wait_for_high(),
            estop.wait_for_high(),
        )
        .await
        {
            Either4::First(_) | Either4::Second(_) | Either4::Third(_) => FaultKind::LimitTrip,
            Either4::Fourth(_) => FaultKind::EmergencyStop,
        };

        warn!("Input fault: {:?}", fault);
        REALTIME.send(RealtimeCommand::Fault(fault)).await;

        // Stay quiet until every switch is released again
        x.wait_for_low().await;
        y.wait_for_low().await;
        z.wait_for_low().await;
        estop.wait_for_low().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
    }
}

/// Safety door switch
#[embassy_executor::task]
pub async fn door_task(mut door: Input<'static>) {
    info!("Door task started");

    let mut open = door.is_high();
    if open {
        REALTIME.send(RealtimeCommand::DoorOpened).await;
    }

    loop {
        door.wait_for_any_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;

        let now_open = door.is_high();
        if now_open == open {
            continue;
        }
        open = now_open;

        debug!("Door {}", if open { "opened" } else { "closed" });
        let command = if open {
            RealtimeCommand::DoorOpened
        } else {
            RealtimeCommand::DoorClosed
        };
        REALTIME.send(command).await;
    }
}
