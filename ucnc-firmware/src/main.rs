//! uCNC - Stepper Motion Controller Firmware
//!
//! Main firmware binary for RP2040-based CNC controller boards. The motion
//! pipeline lives in `ucnc-core`; this crate wires it to pins and tasks:
//!
//! - Step tick on a high-priority interrupt executor (SWI_IRQ_1)
//! - Motion, inputs and status tasks on the thread-mode executor
//!
//! Machine settings come from `machine.toml`, compiled into the firmware.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ucnc_core::config::{parse_settings, MotionSettings};
use ucnc_core::interpolator::Interpolator;
use ucnc_core::planner::HandoffQueue;
use ucnc_core::MotionContext;

use crate::board::{PinStepPort, TowerLight};
use crate::channels::MOTION_SHARED;

mod board;
mod channels;
mod tasks;

/// Embedded machine configuration (compiled into firmware)
/// Edit machine.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../machine.toml");

/// Executor for the step tick, preempts everything on the thread executor
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

// Static cells for state shared with tasks (must live forever)
static HANDOFF: StaticCell<HandoffQueue> = StaticCell::new();
static LIGHT: StaticCell<TowerLight<Output<'static>>> = StaticCell::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("uCNC firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let settings = load_settings();

    // Block handoff between the motion task and the step tick
    let (producer, consumer) = HANDOFF.init(HandoffQueue::new()).split();

    // Step/dir/enable pins (SKR Pico), drivers enable low
    let port = PinStepPort::new(
        [
            Output::new(p.PIN_11, Level::Low),
            Output::new(p.PIN_6, Level::Low),
            Output::new(p.PIN_19, Level::Low),
            Output::new(p.PIN_14, Level::Low),
        ],
        [
            Output::new(p.PIN_10, Level::Low),
            Output::new(p.PIN_5, Level::Low),
            Output::new(p.PIN_28, Level::Low),
            Output::new(p.PIN_13, Level::Low),
        ],
        [
            Output::new(p.PIN_12, Level::High),
            Output::new(p.PIN_7, Level::High),
            Output::new(p.PIN_2, Level::High),
            Output::new(p.PIN_15, Level::High),
        ],
        true,
    );
    info!("Stepper outputs initialized");

    let interpolator = Interpolator::new(consumer, &MOTION_SHARED, &settings);
    let mut ctx = MotionContext::new(&MOTION_SHARED, producer, &settings);

    let light = LIGHT.init(TowerLight::new(
        Output::new(p.PIN_17, Level::Low),
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_20, Level::Low),
    ));
    if ctx.register_listener(light).is_err() {
        warn!("No listener slot for the signal light");
    }

    let limits = [
        Input::new(p.PIN_4, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_25, Pull::Up),
    ];
    let estop = Input::new(p.PIN_16, Pull::Up);
    let door = Input::new(p.PIN_22, Pull::Up);
    info!("Inputs initialized");

    // High-priority executor for the step tick
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high_spawner
        .spawn(tasks::stepper_task(interpolator, port, settings.timer_hz))
        .unwrap();

    spawner.spawn(tasks::motion_task(ctx)).unwrap();
    spawner.spawn(tasks::limits_task(limits, estop)).unwrap();
    spawner.spawn(tasks::door_task(door)).unwrap();
    spawner.spawn(tasks::status_task()).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded machine configuration
///
/// build.rs already checked the file, so a failure here means it uses
/// something the runtime reader does not understand. Fall back to the
/// built-in defaults rather than refusing to boot.
fn load_settings() -> MotionSettings {
    match parse_settings(EMBEDDED_CONFIG) {
        Ok(settings) => {
            info!(
                "Machine config: {:?} kinematics, {:?} profile, timer {} Hz, DSS level {}",
                settings.kinematics,
                settings.profile,
                settings.timer_hz,
                settings.dss.max_oversampling
            );
            settings
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using built-in default settings");
            MotionSettings::default()
        }
    }
}
