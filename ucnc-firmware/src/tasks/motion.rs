//! Motion task
//!
//! Owns the [`MotionContext`]. Every pass it applies realtime commands,
//! admits at most one queued command and polls the context, which hands
//! planned blocks to the step tick and picks up faults raised there.
//!
//! A move that finds the planner full is kept and retried on the next
//! pass, so the command channel fills up and its sender waits.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use ucnc_core::config::ConfigError;
use ucnc_core::planner::{Admission, MotionKind, PlanError};
use ucnc_core::MotionContext;

use crate::channels::{MotionCommand, RealtimeCommand, COMMANDS, REALTIME, SETTINGS_RELOAD, STATUS};

/// Foreground pass interval
const POLL_INTERVAL_US: u64 = 500;

/// Status snapshot interval
const STATUS_INTERVAL_MS: u64 = 250;

/// Motion task
#[embassy_executor::task]
pub async fn motion_task(mut ctx: MotionContext<'static>) {
    info!("Motion task started");

    let mut pending: Option<MotionCommand> = None;
    let mut ticker = Ticker::every(Duration::from_micros(POLL_INTERVAL_US));
    let mut last_status = Instant::now();

    loop {
        while let Ok(command) = REALTIME.try_receive() {
            realtime(&mut ctx, command, &mut pending);
        }

        if pending.is_none() {
            pending = COMMANDS.try_receive().ok();
        }
        if let Some(command) = pending.take() {
            pending = queued(&mut ctx, command);
        }

        ctx.poll();

        if last_status.elapsed() >= Duration::from_millis(STATUS_INTERVAL_MS) {
            STATUS.signal(ctx.status());
            last_status = Instant::now();
        }

        ticker.next().await;
    }
}

/// Apply a realtime command; drops the pending move when motion is discarded
fn realtime(
    ctx: &mut MotionContext<'static>,
    command: RealtimeCommand,
    pending: &mut Option<MotionCommand>,
) {
    debug!("Realtime command: {:?}", command);

    match command {
        RealtimeCommand::FeedHold => ctx.hold(),
        RealtimeCommand::Resume => ctx.resume(),
        RealtimeCommand::JogCancel => {
            ctx.jog_cancel();
            if let Some(MotionCommand::Move { request, .. }) = pending {
                if request.kind == MotionKind::Jog {
                    *pending = None;
                }
            }
        }
        RealtimeCommand::Reset => {
            ctx.reset();
            *pending = None;
        }
        RealtimeCommand::Unlock => ctx.unlock(),
        RealtimeCommand::DoorOpened => ctx.door_opened(),
        RealtimeCommand::DoorClosed => ctx.door_closed(),
        RealtimeCommand::Fault(fault) => ctx.notify_fault(fault),
        RealtimeCommand::FeedOverride(percent) => ctx.set_feed_override(percent),
        RealtimeCommand::FeedOverrideStep(delta) => ctx.adjust_feed_override(delta),
        RealtimeCommand::RapidOverride(level) => ctx.set_rapid_override(level),
        RealtimeCommand::SpindleOverride(percent) => ctx.set_spindle_override(percent),
        RealtimeCommand::ResetOverrides => ctx.reset_overrides(),
    }

    if ctx.state().is_alarm() && pending.is_some() {
        warn!("Alarm: dropping pending command");
        *pending = None;
    }
}

/// Run a queued command, returning it when it has to wait
fn queued(ctx: &mut MotionContext<'static>, command: MotionCommand) -> Option<MotionCommand> {
    match command {
        MotionCommand::Move { target, request } => match ctx.admit(&target, request) {
            Ok(Admission::Queued) => trace!("Move queued ({} in flight)", ctx.in_flight()),
            Ok(Admission::Coalesced) => trace!("Move coalesced"),
            Err(PlanError::PlannerFull) if !ctx.state().is_alarm() => return Some(command),
            Err(e) => warn!("Move rejected: {:?}", e),
        },
        MotionCommand::ReloadSettings(settings) => match ctx.reload_settings(&settings) {
            Ok(()) => {
                SETTINGS_RELOAD.signal(settings);
                info!("Motion settings reloaded");
            }
            Err(ConfigError::Busy) => return Some(command),
            Err(e) => warn!("Settings rejected: {:?}", e),
        },
    }
    None
}
