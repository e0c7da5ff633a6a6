//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use ucnc_core::config::MotionSettings;
use ucnc_core::planner::{MotionRequest, RapidOverride};
use ucnc_core::state::{FaultKind, MotionShared};
use ucnc_core::{Coords, Status};

/// Channel capacity for queued motion commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for realtime commands
const REALTIME_CHANNEL_SIZE: usize = 8;

/// Commands executed in order, waiting while the planner is full
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionCommand {
    /// Move to a Cartesian target
    Move {
        target: Coords,
        request: MotionRequest,
    },
    /// Replace the motion settings once the machine is idle
    ReloadSettings(MotionSettings),
}

/// Commands acted on immediately, ahead of any queued motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RealtimeCommand {
    FeedHold,
    Resume,
    JogCancel,
    Reset,
    Unlock,
    DoorOpened,
    DoorClosed,
    /// Fault detected on an input (limit switch, e-stop)
    Fault(FaultKind),
    /// Set the feed override in percent
    FeedOverride(u8),
    /// Step the feed override by a signed percentage
    FeedOverrideStep(i16),
    RapidOverride(RapidOverride),
    /// Set the spindle override in percent
    SpindleOverride(u8),
    ResetOverrides,
}

/// State shared between the step tick and the foreground
pub static MOTION_SHARED: MotionShared = MotionShared::new();

/// Queued motion commands, consumed by the motion task
pub static COMMANDS: Channel<CriticalSectionRawMutex, MotionCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Realtime commands from the dispatcher and the input pins
pub static REALTIME: Channel<CriticalSectionRawMutex, RealtimeCommand, REALTIME_CHANNEL_SIZE> =
    Channel::new();

/// Latest status snapshot (updated by the motion task)
pub static STATUS: Signal<CriticalSectionRawMutex, Status> = Signal::new();

/// Settings accepted by the motion task, picked up by the tick while idle
pub static SETTINGS_RELOAD: Signal<CriticalSectionRawMutex, MotionSettings> = Signal::new();
