//! Motion command resolution and enablement.

#![allow(missing_docs)]

use std::fmt;
use std::time::Duration;

use crate::error::SandbotError;
use crate::status::{ConnectionState, DeviceStatus};

/// Delay before the out-of-band status refresh that follows a command.
pub const COMMAND_REFRESH_DELAY: Duration = Duration::from_millis(500);

/// What the single play/pause gesture means for the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPauseAction {
    Resume,
    Pause,
    Play,
}

/// Map the play/pause gesture onto a device command.
///
/// The pause flag wins over the queue depth: a paused robot with queued
/// moves resumes rather than pausing again.
#[must_use]
pub fn resolve_play_pause(status: &DeviceStatus) -> PlayPauseAction {
    if status.paused {
        PlayPauseAction::Resume
    } else if status.queue_depth >= 1 {
        PlayPauseAction::Pause
    } else {
        PlayPauseAction::Play
    }
}

/// Commands sent through `/exec/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Play,
    Pause,
    Resume,
    Stop,
    Home,
    SetHome,
}

impl MotionCommand {
    /// Command text understood by the firmware.
    #[must_use]
    pub fn exec_command(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Home => "G28",
            Self::SetHome => "G92 X0 Y0",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Home => "home",
            Self::SetHome => "set home",
        }
    }

    /// Whether the command comes out of the play/pause gesture.
    #[must_use]
    pub fn is_play_pause(self) -> bool {
        matches!(self, Self::Play | Self::Pause | Self::Resume)
    }
}

impl From<PlayPauseAction> for MotionCommand {
    fn from(value: PlayPauseAction) -> Self {
        match value {
            PlayPauseAction::Resume => Self::Resume,
            PlayPauseAction::Pause => Self::Pause,
            PlayPauseAction::Play => Self::Play,
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs the enablement rules look at.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub identity: &'a str,
    pub pattern_loaded: bool,
    pub state: ConnectionState,
}

/// Stop, home and set-home need a target that is currently reachable.
pub fn check_direct(ctx: &CommandContext<'_>) -> Result<(), SandbotError> {
    if ctx.identity.trim().is_empty() {
        return Err(SandbotError::Precondition("no robot address configured".into()));
    }
    if !ctx.state.is_connected() {
        return Err(SandbotError::Precondition(
            format!("robot {} is offline", ctx.identity).into(),
        ));
    }
    Ok(())
}

/// Play/pause additionally needs a loaded pattern.
pub fn check_play_pause(ctx: &CommandContext<'_>) -> Result<(), SandbotError> {
    check_direct(ctx)?;
    if !ctx.pattern_loaded {
        return Err(SandbotError::Precondition("no pattern loaded".into()));
    }
    Ok(())
}

/// Run the enablement check that applies to `command`.
pub fn check_command(command: MotionCommand, ctx: &CommandContext<'_>) -> Result<(), SandbotError> {
    if command.is_play_pause() {
        check_play_pause(ctx)
    } else {
        check_direct(ctx)
    }
}
