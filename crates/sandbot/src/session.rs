//! Connection session state machine.
//!
//! The session is sans-IO: it decides *when* to talk to the robot and folds
//! results back in, while the caller performs the requests. Every request is
//! handed out as a [`Ticket`] stamped with the epoch it was issued in. Any
//! change of target bumps the epoch, so results that arrive after the world
//! moved on are recognised and dropped.

#![allow(missing_docs)]

use std::time::Duration;

use serde_json::Value;
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::command::COMMAND_REFRESH_DELAY;
use crate::config::{ControlMode, DEFAULT_POLL_CYCLE_SECS};
use crate::error::SandbotError;
use crate::files::FileListing;
use crate::settings::RobotGeometryConfig;
use crate::status::{ConnectionState, DeviceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Poll,
    Settings,
    FileList,
}

/// Proof of dispatch carried by every request until its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    kind: RequestKind,
}

impl Ticket {
    #[must_use]
    pub fn epoch(self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn kind(self) -> RequestKind {
        self.kind
    }
}

/// Request the caller should issue on the session's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// `GET /status`.
    Poll(Ticket),
    /// `GET /getsettings`.
    FetchSettings(Ticket),
    /// `GET /filelist/`.
    FetchFiles(Ticket),
}

impl SessionAction {
    #[must_use]
    pub fn ticket(self) -> Ticket {
        match self {
            Self::Poll(ticket) | Self::FetchSettings(ticket) | Self::FetchFiles(ticket) => ticket,
        }
    }
}

/// Lifetime counters for the periodic timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub armed: u64,
    pub cancelled: u64,
    pub ticks: u64,
    pub skipped_ticks: u64,
}

impl TimerStats {
    /// Timers currently armed (never more than one).
    #[must_use]
    pub fn live(&self) -> u64 {
        self.armed - self.cancelled
    }
}

#[derive(Debug, Clone, Copy)]
struct PollTimer {
    period: Duration,
    next_due: Duration,
}

#[derive(Debug, Clone)]
pub struct Session {
    identity: SmolStr,
    poll_cycle: Duration,
    mode: ControlMode,
    epoch: u64,
    timer: Option<PollTimer>,
    poll_requested: bool,
    poll_in_flight: bool,
    refresh_at: Option<Duration>,
    has_ever_connected: bool,
    last_poll_succeeded: bool,
    last_error: Option<SandbotError>,
    bootstrapped: bool,
    status: Option<DeviceStatus>,
    geometry: RobotGeometryConfig,
    files: Option<FileListing>,
    stats: TimerStats,
    disposed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_POLL_CYCLE_SECS))
    }
}

impl Session {
    /// Inert session with no target.
    #[must_use]
    pub fn new(poll_cycle: Duration) -> Self {
        Self {
            identity: SmolStr::default(),
            poll_cycle,
            mode: ControlMode::Disabled,
            epoch: 0,
            timer: None,
            poll_requested: false,
            poll_in_flight: false,
            refresh_at: None,
            has_ever_connected: false,
            last_poll_succeeded: false,
            last_error: None,
            bootstrapped: false,
            status: None,
            geometry: RobotGeometryConfig::default(),
            files: None,
            stats: TimerStats::default(),
            disposed: false,
        }
    }

    /// Apply target, period and mode together. Whatever changed costs at
    /// most one timer restart; an empty identity tears polling down.
    ///
    /// A new identity forgets everything learned about the previous target
    /// and re-opens the bootstrap latch. Nothing is applied after
    /// [`Session::dispose`].
    pub fn configure(
        &mut self,
        identity: &str,
        poll_cycle: Duration,
        mode: ControlMode,
        now: Duration,
    ) -> Result<(), SandbotError> {
        if poll_cycle.is_zero() {
            return Err(SandbotError::InvalidConfig(
                "poll cycle must be greater than zero".into(),
            ));
        }
        self.apply(identity, poll_cycle, mode, now);
        Ok(())
    }

    /// Point the session at a robot.
    pub fn set_identity(&mut self, identity: &str, now: Duration) {
        self.apply(identity, self.poll_cycle, self.mode, now);
    }

    /// Change the poll period; restarts the timer when a target is set.
    pub fn set_poll_cycle(&mut self, poll_cycle: Duration, now: Duration) -> Result<(), SandbotError> {
        let identity = self.identity.clone();
        self.configure(&identity, poll_cycle, self.mode, now)
    }

    /// Change the control mode; restarts the timer when a target is set.
    pub fn set_mode(&mut self, mode: ControlMode, now: Duration) {
        let identity = self.identity.clone();
        self.apply(&identity, self.poll_cycle, mode, now);
    }

    fn apply(&mut self, identity: &str, poll_cycle: Duration, mode: ControlMode, now: Duration) {
        if self.disposed {
            debug!("ignoring reconfiguration of a disposed session");
            return;
        }
        let identity = identity.trim();
        let identity_changed = identity != self.identity.as_str();
        if !identity_changed && poll_cycle == self.poll_cycle && mode == self.mode {
            return;
        }
        self.poll_cycle = poll_cycle;
        self.mode = mode;
        if identity_changed {
            info!("session target '{}' -> '{identity}'", self.identity);
            self.identity = identity.into();
            self.bump_epoch();
            self.forget_target();
        }
        if self.identity.is_empty() {
            self.cancel_timer();
        } else {
            self.restart(now);
        }
    }

    /// Stop all timers and invalidate every outstanding request. The session
    /// stays offline and inert from here on.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.cancel_timer();
        self.bump_epoch();
        self.forget_target();
        debug!("session disposed at epoch {}", self.epoch);
    }

    /// Arm a one-shot status refresh after [`COMMAND_REFRESH_DELAY`].
    ///
    /// The periodic timer is left alone. A newer refresh replaces a pending
    /// one.
    pub fn schedule_refresh(&mut self, now: Duration) {
        if self.disposed || self.identity.is_empty() {
            return;
        }
        self.refresh_at = Some(now + COMMAND_REFRESH_DELAY);
    }

    /// Requests due at `now`.
    ///
    /// At most one status poll is outstanding: timer ticks and refreshes that
    /// land while one is in flight are dropped, not queued.
    pub fn due(&mut self, now: Duration) -> Vec<SessionAction> {
        if self.disposed || self.identity.is_empty() {
            return Vec::new();
        }
        let mut wants_poll = std::mem::take(&mut self.poll_requested);
        if let Some(timer) = self.timer.as_mut() {
            if now >= timer.next_due {
                while timer.next_due <= now {
                    timer.next_due += timer.period;
                }
                self.stats.ticks += 1;
                if self.poll_in_flight {
                    self.stats.skipped_ticks += 1;
                    debug!("poll tick skipped, request in flight");
                } else {
                    wants_poll = true;
                }
            }
        }
        if self.refresh_at.is_some_and(|at| now >= at) {
            self.refresh_at = None;
            wants_poll = true;
        }
        if !wants_poll || self.poll_in_flight {
            return Vec::new();
        }
        self.poll_in_flight = true;
        vec![SessionAction::Poll(self.ticket(RequestKind::Poll))]
    }

    /// Earliest instant at which [`Session::due`] may have work.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Duration> {
        if self.disposed || self.identity.is_empty() {
            return None;
        }
        let timer = self.timer.map(|timer| timer.next_due);
        match (timer, self.refresh_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fold a status poll result in. Returns the bootstrap requests on the
    /// first success for the current target.
    pub fn complete_poll(
        &mut self,
        ticket: Ticket,
        result: Result<DeviceStatus, SandbotError>,
    ) -> Vec<SessionAction> {
        if !self.is_current(ticket) {
            return Vec::new();
        }
        self.poll_in_flight = false;
        match result {
            Ok(status) => {
                if !self.last_poll_succeeded {
                    info!("robot {} online", self.identity);
                }
                self.status = Some(status);
                self.has_ever_connected = true;
                self.last_poll_succeeded = true;
                self.last_error = None;
                if self.bootstrapped {
                    return Vec::new();
                }
                self.bootstrapped = true;
                debug!("bootstrapping session for {}", self.identity);
                vec![
                    SessionAction::FetchSettings(self.ticket(RequestKind::Settings)),
                    SessionAction::FetchFiles(self.ticket(RequestKind::FileList)),
                ]
            }
            Err(err) => {
                if self.last_poll_succeeded || !self.has_ever_connected {
                    warn!("robot {} unreachable: {err}", self.identity);
                }
                self.last_poll_succeeded = false;
                self.last_error = Some(err);
                Vec::new()
            }
        }
    }

    /// Fold a settings fetch in. Returns true when the geometry changed.
    pub fn complete_settings(
        &mut self,
        ticket: Ticket,
        result: Result<Value, SandbotError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match result {
            Ok(settings) => {
                let changed = self.geometry.apply_settings(&settings);
                debug!("settings applied, geometry changed: {changed}");
                changed
            }
            Err(err) => {
                warn!("settings fetch failed: {err}");
                false
            }
        }
    }

    /// Fold a file listing in. Returns true when the listing was stored.
    pub fn complete_files(
        &mut self,
        ticket: Ticket,
        result: Result<FileListing, SandbotError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match result {
            Ok(listing) => {
                debug!("file listing: {} entries", listing.files.len());
                self.files = Some(listing);
                true
            }
            Err(err) => {
                warn!("file listing failed: {err}");
                false
            }
        }
    }

    /// Out-of-band file listing request for the current target.
    #[must_use]
    pub fn request_files(&self) -> Option<SessionAction> {
        if self.disposed || self.identity.is_empty() {
            return None;
        }
        Some(SessionAction::FetchFiles(self.ticket(RequestKind::FileList)))
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::classify(
            self.has_ever_connected,
            self.last_poll_succeeded,
            self.status.as_ref(),
        )
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn poll_cycle(&self) -> Duration {
        self.poll_cycle
    }

    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn status(&self) -> Option<&DeviceStatus> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn geometry(&self) -> &RobotGeometryConfig {
        &self.geometry
    }

    #[must_use]
    pub fn files(&self) -> Option<&FileListing> {
        self.files.as_ref()
    }

    #[must_use]
    pub fn has_ever_connected(&self) -> bool {
        self.has_ever_connected
    }

    #[must_use]
    pub fn last_poll_succeeded(&self) -> bool {
        self.last_poll_succeeded
    }

    /// Why the latest poll failed, while it is still the latest.
    #[must_use]
    pub fn last_error(&self) -> Option<&SandbotError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn poll_in_flight(&self) -> bool {
        self.poll_in_flight
    }

    #[must_use]
    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    #[must_use]
    pub fn timer_stats(&self) -> TimerStats {
        self.stats
    }

    fn ticket(&self, kind: RequestKind) -> Ticket {
        Ticket {
            epoch: self.epoch,
            kind,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        if ticket.epoch == self.epoch {
            return true;
        }
        debug!(
            "discarding stale {:?} result (epoch {} != {})",
            ticket.kind, ticket.epoch, self.epoch
        );
        false
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.poll_in_flight = false;
        self.poll_requested = false;
        self.refresh_at = None;
    }

    fn forget_target(&mut self) {
        self.has_ever_connected = false;
        self.last_poll_succeeded = false;
        self.last_error = None;
        self.bootstrapped = false;
        self.status = None;
        self.files = None;
    }

    fn cancel_timer(&mut self) {
        if self.timer.take().is_some() {
            self.stats.cancelled += 1;
            debug!("poll timer cancelled");
        }
    }

    fn restart(&mut self, now: Duration) {
        self.cancel_timer();
        self.timer = Some(PollTimer {
            period: self.poll_cycle,
            next_due: now + self.poll_cycle,
        });
        self.stats.armed += 1;
        self.poll_requested = true;
        debug!("poll timer armed every {:?}", self.poll_cycle);
    }
}
