//! Engine driver tying the session to the device link.
//!
//! Background requests (status polls and the bootstrap fetches) run on
//! short-lived worker threads and report back over a channel; the engine
//! folds them into the [`Session`] on [`Engine::pump`]. User actions are
//! blocking calls made on the caller's thread.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use smol_str::SmolStr;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::command::{check_command, check_direct, resolve_play_pause, CommandContext, MotionCommand};
use crate::config::SessionConfig;
use crate::device::{DeviceReply, DeviceRequest, DeviceTransport};
use crate::error::SandbotError;
use crate::files::{check_result, FileListing, DEFAULT_FS};
use crate::ledger::{playlist_content, playlist_file_name, to_playlist, HistoryLedger};
use crate::network::{NetworkConfig, NETWORK_FILE, NETWORK_FS};
use crate::pattern::{encode_pattern, estimate_draw_time, parse_pattern, Pattern};
use crate::preview::{render_preview, PreviewFrame, Viewport};
use crate::session::{Session, SessionAction, Ticket};
use crate::status::{supports_network_config, ConnectionState, DeviceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// User-facing outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Pattern currently shown in the preview.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPattern {
    pub name: SmolStr,
    pub pattern: Pattern,
}

/// Network file as read from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFetch {
    pub config: NetworkConfig,
    /// False when the file is missing or unreadable and defaults were used.
    pub exists: bool,
}

enum Completion {
    Poll(Ticket, Result<DeviceStatus, SandbotError>),
    Settings(Ticket, Result<Value, SandbotError>),
    Files(Ticket, Result<FileListing, SandbotError>),
}

pub struct Engine {
    session: Session,
    config: SessionConfig,
    transport: Arc<dyn DeviceTransport>,
    clock: Arc<dyn Clock>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    outstanding: usize,
    ledger: HistoryLedger,
    loaded: Option<LoadedPattern>,
    played_file: Option<SmolStr>,
    progress: f64,
    notices: VecDeque<Notice>,
}

impl Engine {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Result<Self, SandbotError> {
        let (tx, rx) = mpsc::channel();
        let mut engine = Self {
            session: Session::default(),
            config: SessionConfig::default(),
            transport,
            clock,
            tx,
            rx,
            outstanding: 0,
            ledger: HistoryLedger::new(),
            loaded: None,
            played_file: None,
            progress: 100.0,
            notices: VecDeque::new(),
        };
        engine.apply_config(config)?;
        Ok(engine)
    }

    /// Apply a new session configuration; the session restarts only for
    /// values that changed.
    pub fn apply_config(&mut self, config: SessionConfig) -> Result<(), SandbotError> {
        if self.session.is_disposed() {
            return Err(disposed());
        }
        self.session.configure(
            &config.host,
            Duration::from_secs(config.poll_cycle_secs),
            config.mode,
            self.clock.now(),
        )?;
        self.config = config;
        Ok(())
    }

    /// Fold finished background requests in and dispatch due ones.
    /// Returns the number of completions handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.handle(completion);
            handled += 1;
        }
        let now = self.clock.now();
        for action in self.session.due(now) {
            self.dispatch(action);
        }
        handled
    }

    /// Block for up to `timeout` waiting on one completion, then pump.
    pub fn wait(&mut self, timeout: Duration) -> usize {
        let mut handled = 0;
        if self.outstanding > 0 {
            if let Ok(completion) = self.rx.recv_timeout(timeout) {
                self.handle(completion);
                handled += 1;
            }
        }
        handled + self.pump()
    }

    /// Pump until no background request is outstanding. Returns false when
    /// `timeout` ran out first.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.outstanding == 0 {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => self.handle(completion),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return self.outstanding == 0,
            }
        }
    }

    /// Tear the session down; late results are dropped.
    pub fn dispose(&mut self) {
        self.session.dispose();
    }

    fn dispatch(&mut self, action: SessionAction) {
        let host = SmolStr::from(self.session.identity());
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let job = move || {
            let completion = run_action(transport.as_ref(), &host, action);
            let _ = tx.send(completion);
        };
        self.outstanding += 1;
        debug!("dispatch {action:?}");
        if let Err(err) = thread::Builder::new()
            .name("sandbot-request".to_string())
            .spawn(job)
        {
            warn!("request worker spawn failed: {err}");
            let failure = || SandbotError::Transport(format!("worker spawn failed: {err}").into());
            let completion = match action {
                SessionAction::Poll(ticket) => Completion::Poll(ticket, Err(failure())),
                SessionAction::FetchSettings(ticket) => Completion::Settings(ticket, Err(failure())),
                SessionAction::FetchFiles(ticket) => Completion::Files(ticket, Err(failure())),
            };
            self.handle(completion);
        }
    }

    fn handle(&mut self, completion: Completion) {
        self.outstanding = self.outstanding.saturating_sub(1);
        match completion {
            Completion::Poll(ticket, result) => {
                for action in self.session.complete_poll(ticket, result) {
                    self.dispatch(action);
                }
            }
            Completion::Settings(ticket, result) => {
                self.session.complete_settings(ticket, result);
            }
            Completion::Files(ticket, result) => {
                self.session.complete_files(ticket, result);
            }
        }
    }

    fn refresh_files(&mut self) {
        if let Some(action) = self.session.request_files() {
            self.dispatch(action);
        }
    }

    fn send(&self, request: &DeviceRequest) -> Result<DeviceReply, SandbotError> {
        if self.session.is_disposed() {
            return Err(disposed());
        }
        self.transport.request(self.session.identity(), request)
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let notice = Notice {
            level,
            text: text.into(),
        };
        match level {
            NoticeLevel::Error => warn!("{}", notice.text),
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", notice.text),
        }
        self.notices.push_back(notice);
    }

    fn report<T>(&mut self, result: Result<T, SandbotError>) -> Result<T, SandbotError> {
        if let Err(err) = &result {
            self.notify(NoticeLevel::Error, err.to_string());
        }
        result
    }

    /// Like [`Engine::report`], naming the action for failures that do not
    /// already carry one.
    fn report_as<T>(&mut self, action: &str, result: Result<T, SandbotError>) -> Result<T, SandbotError> {
        match &result {
            Err(err @ (SandbotError::DeviceRejected { .. } | SandbotError::Precondition(_))) => {
                self.notify(NoticeLevel::Error, err.to_string());
            }
            Err(err) => self.notify(NoticeLevel::Error, format!("{action} failed: {err}")),
            Ok(_) => {}
        }
        result
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            identity: self.session.identity(),
            pattern_loaded: self.pattern_loaded(),
            state: self.session.connection_state(),
        }
    }

    fn fs_name(&self) -> SmolStr {
        self.session
            .files()
            .map_or_else(|| SmolStr::new(DEFAULT_FS), |files| files.fs().into())
    }

    /// Send one motion command; a successful send schedules a status
    /// refresh.
    pub fn run_command(&mut self, command: MotionCommand) -> Result<(), SandbotError> {
        let checked = check_command(command, &self.context());
        self.report(checked)?;
        let sent = self.send(&DeviceRequest::exec(command));
        self.report_as(command.label(), sent)?;
        self.session.schedule_refresh(self.clock.now());
        self.notify(NoticeLevel::Info, format!("sent {command}"));
        Ok(())
    }

    /// Resolve the play/pause gesture against the latest status and send it.
    pub fn play_pause(&mut self) -> Result<MotionCommand, SandbotError> {
        let checked = check_command(MotionCommand::Play, &self.context());
        self.report(checked)?;
        let command = self
            .session
            .status()
            .map_or(MotionCommand::Play, |status| resolve_play_pause(status).into());
        self.run_command(command)?;
        Ok(command)
    }

    pub fn stop(&mut self) -> Result<(), SandbotError> {
        self.run_command(MotionCommand::Stop)
    }

    pub fn home(&mut self) -> Result<(), SandbotError> {
        self.run_command(MotionCommand::Home)
    }

    pub fn set_home(&mut self) -> Result<(), SandbotError> {
        self.run_command(MotionCommand::SetHome)
    }

    /// Start a device file. The play is recorded as soon as the device
    /// accepted the request.
    pub fn play_file(&mut self, name: &str) -> Result<(), SandbotError> {
        let checked = check_direct(&self.context());
        self.report(checked)?;
        let fs = self.fs_name();
        let sent = self.send(&DeviceRequest::play_file(&fs, name));
        self.report_as("play", sent)?;
        self.ledger.record(name, OffsetDateTime::now_utc());
        self.played_file = Some(name.into());
        self.session.schedule_refresh(self.clock.now());
        self.notify(NoticeLevel::Success, format!("playing {name}"));
        Ok(())
    }

    pub fn delete_file(&mut self, name: &str) -> Result<(), SandbotError> {
        let checked = check_direct(&self.context());
        self.report(checked)?;
        let fs = self.fs_name();
        let result = self
            .send(&DeviceRequest::delete_file(&fs, name))
            .and_then(|reply| reply.json())
            .and_then(|body| check_result("delete", &body));
        self.report_as("delete", result)?;
        if self.loaded.as_ref().is_some_and(|loaded| loaded.name == name) {
            self.loaded = None;
        }
        self.notify(NoticeLevel::Success, format!("deleted {name}"));
        self.refresh_files();
        Ok(())
    }

    /// Upload a file through the file manager.
    pub fn upload(&mut self, file_name: &str, content: impl Into<Vec<u8>>) -> Result<(), SandbotError> {
        let checked = check_direct(&self.context());
        self.report(checked)?;
        let sent = self.send(&DeviceRequest::upload(file_name, content));
        self.report_as("upload", sent)?;
        self.notify(NoticeLevel::Success, format!("uploaded {file_name}"));
        self.refresh_files();
        Ok(())
    }

    /// Fetch a device file into the preview at full progress.
    pub fn preview_file(&mut self, name: &str) -> Result<&LoadedPattern, SandbotError> {
        let checked = check_direct(&self.context());
        self.report(checked)?;
        let fs = self.fs_name();
        let reply = self.send(&DeviceRequest::file_content(&fs, name));
        let reply = self.report_as("preview", reply)?;
        Ok(self.load_pattern(name, parse_pattern(&reply.body)))
    }

    /// Load pattern text from outside the device into the preview.
    pub fn load_local_pattern(&mut self, name: &str, text: &str) -> &LoadedPattern {
        self.load_pattern(name, parse_pattern(text))
    }

    fn load_pattern(&mut self, name: &str, pattern: Pattern) -> &LoadedPattern {
        debug!("loaded pattern {name} with {} points", pattern.len());
        self.progress = 100.0;
        self.loaded.insert(LoadedPattern {
            name: name.into(),
            pattern,
        })
    }

    /// Write the previewed pattern back to the device under its name.
    pub fn save_pattern(&mut self) -> Result<(), SandbotError> {
        let loaded = match &self.loaded {
            Some(loaded) if !loaded.pattern.is_empty() => loaded.clone(),
            _ => {
                let missing = Err(SandbotError::Precondition("no pattern loaded".into()));
                return self.report(missing);
            }
        };
        self.upload(&loaded.name, encode_pattern(&loaded.pattern))
    }

    /// Upload the play history as a `.seq` playlist. Returns the file name.
    pub fn save_playlist(&mut self, name: &str) -> Result<String, SandbotError> {
        if name.trim().is_empty() {
            return self.report(Err(SandbotError::Precondition("playlist name is empty".into())));
        }
        if self.ledger.is_empty() {
            return self.report(Err(SandbotError::Precondition("history is empty".into())));
        }
        let file_name = playlist_file_name(name);
        let content = playlist_content(&to_playlist(self.ledger.entries()));
        self.upload(&file_name, content)?;
        Ok(file_name)
    }

    fn check_network_support(&mut self) -> Result<(), SandbotError> {
        let checked = check_direct(&self.context());
        self.report(checked)?;
        if supports_network_config(self.session.status()) {
            return Ok(());
        }
        self.report(Err(SandbotError::Precondition(
            "network configuration needs firmware 2.30.0 or newer".into(),
        )))
    }

    /// Read `.network`; a missing or unreadable file yields the defaults.
    pub fn fetch_network_config(&mut self) -> Result<NetworkFetch, SandbotError> {
        self.check_network_support()?;
        let fetched = self
            .send(&DeviceRequest::file_content(NETWORK_FS, NETWORK_FILE))
            .and_then(|reply| NetworkConfig::from_json(&reply.body));
        Ok(match fetched {
            Ok(config) => NetworkFetch {
                config,
                exists: true,
            },
            Err(err) => {
                debug!("network file unavailable: {err}");
                NetworkFetch {
                    config: NetworkConfig::default(),
                    exists: false,
                }
            }
        })
    }

    pub fn save_network_config(&mut self, config: &NetworkConfig) -> Result<(), SandbotError> {
        self.check_network_support()?;
        let sent = self.send(&DeviceRequest::upload(NETWORK_FILE, config.to_json()));
        self.report_as("save network configuration", sent)?;
        self.notify(NoticeLevel::Success, "network configuration saved");
        Ok(())
    }

    pub fn delete_network_config(&mut self) -> Result<(), SandbotError> {
        self.check_network_support()?;
        let result = self
            .send(&DeviceRequest::delete_file(NETWORK_FS, NETWORK_FILE))
            .and_then(|reply| reply.json())
            .and_then(|body| check_result("delete network configuration", &body));
        self.report_as("delete network configuration", result)?;
        self.notify(NoticeLevel::Success, "network configuration deleted");
        Ok(())
    }

    /// Set the preview progress, clamped to `0..=100`.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Preview of the loaded pattern at the current progress.
    #[must_use]
    pub fn preview(&self, viewport: Viewport) -> PreviewFrame {
        let empty = Pattern::default();
        let pattern = self.loaded.as_ref().map_or(&empty, |loaded| &loaded.pattern);
        render_preview(pattern, self.progress, viewport)
    }

    /// Draw-time estimate of the loaded pattern with the robot's geometry.
    #[must_use]
    pub fn estimate(&self) -> Option<f64> {
        let loaded = self.loaded.as_ref()?;
        estimate_draw_time(&loaded.pattern, self.session.geometry())
    }

    /// A pattern reference exists: previewed or played from here.
    #[must_use]
    pub fn pattern_loaded(&self) -> bool {
        self.loaded.is_some() || self.played_file.is_some()
    }

    #[must_use]
    pub fn loaded_pattern(&self) -> Option<&LoadedPattern> {
        self.loaded.as_ref()
    }

    #[must_use]
    pub fn played_file(&self) -> Option<&str> {
        self.played_file.as_deref()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &HistoryLedger {
        &self.ledger
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

fn disposed() -> SandbotError {
    SandbotError::Precondition("session disposed".into())
}

fn run_action(transport: &dyn DeviceTransport, host: &str, action: SessionAction) -> Completion {
    match action {
        SessionAction::Poll(ticket) => {
            let result = transport
                .request(host, &DeviceRequest::status())
                .and_then(|reply| reply.json())
                .and_then(|body| DeviceStatus::from_json(&body, OffsetDateTime::now_utc()));
            Completion::Poll(ticket, result)
        }
        SessionAction::FetchSettings(ticket) => {
            let result = transport
                .request(host, &DeviceRequest::settings())
                .and_then(|reply| reply.json());
            Completion::Settings(ticket, result)
        }
        SessionAction::FetchFiles(ticket) => {
            let result = transport
                .request(host, &DeviceRequest::file_list())
                .and_then(|reply| reply.json())
                .and_then(|body| FileListing::from_json(&body));
            Completion::Files(ticket, result)
        }
    }
}
