//! Terminal UI for robot monitoring and control.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::canvas::{Canvas, Circle, Line as CanvasLine},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Terminal,
};

use crate::config::ControlMode;
use crate::engine::{Engine, NoticeLevel};
use crate::files::{filter_files, format_file_size, FileDescriptor};
use crate::ledger::format_timestamp;
use crate::pattern::format_duration;
use crate::preview::Viewport;
use crate::status::ConnectionState;

const COLOR_TEAL: Color = Color::Rgb(0, 168, 150);
const COLOR_GREEN: Color = Color::Rgb(46, 204, 113);
const COLOR_AMBER: Color = Color::Rgb(243, 156, 18);
const COLOR_RED: Color = Color::Rgb(231, 76, 60);
const COLOR_INFO: Color = Color::Rgb(142, 142, 147);
const COLOR_YELLOW: Color = Color::Rgb(245, 196, 66);
const COLOR_CYAN: Color = Color::Rgb(64, 212, 255);
const COLOR_SAND: Color = Color::Rgb(15, 95, 145);
const COLOR_PROMPT_BG: Color = Color::Rgb(24, 24, 24);

const PROGRESS_STEP: f64 = 5.0;
const MAX_ALERTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelKind {
    Status,
    Files,
    Preview,
    History,
}

impl PanelKind {
    fn title(self) -> &'static str {
        match self {
            PanelKind::Status => "Status",
            PanelKind::Files => "Files",
            PanelKind::Preview => "Preview",
            PanelKind::History => "History",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmAction {
    Delete(String),
    SetHome,
    DeleteNetwork,
}

impl ConfirmAction {
    fn question(&self) -> String {
        match self {
            ConfirmAction::Delete(name) => format!("Delete {name}? (y/n)"),
            ConfirmAction::SetHome => "Set current position as home? (y/n)".to_string(),
            ConfirmAction::DeleteNetwork => "Delete the network configuration? (y/n)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PromptState {
    active: bool,
    input: String,
    cursor: usize,
    output: Vec<(String, Style)>,
}

impl PromptState {
    fn activate(&mut self) {
        self.active = true;
        self.input.clear();
        self.cursor = 0;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.input.clear();
        self.cursor = 0;
    }
}

struct UiState {
    layout: Vec<PanelKind>,
    panel_page: usize,
    search: String,
    selected: usize,
    pending_confirm: Option<ConfirmAction>,
    prompt: PromptState,
    alerts: VecDeque<(String, Style)>,
    last_state: ConnectionState,
}

impl UiState {
    fn new() -> Self {
        Self {
            layout: vec![
                PanelKind::Status,
                PanelKind::Preview,
                PanelKind::Files,
                PanelKind::History,
            ],
            panel_page: 0,
            search: String::new(),
            selected: 0,
            pending_confirm: None,
            prompt: PromptState::default(),
            alerts: VecDeque::with_capacity(MAX_ALERTS),
            last_state: ConnectionState::Offline,
        }
    }
}

/// Run the interactive console until the user quits.
pub fn run_ui(mut engine: Engine, refresh_ms: u64) -> anyhow::Result<()> {
    let mut state = UiState::new();
    let refresh = Duration::from_millis(refresh_ms.max(20));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| {
        loop {
            engine.pump();
            track_connection(&engine, &mut state);
            for notice in engine.take_notices() {
                let color = match notice.level {
                    NoticeLevel::Info => COLOR_INFO,
                    NoticeLevel::Success => COLOR_GREEN,
                    NoticeLevel::Error => COLOR_RED,
                };
                push_alert(&mut state, notice.text, Style::default().fg(color));
            }

            terminal.draw(|frame| render_ui(frame.area(), frame, &state, &engine))?;

            if event::poll(refresh)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && handle_key(key, &mut engine, &mut state) {
                        break;
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })();

    engine.dispose();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn track_connection(engine: &Engine, state: &mut UiState) {
    let current = engine.connection_state();
    if current.is_connected() != state.last_state.is_connected() {
        if current.is_connected() {
            push_alert(
                state,
                format!("CONNECTED {}", engine.session().identity()),
                Style::default().fg(COLOR_GREEN),
            );
        } else if engine.session().has_ever_connected() {
            push_alert(
                state,
                "DISCONNECTED Polling continues...".to_string(),
                Style::default().fg(COLOR_AMBER),
            );
        }
    }
    state.last_state = current;
}

fn visible_files<'a>(engine: &'a Engine, state: &UiState) -> Vec<&'a FileDescriptor> {
    engine
        .session()
        .files()
        .map(|listing| filter_files(&listing.files, &state.search))
        .unwrap_or_default()
}

fn selected_file(engine: &Engine, state: &UiState) -> Option<String> {
    visible_files(engine, state)
        .get(state.selected)
        .map(|file| file.name.to_string())
}

fn move_selection(engine: &Engine, state: &mut UiState, delta: isize) {
    let len = visible_files(engine, state).len();
    if len == 0 {
        state.selected = 0;
        return;
    }
    state.selected = state.selected.saturating_add_signed(delta).min(len - 1);
}

fn handle_key(key: KeyEvent, engine: &mut Engine, state: &mut UiState) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    if state.prompt.active {
        return handle_prompt_key(key, engine, state);
    }
    if let Some(confirm) = state.pending_confirm.take() {
        handle_confirm(&confirm, key, engine);
        return false;
    }
    // Action failures are queued as notices by the engine.
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Char('/') | KeyCode::Char(':') => state.prompt.activate(),
        KeyCode::Char('?') => state.prompt.output = help_lines(),
        KeyCode::Tab => advance_panel_page(state),
        KeyCode::Char(' ') => {
            let _ = engine.play_pause();
        }
        KeyCode::Char('s') => {
            let _ = engine.stop();
        }
        KeyCode::Char('h') => {
            let _ = engine.home();
        }
        KeyCode::Char('H') => state.pending_confirm = Some(ConfirmAction::SetHome),
        KeyCode::Up | KeyCode::Char('k') => move_selection(engine, state, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(engine, state, 1),
        KeyCode::Left => engine.set_progress(engine.progress() - PROGRESS_STEP),
        KeyCode::Right => engine.set_progress(engine.progress() + PROGRESS_STEP),
        KeyCode::Home => engine.set_progress(0.0),
        KeyCode::End => engine.set_progress(100.0),
        KeyCode::Enter => {
            if let Some(name) = selected_file(engine, state) {
                let _ = engine.play_file(&name);
            }
        }
        KeyCode::Char('p') => {
            if let Some(name) = selected_file(engine, state) {
                let _ = engine.preview_file(&name);
            }
        }
        KeyCode::Char('d') => {
            if let Some(name) = selected_file(engine, state) {
                state.pending_confirm = Some(ConfirmAction::Delete(name));
            }
        }
        _ => {}
    }
    false
}

fn handle_confirm(action: &ConfirmAction, key: KeyEvent, engine: &mut Engine) {
    if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
        return;
    }
    let _ = match action {
        ConfirmAction::Delete(name) => engine.delete_file(name),
        ConfirmAction::SetHome => engine.set_home(),
        ConfirmAction::DeleteNetwork => engine.delete_network_config(),
    };
}

fn handle_prompt_key(key: KeyEvent, engine: &mut Engine, state: &mut UiState) -> bool {
    match key.code {
        KeyCode::Esc => state.prompt.deactivate(),
        KeyCode::Enter => {
            let input = std::mem::take(&mut state.prompt.input);
            state.prompt.deactivate();
            return execute_command(&input, engine, state);
        }
        KeyCode::Backspace => {
            if state.prompt.cursor > 0 {
                state.prompt.cursor -= 1;
                let at = char_offset(&state.prompt.input, state.prompt.cursor);
                state.prompt.input.remove(at);
            }
        }
        KeyCode::Left => state.prompt.cursor = state.prompt.cursor.saturating_sub(1),
        KeyCode::Right => {
            state.prompt.cursor = (state.prompt.cursor + 1).min(state.prompt.input.chars().count());
        }
        KeyCode::Char(ch) => {
            let at = char_offset(&state.prompt.input, state.prompt.cursor);
            state.prompt.input.insert(at, ch);
            state.prompt.cursor += 1;
        }
        _ => {}
    }
    false
}

fn char_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map_or(text.len(), |(offset, _)| offset)
}

#[derive(Debug, Clone, PartialEq)]
enum PromptCommand {
    Help,
    Quit,
    Host(String),
    Poll(u64),
    Mode(ControlMode),
    Search(String),
    Progress(f64),
    Open(String),
    Upload(String),
    Save,
    Playlist(String),
    Network,
    NetworkDelete,
}

fn parse_command(input: &str) -> Result<PromptCommand, String> {
    let raw = input.trim();
    let raw = raw.strip_prefix('/').unwrap_or(raw);
    let (head, rest) = raw.split_once(' ').unwrap_or((raw, ""));
    let rest = rest.trim();
    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("usage: {head} <{what}>"))
        } else {
            Ok(rest.to_string())
        }
    };
    match head {
        "help" | "?" => Ok(PromptCommand::Help),
        "quit" | "exit" | "q" => Ok(PromptCommand::Quit),
        "host" | "connect" => Ok(PromptCommand::Host(rest.to_string())),
        "poll" => {
            let value = needs_arg("seconds")?;
            match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(PromptCommand::Poll(secs)),
                _ => Err(format!("invalid poll cycle '{value}'")),
            }
        }
        "mode" => ControlMode::parse(&needs_arg("mode")?)
            .map(PromptCommand::Mode)
            .map_err(|err| err.to_string()),
        "search" | "find" => Ok(PromptCommand::Search(rest.to_string())),
        "progress" => {
            let value = needs_arg("percent")?;
            value
                .trim_end_matches('%')
                .parse::<f64>()
                .map(PromptCommand::Progress)
                .map_err(|_| format!("invalid progress '{value}'"))
        }
        "open" => needs_arg("path").map(PromptCommand::Open),
        "upload" => needs_arg("path").map(PromptCommand::Upload),
        "save" => Ok(PromptCommand::Save),
        "playlist" => needs_arg("name").map(PromptCommand::Playlist),
        "network" => match rest {
            "" | "show" => Ok(PromptCommand::Network),
            "delete" => Ok(PromptCommand::NetworkDelete),
            other => Err(format!("unknown network action '{other}'")),
        },
        other => Err(format!("unknown command '{other}' (try help)")),
    }
}

fn execute_command(input: &str, engine: &mut Engine, state: &mut UiState) -> bool {
    if input.trim().is_empty() {
        return false;
    }
    let command = match parse_command(input) {
        Ok(command) => command,
        Err(message) => {
            state.prompt.output = vec![(message, Style::default().fg(COLOR_AMBER))];
            return false;
        }
    };
    state.prompt.output.clear();
    match command {
        PromptCommand::Help => state.prompt.output = help_lines(),
        PromptCommand::Quit => return true,
        PromptCommand::Host(host) => {
            let mut config = engine.config().clone();
            config.host = host;
            apply_config(engine, state, config);
        }
        PromptCommand::Poll(secs) => {
            let mut config = engine.config().clone();
            config.poll_cycle_secs = secs;
            apply_config(engine, state, config);
        }
        PromptCommand::Mode(mode) => {
            let mut config = engine.config().clone();
            config.mode = mode;
            apply_config(engine, state, config);
        }
        PromptCommand::Search(text) => {
            state.search = text;
            state.selected = 0;
        }
        PromptCommand::Progress(progress) => engine.set_progress(progress),
        PromptCommand::Open(path) => match fs::read_to_string(&path) {
            Ok(text) => {
                let name = file_name_of(&path);
                engine.load_local_pattern(&name, &text);
            }
            Err(err) => {
                state.prompt.output = vec![(format!("{path}: {err}"), Style::default().fg(COLOR_RED))];
            }
        },
        PromptCommand::Upload(path) => match fs::read(&path) {
            Ok(content) => {
                let _ = engine.upload(&file_name_of(&path), content);
            }
            Err(err) => {
                state.prompt.output = vec![(format!("{path}: {err}"), Style::default().fg(COLOR_RED))];
            }
        },
        PromptCommand::Save => {
            let _ = engine.save_pattern();
        }
        PromptCommand::Playlist(name) => {
            let _ = engine.save_playlist(&name);
        }
        PromptCommand::Network => {
            if let Ok(fetched) = engine.fetch_network_config() {
                let config = fetched.config;
                let source = if fetched.exists { "stored" } else { "defaults" };
                state.prompt.output = vec![
                    (format!("network ({source})"), header_style()),
                    (format!("wifi      {}", config.mode.as_str()), value_style()),
                    (format!("ssid      {}", config.ssid), value_style()),
                    (format!("hostname  {}", config.hostname), value_style()),
                ];
            }
        }
        PromptCommand::NetworkDelete => state.pending_confirm = Some(ConfirmAction::DeleteNetwork),
    }
    false
}

fn apply_config(engine: &mut Engine, state: &mut UiState, config: crate::config::SessionConfig) {
    if let Err(err) = engine.apply_config(config) {
        state.prompt.output = vec![(err.to_string(), Style::default().fg(COLOR_RED))];
    }
    state.selected = 0;
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned())
}

fn help_lines() -> Vec<(String, Style)> {
    [
        "keys: space play/pause  s stop  h home  H set home  q quit",
        "      up/down select  enter play  p preview  d delete  left/right progress",
        "cmds: host <addr>  poll <secs>  mode <disabled|wled|legacy|cnc>  search <text>",
        "      open <path>  upload <path>  save  playlist <name>  network [show|delete]",
    ]
    .into_iter()
    .map(|line| (line.to_string(), Style::default().fg(COLOR_INFO)))
    .collect()
}

fn render_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &UiState, engine: &Engine) {
    let mut prompt_height = (state.prompt.output.len() + state.alerts.len() + 1) as u16;
    prompt_height = prompt_height.clamp(3, 8);
    let min_panel_height = 8;
    if prompt_height + min_panel_height + 1 >= area.height {
        prompt_height = area.height.saturating_sub(min_panel_height + 1).max(3);
    }
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(area.height.saturating_sub(prompt_height + 1)),
            Constraint::Length(prompt_height),
        ])
        .split(area);
    render_header(layout[0], frame, engine);
    render_panels(layout[1], frame, state, engine);
    render_prompt(layout[2], frame, state);
}

fn render_header(area: Rect, frame: &mut ratatui::Frame<'_>, engine: &Engine) {
    let chip = status_chip(engine.connection_state());
    let identity = engine.session().identity();
    let target = if identity.is_empty() {
        "no robot configured (/host <addr>)".to_string()
    } else {
        identity.to_string()
    };
    let mut spans = vec![
        Span::styled(chip.0, chip.1),
        Span::raw(" "),
        Span::styled(target, header_style()),
    ];
    if let Some(url) = engine.config().interface_url() {
        spans.push(Span::styled(
            format!("  {} {url}", engine.config().mode.title()),
            Style::default().fg(COLOR_INFO),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_panels(area: Rect, frame: &mut ratatui::Frame<'_>, state: &UiState, engine: &Engine) {
    let panels = state.layout.as_slice();
    if area.width >= 100 && panels.len() >= 4 {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(cols[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(cols[1]);
        render_panel(left[0], frame, state, engine, panels[0]);
        render_panel(right[0], frame, state, engine, panels[1]);
        render_panel(left[1], frame, state, engine, panels[2]);
        render_panel(right[1], frame, state, engine, panels[3]);
        return;
    }
    let panel = panels
        .get(state.panel_page % panels.len().max(1))
        .copied()
        .unwrap_or(PanelKind::Status);
    render_panel(area, frame, state, engine, panel);
}

fn render_panel(
    area: Rect,
    frame: &mut ratatui::Frame<'_>,
    state: &UiState,
    engine: &Engine,
    panel: PanelKind,
) {
    match panel {
        PanelKind::Status => render_status_panel(area, frame, engine),
        PanelKind::Files => render_files_panel(area, frame, state, engine),
        PanelKind::Preview => render_preview_panel(area, frame, engine),
        PanelKind::History => render_history_panel(area, frame, engine),
    }
}

fn render_status_panel(area: Rect, frame: &mut ratatui::Frame<'_>, engine: &Engine) {
    let session = engine.session();
    let mut lines = Vec::new();
    match session.status() {
        Some(status) => {
            for (label, value) in status.summary() {
                lines.push(label_value_line(label, &value, 10, value_style()));
            }
            if !session.last_poll_succeeded() {
                lines.push(label_value_line(
                    "Note",
                    "status is stale",
                    10,
                    Style::default().fg(COLOR_AMBER),
                ));
            }
        }
        None => lines.push(label_value_line(
            "Status",
            "no data",
            10,
            Style::default().fg(COLOR_INFO),
        )),
    }
    lines.push(label_value_line(
        "Poll",
        &format!("every {}s", session.poll_cycle().as_secs()),
        10,
        value_style(),
    ));
    let loaded = engine
        .played_file()
        .or(engine.loaded_pattern().map(|loaded| loaded.name.as_str()))
        .unwrap_or("none");
    lines.push(label_value_line("Pattern", loaded, 10, value_style()));
    frame.render_widget(
        Paragraph::new(lines)
            .block(panel_block(PanelKind::Status))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_files_panel(area: Rect, frame: &mut ratatui::Frame<'_>, state: &UiState, engine: &Engine) {
    let files = visible_files(engine, state);
    let inner_height = usize::from(area.height.saturating_sub(2)).max(1);
    let offset = state.selected.saturating_sub(inner_height.saturating_sub(1));
    let mut lines = Vec::new();
    if !state.search.is_empty() {
        lines.push(label_value_line("Search", &state.search, 8, value_style()));
    }
    if files.is_empty() {
        lines.push(Line::from(Span::styled(
            "no files",
            Style::default().fg(COLOR_INFO),
        )));
    }
    let name_width = usize::from(area.width.saturating_sub(14)).max(8);
    for (index, file) in files.iter().enumerate().skip(offset).take(inner_height) {
        let style = if index == state.selected {
            Style::default().fg(Color::Black).bg(COLOR_TEAL)
        } else {
            value_style()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<name_width$}", file.name.as_str()), style),
            Span::styled(
                format!(" {:>9}", format_file_size(file.size)),
                Style::default().fg(COLOR_INFO),
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel_block(PanelKind::Files)), area);
}

fn render_preview_panel(area: Rect, frame: &mut ratatui::Frame<'_>, engine: &Engine) {
    let block = panel_block(PanelKind::Preview);
    let inner = block.inner(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    frame.render_widget(block, area);

    let viewport = Viewport::new(f64::from(rows[0].width) * 2.0, f64::from(rows[0].height) * 4.0);
    let preview = engine.preview(viewport);
    let height = viewport.height;
    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, viewport.width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            ctx.draw(&Circle {
                x: preview.center.0,
                y: height - preview.center.1,
                radius: preview.radius,
                color: COLOR_INFO,
            });
            for ((x1, y1), (x2, y2)) in preview.segments() {
                ctx.draw(&CanvasLine {
                    x1,
                    y1: height - y1,
                    x2,
                    y2: height - y2,
                    color: COLOR_SAND,
                });
            }
        });
    frame.render_widget(canvas, rows[0]);

    let estimate = format_duration(engine.estimate());
    let footer = Line::from(vec![
        Span::styled("Progress ", label_style()),
        Span::styled(format!("{:.0}%", engine.progress()), value_style()),
        Span::styled("  Estimate ", label_style()),
        Span::styled(estimate, value_style()),
    ]);
    frame.render_widget(Paragraph::new(footer), rows[1]);
}

fn render_history_panel(area: Rect, frame: &mut ratatui::Frame<'_>, engine: &Engine) {
    let entries = engine.history().entries();
    let mut lines = Vec::new();
    if entries.is_empty() {
        lines.push(Line::from(Span::styled(
            "nothing played yet",
            Style::default().fg(COLOR_INFO),
        )));
    }
    for entry in entries.iter().take(usize::from(area.height.saturating_sub(2))) {
        lines.push(Line::from(vec![
            Span::styled(format_timestamp(entry.played_at()), label_style()),
            Span::raw("  "),
            Span::styled(entry.file_name().to_string(), value_style()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(panel_block(PanelKind::History)), area);
}

fn render_prompt(area: Rect, frame: &mut ratatui::Frame<'_>, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    for (text, style) in state.alerts.iter() {
        lines.push(Line::from(Span::styled(text.clone(), *style)));
    }
    for (text, style) in &state.prompt.output {
        lines.push(Line::from(Span::styled(text.clone(), *style)));
    }
    let output_height = area.height.saturating_sub(1);
    let output_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: output_height,
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), output_area);

    let prompt_area = Rect {
        x: area.x,
        y: area.y + output_height,
        width: area.width,
        height: 1,
    };
    if let Some(confirm) = state.pending_confirm.as_ref() {
        let question = Line::from(Span::styled(
            confirm.question(),
            Style::default().fg(COLOR_AMBER).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(
            Paragraph::new(question).style(Style::default().bg(COLOR_PROMPT_BG)),
            prompt_area,
        );
        return;
    }
    if state.prompt.active {
        let prompt = Line::from(vec![
            Span::styled("> ", Style::default().fg(COLOR_TEAL).add_modifier(Modifier::BOLD)),
            Span::raw(state.prompt.input.clone()),
        ]);
        frame.render_widget(
            Paragraph::new(prompt).style(Style::default().bg(COLOR_PROMPT_BG)),
            prompt_area,
        );
        let cursor = u16::try_from(state.prompt.cursor).unwrap_or(u16::MAX);
        frame.set_cursor_position((prompt_area.x.saturating_add(2).saturating_add(cursor), prompt_area.y));
    } else {
        let hint = Line::from(Span::styled(
            "Press / to type a command, ? for help",
            Style::default()
                .fg(COLOR_INFO)
                .add_modifier(Modifier::DIM)
                .bg(COLOR_PROMPT_BG),
        ));
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().bg(COLOR_PROMPT_BG)),
            prompt_area,
        );
    }
}

fn panel_block(kind: PanelKind) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {} ", kind.title()),
            Style::default().fg(COLOR_YELLOW).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(COLOR_INFO))
}

fn label_style() -> Style {
    Style::default().fg(COLOR_CYAN)
}

fn header_style() -> Style {
    Style::default().fg(COLOR_YELLOW).add_modifier(Modifier::BOLD)
}

fn value_style() -> Style {
    Style::default().fg(Color::White)
}

fn label_value_line(label: &str, value: &str, width: usize, value_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<width$}"), label_style()),
        Span::raw(" "),
        Span::styled(value.to_string(), value_style),
    ])
}

fn advance_panel_page(state: &mut UiState) {
    let len = state.layout.len().max(1);
    state.panel_page = (state.panel_page + 1) % len;
}

fn status_chip(state: ConnectionState) -> (String, Style) {
    let (bg, fg) = match state {
        ConnectionState::Doodling => (COLOR_TEAL, Color::White),
        ConnectionState::Paused => (COLOR_AMBER, Color::Black),
        ConnectionState::Idle => (COLOR_GREEN, Color::Black),
        ConnectionState::Offline => (Color::DarkGray, Color::White),
    };
    (
        format!("[{}]", state.as_str().to_ascii_uppercase()),
        Style::default().bg(bg).fg(fg).add_modifier(Modifier::BOLD),
    )
}

fn push_alert(state: &mut UiState, text: String, style: Style) {
    if state.alerts.len() >= MAX_ALERTS {
        state.alerts.pop_front();
    }
    state.alerts.push_back((text, style));
}
