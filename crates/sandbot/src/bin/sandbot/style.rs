//! Colored output helpers.

use std::io::IsTerminal;

use owo_colors::OwoColorize;
use sandbot::ConnectionState;

fn should_color() -> bool {
    std::io::stdout().is_terminal()
}

fn paint(text: impl AsRef<str>, colorize: impl Fn(&str) -> String) -> String {
    let text = text.as_ref();
    if should_color() {
        colorize(text)
    } else {
        text.to_string()
    }
}

pub fn success(text: impl AsRef<str>) -> String {
    paint(text, |text| text.green().to_string())
}

pub fn warning(text: impl AsRef<str>) -> String {
    paint(text, |text| text.yellow().to_string())
}

pub fn error(text: impl AsRef<str>) -> String {
    paint(text, |text| text.red().to_string())
}

pub fn accent(text: impl AsRef<str>) -> String {
    paint(text, |text| text.cyan().to_string())
}

pub fn dim(text: impl AsRef<str>) -> String {
    paint(text, |text| text.dimmed().to_string())
}

/// Connection state colored the way the terminal UI shows it.
pub fn connection(state: ConnectionState) -> String {
    match state {
        ConnectionState::Offline => error(state.as_str()),
        ConnectionState::Idle => accent(state.as_str()),
        ConnectionState::Doodling => success(state.as_str()),
        ConnectionState::Paused => warning(state.as_str()),
    }
}
