//! `sandbot` - session engine and console for polar sand-table robots.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Scheduling clocks for the poll timer.
pub mod clock;
/// Motion command resolution and enablement.
pub mod command;
/// Session configuration and URL query round-trips.
pub mod config;
/// HTTP device client.
pub mod device;
/// Engine driver tying the session to the device link.
pub mod engine;
/// Engine errors.
pub mod error;
/// Device file listings.
pub mod files;
/// Play history ("gallery") ledger.
pub mod ledger;
/// Network (`.network`) configuration file.
pub mod network;
/// Pattern parsing and draw-time estimation.
pub mod pattern;
/// Progressive pattern preview geometry.
pub mod preview;
/// Connection session state machine.
pub mod session;
/// Robot geometry settings.
pub mod settings;
/// Device status snapshot and derived connection state.
pub mod status;
/// Terminal UI for monitoring and control.
pub mod ui;

pub use engine::{Engine, Notice, NoticeLevel};
pub use error::SandbotError;
pub use session::{Session, SessionAction};
pub use status::{ConnectionState, DeviceStatus};
