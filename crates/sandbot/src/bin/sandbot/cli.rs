//! CLI definitions for sandbot.

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sandbot",
    version,
    about = "Console for polar sand-table robots",
    infer_subcommands = true,
    arg_required_else_help = false,
    after_help = "Examples:\n  sandbot --host sandbot.local            # terminal UI\n  sandbot status --host 192.168.1.40\n  sandbot play spiral.thr\n  sandbot preview ./spiral.thr --progress 40 > spiral.svg"
)]
pub struct Cli {
    /// Show verbose details.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Session settings shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Robot address (host name or IP). Falls back to SANDBOT_HOST.
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Seconds between status polls.
    #[arg(long, global = true)]
    pub poll_cycle: Option<u64>,
    /// Embedded control interface (disabled, wled, legacy, cnc).
    #[arg(long, global = true)]
    pub mode: Option<String>,
    /// wLED address when it differs from the robot.
    #[arg(long, global = true)]
    pub wled_address: Option<String>,
    /// Session URL or query string (hostIP=..&pollCycle=..).
    #[arg(long, global = true)]
    pub url: Option<String>,
    /// Config file (defaults to ./sandbot.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive TUI for monitoring and control.
    Ui {
        /// UI refresh interval in milliseconds.
        #[arg(long, default_value = "250")]
        refresh: u64,
    },
    /// Print the robot status once.
    Status,
    /// Play, pause or resume depending on the robot state.
    ///
    /// The console must hold a pattern reference first; `--file` loads one.
    PlayPause {
        /// Robot file to load as the current pattern.
        #[arg(long)]
        file: Option<String>,
    },
    /// Stop the current pattern.
    Stop,
    /// Home the robot (G28).
    Home,
    /// Declare the current position as home (G92 X0 Y0).
    SetHome,
    /// List files on the robot.
    Files {
        /// Case-insensitive name filter.
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Play a file stored on the robot.
    Play {
        /// File name on the robot.
        file: String,
    },
    /// Delete a file stored on the robot.
    Delete {
        /// File name on the robot.
        file: String,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y', action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Upload a pattern (.thr) or playlist (.seq) file.
    Upload {
        /// Local file path.
        path: PathBuf,
        /// Upload files the robot cannot play.
        #[arg(long)]
        force: bool,
    },
    /// Render a pattern preview as SVG.
    #[command(
        after_help = "Examples:\n  sandbot preview ./spiral.thr\n  sandbot preview --remote spiral.thr --progress 25 --output spiral.svg"
    )]
    Preview {
        /// Local pattern file.
        #[arg(required_unless_present = "remote", conflicts_with = "remote")]
        path: Option<PathBuf>,
        /// Pattern file stored on the robot.
        #[arg(long)]
        remote: Option<String>,
        /// Percentage of the pattern to draw.
        #[arg(long, default_value = "100")]
        progress: f64,
        /// Drawing width in pixels.
        #[arg(long, default_value = "400")]
        width: f64,
        /// Drawing height in pixels.
        #[arg(long, default_value = "400")]
        height: f64,
        /// Write the SVG here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Estimate the drawing time of a local pattern file.
    Estimate {
        /// Local pattern file.
        path: PathBuf,
    },
    /// Upload a playlist (.seq) of robot files, in play order.
    Playlist {
        /// Playlist name (.seq is appended when missing).
        name: String,
        /// File names on the robot.
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Show or edit the robot network configuration.
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
    /// Print the session as a URL query string.
    ConfigUrl,
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum NetworkAction {
    /// Show the stored network configuration.
    Show,
    /// Write the network configuration.
    Set {
        /// Run the robot's own access point instead of joining a network.
        #[arg(long, action = ArgAction::SetTrue)]
        ap: bool,
        /// Network to join.
        #[arg(long, required_unless_present = "ap")]
        ssid: Option<String>,
        /// Network password (prompted when omitted).
        #[arg(long)]
        password: Option<String>,
        /// Host name the robot announces.
        #[arg(long)]
        hostname: Option<String>,
    },
    /// Delete the network configuration.
    Delete {
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y', action = ArgAction::SetTrue)]
        yes: bool,
    },
}
