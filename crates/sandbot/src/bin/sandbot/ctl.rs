//! One-shot robot commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sandbot::clock::StdClock;
use sandbot::config::{ControlMode, SessionConfig};
use sandbot::device::{HttpDevice, REQUEST_TIMEOUT};
use sandbot::files::{filter_files, format_file_size, is_playable};
use sandbot::ledger::{playlist_content, playlist_file_name};
use sandbot::network::{NetworkConfig, WifiMode};
use sandbot::pattern::{format_duration, path_length};
use sandbot::preview::Viewport;
use sandbot::{Engine, NoticeLevel};
use smol_str::SmolStr;

use crate::cli::{NetworkAction, TargetArgs};
use crate::{prompt, style};

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sandbot.toml";
/// Environment fallback for the robot address.
pub const HOST_ENV: &str = "SANDBOT_HOST";

/// Merge config sources: config file, then `--url`, then `SANDBOT_HOST`
/// for a still-empty host, then explicit flags.
pub fn resolve_config(target: &TargetArgs) -> anyhow::Result<SessionConfig> {
    let mut config = match &target.config {
        Some(path) => SessionConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            SessionConfig::load(DEFAULT_CONFIG_FILE)?
        }
        None => SessionConfig::default(),
    };
    if let Some(url) = &target.url {
        config.apply_query(url);
    }
    if config.host.trim().is_empty() {
        if let Ok(host) = std::env::var(HOST_ENV) {
            config.host = host.trim().to_string();
        }
    }
    if let Some(host) = &target.host {
        config.host = host.trim().to_string();
    }
    if let Some(cycle) = target.poll_cycle {
        if cycle == 0 {
            anyhow::bail!("invalid config '--poll-cycle must be greater than zero'");
        }
        config.poll_cycle_secs = cycle;
    }
    if let Some(mode) = &target.mode {
        config.mode = ControlMode::parse(mode)?;
    }
    if let Some(address) = &target.wled_address {
        config.secondary_address = address.trim().to_string();
    }
    Ok(config)
}

/// Engine over HTTP without contacting the robot yet.
pub fn open_engine(config: SessionConfig) -> anyhow::Result<Engine> {
    let engine = Engine::new(
        Arc::new(HttpDevice::new()),
        Arc::new(StdClock::new()),
        config,
    )?;
    Ok(engine)
}

/// Open an engine and wait for the first poll and its bootstrap fetches.
pub fn connect(config: SessionConfig) -> anyhow::Result<Engine> {
    if config.host.trim().is_empty() {
        anyhow::bail!("no robot address configured");
    }
    let host = config.host.clone();
    let mut engine = open_engine(config)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Connecting to {host}..."));
    let settled = engine.settle(REQUEST_TIMEOUT + Duration::from_secs(1));
    spinner.finish_and_clear();
    if !settled {
        tracing::warn!("robot {host} did not answer in time");
    }
    Ok(engine)
}

/// Like [`connect`], failing when the robot stayed offline.
fn connect_online(config: SessionConfig) -> anyhow::Result<Engine> {
    let engine = connect(config)?;
    if !engine.connection_state().is_connected() {
        let host = engine.session().identity().to_string();
        match engine.session().last_error() {
            Some(err) => anyhow::bail!("robot {host} is offline: {err}"),
            None => anyhow::bail!("robot {host} is offline"),
        }
    }
    Ok(engine)
}

/// Print queued success and info notices; failures surface as errors.
fn print_notices(engine: &mut Engine) {
    for notice in engine.take_notices() {
        match notice.level {
            NoticeLevel::Success => println!("{}", style::success(&notice.text)),
            NoticeLevel::Info => println!("{}", notice.text),
            NoticeLevel::Error => {}
        }
    }
}

pub fn run_status(config: SessionConfig) -> anyhow::Result<()> {
    let mut engine = connect(config)?;
    let session = engine.session();
    println!(
        "{} {}",
        style::accent(session.identity()),
        style::connection(engine.connection_state())
    );
    if let Some(err) = session.last_error() {
        println!("{}", style::warning(format!("Last poll failed: {err}")));
    }
    let Some(status) = session.status() else {
        anyhow::bail!("robot {} is offline", session.identity());
    };
    for (label, value) in status.summary() {
        println!("{label:<10}{value}");
    }
    if let Some(files) = session.files() {
        println!("{:<10}{} on {}", "Files", files.files.len(), files.fs());
    }
    let geometry = session.geometry();
    println!(
        "{:<10}r={} speed={}",
        "Geometry",
        geometry.max_radius(),
        geometry.average_speed()
    );
    if let Some(url) = engine.config().interface_url() {
        println!("{:<10}{url}", engine.config().mode.title());
    }
    engine.dispose();
    Ok(())
}

pub fn run_play_pause(config: SessionConfig, file: Option<&str>) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    if let Some(file) = file {
        engine.preview_file(file)?;
    }
    engine.play_pause()?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_stop(config: SessionConfig) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    engine.stop()?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_home(config: SessionConfig) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    engine.home()?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_set_home(config: SessionConfig) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    engine.set_home()?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_files(config: SessionConfig, search: Option<String>) -> anyhow::Result<()> {
    let engine = connect_online(config)?;
    let Some(listing) = engine.session().files() else {
        anyhow::bail!("file list unavailable");
    };
    let matches = filter_files(&listing.files, search.as_deref().unwrap_or(""));
    if matches.is_empty() {
        println!("{}", style::dim("No files."));
        return Ok(());
    }
    let width = matches
        .iter()
        .map(|file| file.name.chars().count())
        .max()
        .unwrap_or(0);
    for file in &matches {
        let line = format!("{:<width$}  {:>9}", file.name, format_file_size(file.size));
        if is_playable(&file.name) {
            println!("{line}");
        } else {
            println!("{}", style::dim(line));
        }
    }
    println!("{} file(s) on {}", matches.len(), listing.fs());
    Ok(())
}

pub fn run_play(config: SessionConfig, file: &str) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    engine.play_file(file)?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_delete(config: SessionConfig, file: &str, yes: bool) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    if !yes && !prompt::prompt_yes_no(&format!("Delete {file} from the robot?"), false)? {
        println!("Cancelled.");
        return Ok(());
    }
    engine.delete_file(file)?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_upload(config: SessionConfig, path: &Path, force: bool) -> anyhow::Result<()> {
    let file_name = upload_file_name(path, force)?;
    let content = std::fs::read(path)?;
    let mut engine = connect_online(config)?;
    engine.upload(&file_name, content)?;
    print_notices(&mut engine);
    Ok(())
}

fn upload_file_name(path: &Path, force: bool) -> anyhow::Result<String> {
    let file_name = local_file_name(path)?;
    if !force && !is_playable(&file_name) {
        anyhow::bail!("{file_name} is not a .thr pattern or .seq playlist (pass --force to upload it anyway)");
    }
    Ok(file_name)
}

fn local_file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))
}

/// Options for the `preview` command.
pub struct PreviewOptions {
    pub path: Option<PathBuf>,
    pub remote: Option<String>,
    pub progress: f64,
    pub width: f64,
    pub height: f64,
    pub output: Option<PathBuf>,
}

pub fn run_preview(config: SessionConfig, options: PreviewOptions) -> anyhow::Result<()> {
    let mut engine = match (&options.remote, &options.path) {
        (Some(name), _) => {
            let mut engine = connect_online(config)?;
            engine.preview_file(name)?;
            engine
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            let mut engine = open_engine(SessionConfig::default())?;
            engine.load_local_pattern(&local_file_name(path)?, &text);
            engine
        }
        (None, None) => anyhow::bail!("a pattern path or --remote is required"),
    };
    engine.set_progress(options.progress);
    let svg = engine
        .preview(Viewport::new(options.width, options.height))
        .to_svg();
    match options.output {
        Some(path) => {
            std::fs::write(&path, svg)?;
            println!("{}", style::success(format!("Wrote {}", path.display())));
        }
        None => println!("{svg}"),
    }
    Ok(())
}

/// Estimate with the robot's geometry when an address is configured,
/// otherwise with the defaults.
pub fn run_estimate(config: SessionConfig, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let mut engine = if config.host.trim().is_empty() {
        open_engine(SessionConfig::default())?
    } else {
        connect(config)?
    };
    let name = local_file_name(path)?;
    let points = engine.load_local_pattern(&name, &text).pattern.len();
    let geometry = *engine.session().geometry();
    let length = engine
        .loaded_pattern()
        .map_or(0.0, |loaded| path_length(&loaded.pattern, &geometry));
    println!("{}", style::accent(&name));
    println!("{:<10}{points}", "Points");
    println!("{:<10}{length:.1}", "Length");
    println!("{:<10}{}", "Estimate", format_duration(engine.estimate()));
    engine.dispose();
    Ok(())
}

pub fn run_playlist(config: SessionConfig, name: &str, files: &[String]) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("playlist name is empty");
    }
    let mut engine = connect_online(config)?;
    if let Some(listing) = engine.session().files() {
        for file in files {
            if !listing.contains(file) {
                println!(
                    "{}",
                    style::warning(format!("Warning: {file} is not on the robot"))
                );
            }
        }
    }
    let names = files.iter().map(SmolStr::from).collect::<Vec<_>>();
    let file_name = playlist_file_name(name);
    engine.upload(&file_name, playlist_content(&names))?;
    print_notices(&mut engine);
    Ok(())
}

pub fn run_network(config: SessionConfig, action: NetworkAction) -> anyhow::Result<()> {
    let mut engine = connect_online(config)?;
    match action {
        NetworkAction::Show => {
            let fetched = engine.fetch_network_config()?;
            let network = fetched.config;
            println!("{:<10}{}", "WiFi", network.mode.as_str());
            if network.mode == WifiMode::Station {
                println!("{:<10}{}", "SSID", network.ssid);
                let masked = if network.password.is_empty() { "" } else { "********" };
                println!("{:<10}{masked}", "Password");
                println!("{:<10}{}", "Hostname", network.hostname);
            }
            if !fetched.exists {
                println!("{}", style::dim("No stored configuration; defaults shown."));
            }
        }
        NetworkAction::Set {
            ap,
            ssid,
            password,
            hostname,
        } => {
            let network = if ap {
                NetworkConfig {
                    mode: WifiMode::AccessPoint,
                    ..NetworkConfig::default()
                }
            } else {
                let password = match password {
                    Some(password) => password,
                    None => prompt::prompt_password("WiFi password")?,
                };
                NetworkConfig {
                    mode: WifiMode::Station,
                    ssid: ssid.unwrap_or_default(),
                    password,
                    hostname: hostname.unwrap_or_default(),
                }
            };
            engine.save_network_config(&network)?;
        }
        NetworkAction::Delete { yes } => {
            if !yes && !prompt::prompt_yes_no("Delete the robot network configuration?", false)? {
                println!("Cancelled.");
                return Ok(());
            }
            engine.delete_network_config()?;
        }
    }
    print_notices(&mut engine);
    Ok(())
}

pub fn run_config_url(config: &SessionConfig) {
    let query = config.to_query();
    if query.is_empty() {
        println!("{}", style::dim("(defaults)"));
    } else {
        println!("?{query}");
    }
    if let Some(url) = config.interface_url() {
        println!("{}: {url}", config.mode.title());
    }
}

pub fn run_ui(config: SessionConfig, refresh: u64) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    sandbot::ui::run_ui(engine, refresh)
}
