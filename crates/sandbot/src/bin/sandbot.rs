//! CLI entrypoint for the sand-table console.

#[path = "sandbot/cli.rs"]
mod cli;
#[path = "sandbot/ctl.rs"]
mod ctl;
#[path = "sandbot/prompt.rs"]
mod prompt;
#[path = "sandbot/style.rs"]
mod style;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    if let Err(err) = run() {
        let message = format_error_with_tip(&err);
        eprintln!("{}", style::error(format!("Error: {message}")));
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let raw_args: Vec<String> = std::env::args().collect();
    let cli = match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(err) => {
            if err.kind() == ErrorKind::InvalidSubcommand {
                if let Some(input) = raw_args.get(1) {
                    if let Some(suggestion) = suggest_subcommand(input) {
                        eprintln!("Did you mean: {suggestion}?");
                    }
                }
            }
            err.exit();
        }
    };
    init_tracing(cli.verbose, matches!(cli.command, None | Some(Command::Ui { .. })));
    if let Some(Command::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "sandbot", &mut std::io::stdout());
        return Ok(());
    }
    let config = ctl::resolve_config(&cli.target)?;
    match cli.command {
        None => ctl::run_ui(config, 250),
        Some(Command::Ui { refresh }) => ctl::run_ui(config, refresh),
        Some(Command::Status) => ctl::run_status(config),
        Some(Command::PlayPause { file }) => ctl::run_play_pause(config, file.as_deref()),
        Some(Command::Stop) => ctl::run_stop(config),
        Some(Command::Home) => ctl::run_home(config),
        Some(Command::SetHome) => ctl::run_set_home(config),
        Some(Command::Files { search }) => ctl::run_files(config, search),
        Some(Command::Play { file }) => ctl::run_play(config, &file),
        Some(Command::Delete { file, yes }) => ctl::run_delete(config, &file, yes),
        Some(Command::Upload { path, force }) => ctl::run_upload(config, &path, force),
        Some(Command::Preview {
            path,
            remote,
            progress,
            width,
            height,
            output,
        }) => ctl::run_preview(
            config,
            ctl::PreviewOptions {
                path,
                remote,
                progress,
                width,
                height,
                output,
            },
        ),
        Some(Command::Estimate { path }) => ctl::run_estimate(config, &path),
        Some(Command::Playlist { name, files }) => ctl::run_playlist(config, &name, &files),
        Some(Command::Network { action }) => ctl::run_network(config, action),
        Some(Command::ConfigUrl) => {
            ctl::run_config_url(&config);
            Ok(())
        }
        Some(Command::Completions { .. }) => Ok(()),
    }
}

/// Log to stderr. The terminal UI owns the screen; offline warnings show up
/// there as alerts instead.
fn init_tracing(verbose: bool, interactive: bool) {
    let level = if interactive {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn suggest_subcommand(input: &str) -> Option<&'static str> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let candidates = [
        "ui",
        "status",
        "play-pause",
        "stop",
        "home",
        "set-home",
        "files",
        "play",
        "delete",
        "upload",
        "preview",
        "estimate",
        "playlist",
        "network",
        "config-url",
        "completions",
    ];
    let mut best = None;
    let mut best_score = usize::MAX;
    for candidate in candidates {
        let score = levenshtein(input, candidate);
        if score < best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    if best_score <= 2 {
        best
    } else {
        None
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars = b.chars().collect::<Vec<_>>();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }
    prev[b_chars.len()]
}

fn format_error_with_tip(err: &anyhow::Error) -> String {
    let message = err.to_string();
    let tip = if message.contains("no robot address configured") {
        Some("Tip: pass --host <address>, set SANDBOT_HOST, or add host to sandbot.toml.")
    } else if message.contains("is offline") {
        Some("Tip: check the robot is powered and on the same network, then run `sandbot status`.")
    } else if message.contains("invalid config") {
        Some("Tip: check the [session] table in sandbot.toml and the --poll-cycle/--mode flags.")
    } else if message.contains("firmware 2.30.0") {
        Some("Tip: update the robot firmware to manage its network settings.")
    } else if message.contains("no pattern loaded") {
        Some("Tip: name the pattern with `sandbot play-pause --file <file>`.")
    } else {
        None
    };
    match tip {
        Some(tip) => format!("{message}\n{tip}"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_subcommands() {
        assert_eq!(suggest_subcommand("stauts"), Some("status"));
        assert_eq!(suggest_subcommand("hom"), Some("home"));
        assert_eq!(suggest_subcommand("frobnicate"), None);
        assert_eq!(suggest_subcommand(" "), None);
    }

    #[test]
    fn tips_follow_known_failures() {
        let err = anyhow::anyhow!("robot sandbot.local is offline: transport error 'timed out'");
        assert!(format_error_with_tip(&err).contains("sandbot status"));
        let err = anyhow::anyhow!("something else");
        assert_eq!(format_error_with_tip(&err), "something else");
    }

    #[test]
    fn play_pause_takes_an_optional_pattern_reference() {
        let cli = Cli::try_parse_from(["sandbot", "play-pause", "--file", "spiral.thr"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::PlayPause { file: Some(ref file) }) if file == "spiral.thr"
        ));
        let err = anyhow::anyhow!("no pattern loaded");
        assert!(format_error_with_tip(&err).contains("--file"));
    }

    #[test]
    fn cli_parses_global_target_after_subcommand() {
        let cli = Cli::try_parse_from(["sandbot", "play", "spiral.thr", "--host", "10.0.0.9"])
            .unwrap();
        assert_eq!(cli.target.host.as_deref(), Some("10.0.0.9"));
        assert!(matches!(cli.command, Some(Command::Play { ref file }) if file == "spiral.thr"));
    }
}
