mod common;

use std::time::Duration;

use common::{connected_engine, file_list_json, status_json, ScriptedDevice, SETTLE};
use insta::assert_snapshot;
use sandbot::command::MotionCommand;
use sandbot::device::Method;
use sandbot::network::{NetworkConfig, WifiMode};
use sandbot::preview::Viewport;
use sandbot::{NoticeLevel, SandbotError};
use serde_json::json;

fn ok() -> serde_json::Value {
    json!({ "rslt": "ok" })
}

#[test]
fn play_pause_pauses_a_drawing_robot_and_refreshes_later() {
    let device = ScriptedDevice::online(status_json(3, false, "2.31.4"), &[]);
    device.respond("/exec/pause", ok());
    let (mut engine, clock) = connected_engine(&device);
    engine.load_local_pattern("spiral.thr", "0 0\n1 1\n");

    assert_eq!(engine.play_pause().unwrap(), MotionCommand::Pause);
    assert_eq!(device.count("/exec/pause"), 1);

    clock.advance(Duration::from_millis(400));
    engine.pump();
    assert_eq!(device.count("/status"), 1);

    clock.advance(Duration::from_millis(100));
    assert!(engine.settle(SETTLE));
    assert_eq!(device.count("/status"), 2);

    let notices = engine.take_notices();
    assert!(notices
        .iter()
        .any(|notice| notice.level == NoticeLevel::Info && notice.text == "sent pause"));
}

#[test]
fn paused_robot_resumes() {
    let device = ScriptedDevice::online(status_json(4, true, "2.31.4"), &[]);
    device.respond("/exec/resume", ok());
    let (mut engine, _clock) = connected_engine(&device);
    engine.load_local_pattern("spiral.thr", "0 0\n1 1\n");
    assert_eq!(engine.play_pause().unwrap(), MotionCommand::Resume);
    assert_eq!(device.count("/exec/resume"), 1);
}

#[test]
fn play_needs_a_pattern_reference() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[("a.thr", 10)]);
    device.respond("/exec/play", ok());
    device.respond("/playFile/sd/a.thr", ok());
    let (mut engine, _clock) = connected_engine(&device);

    let err = engine.play_pause().unwrap_err();
    assert_eq!(err, SandbotError::Precondition("no pattern loaded".into()));
    assert_eq!(device.count("/exec/play"), 0);
    assert!(engine
        .take_notices()
        .iter()
        .any(|notice| notice.level == NoticeLevel::Error));

    engine.play_file("a.thr").unwrap();
    assert_eq!(engine.played_file(), Some("a.thr"));
    assert_eq!(engine.play_pause().unwrap(), MotionCommand::Play);
    assert_eq!(device.count("/exec/play"), 1);
}

#[test]
fn queued_robot_still_needs_a_pattern_reference() {
    let device = ScriptedDevice::online(status_json(3, false, "2.31.4"), &[("a.thr", 10)]);
    device.respond("/exec/pause", ok());
    device.respond_text("/files/sd/a.thr", "0 0\n1 1\n");
    let (mut engine, _clock) = connected_engine(&device);

    assert!(!engine.pattern_loaded());
    let err = engine.play_pause().unwrap_err();
    assert_eq!(err, SandbotError::Precondition("no pattern loaded".into()));
    assert_eq!(device.count("/exec/pause"), 0);

    engine.preview_file("a.thr").unwrap();
    assert_eq!(engine.play_pause().unwrap(), MotionCommand::Pause);
    assert_eq!(device.count("/exec/pause"), 1);
}

#[test]
fn offline_robot_refuses_direct_commands() {
    let device = ScriptedDevice::new();
    device.fail("/status", SandbotError::Transport("unreachable".into()));
    let (mut engine, _clock) = connected_engine(&device);

    let err = engine.stop().unwrap_err();
    assert!(matches!(err, SandbotError::Precondition(_)));
    assert!(err.to_string().contains("offline"));
    assert!(device.paths().iter().all(|path| !path.starts_with("/exec/")));
}

#[test]
fn rejected_command_schedules_no_refresh() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[]);
    let (mut engine, clock) = connected_engine(&device);

    let err = engine.home().unwrap_err();
    assert_eq!(
        err,
        SandbotError::DeviceRejected {
            action: "home".into(),
            reason: "HTTP 404".into(),
        }
    );
    assert_eq!(device.count("/exec/G28"), 1);

    clock.advance(Duration::from_secs(1));
    engine.pump();
    assert_eq!(device.count("/status"), 1);
    let notices = engine.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[test]
fn set_home_sends_encoded_gcode() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[]);
    device.respond("/exec/G92%20X0%20Y0", ok());
    let (mut engine, _clock) = connected_engine(&device);
    engine.set_home().unwrap();
    assert_eq!(device.count("/exec/G92%20X0%20Y0"), 1);
}

#[test]
fn played_files_land_in_history_newest_first() {
    let device = ScriptedDevice::online(
        status_json(0, false, "2.31.4"),
        &[("a.thr", 10), ("my spiral.thr", 20)],
    );
    device.respond("/playFile/sd/a.thr", ok());
    device.respond("/playFile/sd/my%20spiral.thr", ok());
    let (mut engine, _clock) = connected_engine(&device);

    engine.play_file("a.thr").unwrap();
    engine.play_file("my spiral.thr").unwrap();
    let names = engine
        .history()
        .entries()
        .iter()
        .map(|entry| entry.file_name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["my spiral.thr", "a.thr"]);
    assert_ne!(
        engine.history().entries()[0].id(),
        engine.history().entries()[1].id()
    );
}

#[test]
fn failed_play_is_not_recorded() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[]);
    let (mut engine, _clock) = connected_engine(&device);
    assert!(engine.play_file("missing.thr").is_err());
    assert!(engine.history().is_empty());
    assert_eq!(engine.played_file(), None);
}

#[test]
fn delete_refreshes_listing_and_drops_matching_preview() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[("a.thr", 10)]);
    device.respond_text("/files/sd/a.thr", "0 0\n1.5 0.5\n");
    device.respond("/deleteFile/sd/a.thr", ok());
    let (mut engine, _clock) = connected_engine(&device);

    engine.preview_file("a.thr").unwrap();
    assert!(engine.loaded_pattern().is_some());

    device.respond("/filelist/", file_list_json(&[]));
    engine.delete_file("a.thr").unwrap();
    assert!(engine.loaded_pattern().is_none());
    assert!(engine.settle(SETTLE));
    assert_eq!(device.count("/filelist/"), 2);
    assert!(engine
        .session()
        .files()
        .is_some_and(|files| files.files.is_empty()));
}

#[test]
fn delete_reports_device_result_code() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[("a.thr", 10)]);
    device.respond("/deleteFile/sd/a.thr", json!({ "rslt": "fail" }));
    let (mut engine, _clock) = connected_engine(&device);
    let err = engine.delete_file("a.thr").unwrap_err();
    assert_snapshot!(err.to_string(), @"delete rejected by device: fail");
}

#[test]
fn preview_follows_progress() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[("s.thr", 10)]);
    device.respond_text("/files/sd/s.thr", "0 0\n0 1\n3.14159 1\n6.28318 0.5\n");
    let (mut engine, _clock) = connected_engine(&device);

    let loaded = engine.preview_file("s.thr").unwrap();
    assert_eq!(loaded.pattern.len(), 4);
    assert_eq!(engine.progress(), 100.0);
    let full = engine.preview(Viewport::new(200.0, 200.0));
    assert_eq!(full.polyline.len(), 4);

    engine.set_progress(50.0);
    let half = engine.preview(Viewport::new(200.0, 200.0));
    assert_eq!(half.polyline.len(), 2);

    engine.set_progress(250.0);
    assert_eq!(engine.progress(), 100.0);
    assert!(engine.estimate().is_some_and(|seconds| seconds > 0.0));
}

#[test]
fn save_pattern_uploads_under_its_name() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[]);
    device.respond_text("/uploadtofileman", "");
    let (mut engine, _clock) = connected_engine(&device);

    assert!(matches!(
        engine.save_pattern(),
        Err(SandbotError::Precondition(_))
    ));
    engine.load_local_pattern("local.thr", "0 0\n1 1\n");
    engine.save_pattern().unwrap();
    let upload = device
        .requests()
        .into_iter()
        .find(|req| req.method == Method::Post)
        .and_then(|req| req.upload)
        .unwrap();
    assert_eq!(upload.0, "local.thr");
    assert_eq!(upload.1.lines().count(), 2);
}

#[test]
fn playlist_uploads_history_oldest_first() {
    let device = ScriptedDevice::online(status_json(0, false, "2.31.4"), &[]);
    device.respond("/playFile/sd/a.thr", ok());
    device.respond("/playFile/sd/b.thr", ok());
    device.respond_text("/uploadtofileman", "");
    let (mut engine, _clock) = connected_engine(&device);

    assert!(matches!(
        engine.save_playlist("evening"),
        Err(SandbotError::Precondition(_))
    ));
    engine.play_file("a.thr").unwrap();
    engine.play_file("b.thr").unwrap();
    engine.play_file("a.thr").unwrap();
    assert!(matches!(
        engine.save_playlist("  "),
        Err(SandbotError::Precondition(_))
    ));

    assert_eq!(engine.save_playlist("evening").unwrap(), "evening.seq");
    let upload = device
        .requests()
        .into_iter()
        .find_map(|req| req.upload)
        .unwrap();
    assert_eq!(upload.0, "evening.seq");
    assert_eq!(upload.1, "a.thr\nb.thr\na.thr");
}

#[test]
fn network_config_needs_recent_firmware() {
    let device = ScriptedDevice::online(status_json(0, false, "2.29.9"), &[]);
    let (mut engine, _clock) = connected_engine(&device);
    let err = engine.fetch_network_config().unwrap_err();
    assert!(err.to_string().contains("2.30.0"));
    assert!(device.paths().iter().all(|path| !path.contains(".network")));
}

#[test]
fn network_config_round_trip() {
    let device = ScriptedDevice::online(status_json(0, false, "2.30.0"), &[]);
    let (mut engine, _clock) = connected_engine(&device);

    let fetched = engine.fetch_network_config().unwrap();
    assert!(!fetched.exists);
    assert_eq!(fetched.config, NetworkConfig::default());

    device.respond_text(
        "/files/sd/.network",
        r#"{"wifi":"yes","WiFiSSID":"home","WiFiPW":"secret","WiFiHostname":"sandbot"}"#,
    );
    let fetched = engine.fetch_network_config().unwrap();
    assert!(fetched.exists);
    assert_eq!(fetched.config.ssid, "home");
    assert_eq!(fetched.config.mode, WifiMode::Station);

    device.respond_text("/uploadtofileman", "");
    let ap = NetworkConfig {
        mode: WifiMode::AccessPoint,
        ..NetworkConfig::default()
    };
    engine.save_network_config(&ap).unwrap();
    let upload = device
        .requests()
        .into_iter()
        .find_map(|req| req.upload)
        .unwrap();
    assert_eq!(upload.0, ".network");
    assert_eq!(upload.1, r#"{"wifi":"ap"}"#);

    device.respond("/deleteFile/sd/.network", ok());
    engine.delete_network_config().unwrap();
    assert_eq!(device.count("/deleteFile/sd/.network"), 1);
}
