#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sandbot::clock::ManualClock;
use sandbot::config::SessionConfig;
use sandbot::device::{DeviceReply, DeviceRequest, DeviceTransport, Method};
use sandbot::{Engine, SandbotError};
use serde_json::{json, Value};

pub const HOST: &str = "sandbot.local";
pub const SETTLE: Duration = Duration::from_secs(5);

/// One request as the scripted device saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub host: String,
    pub method: Method,
    pub path: String,
    pub upload: Option<(String, String)>,
}

/// In-memory robot answering from a per-path script.
///
/// Unscripted paths answer `HTTP 404`.
#[derive(Default)]
pub struct ScriptedDevice {
    routes: Mutex<HashMap<String, Result<DeviceReply, SandbotError>>>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Robot that polls fine, reports `status` and has the given files.
    pub fn online(status: Value, files: &[(&str, u64)]) -> Arc<Self> {
        let device = Self::new();
        device.respond("/status", status);
        device.respond("/getsettings", settings_json(190.0, 200.0));
        device.respond("/filelist/", file_list_json(files));
        device
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.respond_text(path, body.to_string());
    }

    pub fn respond_text(&self, path: &str, body: impl Into<String>) {
        self.routes
            .lock()
            .expect("routes lock poisoned")
            .insert(path.to_string(), Ok(DeviceReply::ok(body)));
    }

    pub fn fail(&self, path: &str, err: SandbotError) {
        self.routes
            .lock()
            .expect("routes lock poisoned")
            .insert(path.to_string(), Err(err));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().expect("log lock poisoned").clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|req| req.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.paths().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn clear_log(&self) {
        self.log.lock().expect("log lock poisoned").clear();
    }
}

impl DeviceTransport for ScriptedDevice {
    fn request(&self, host: &str, request: &DeviceRequest) -> Result<DeviceReply, SandbotError> {
        self.log.lock().expect("log lock poisoned").push(Recorded {
            host: host.to_string(),
            method: request.method,
            path: request.path.clone(),
            upload: request.upload.as_ref().map(|upload| {
                (
                    upload.file_name.to_string(),
                    String::from_utf8_lossy(&upload.content).into_owned(),
                )
            }),
        });
        let key = if request.upload.is_some() {
            format!("POST {}", request.path)
        } else {
            request.path.clone()
        };
        let routes = self.routes.lock().expect("routes lock poisoned");
        match routes.get(&key).or_else(|| routes.get(&request.path)) {
            Some(reply) => reply.clone(),
            None => Err(SandbotError::DeviceRejected {
                action: request.action.clone(),
                reason: "HTTP 404".into(),
            }),
        }
    }
}

pub fn status_json(queue_depth: u32, paused: bool, firmware: &str) -> Value {
    json!({
        "XYZ": [10.5, -3.25, 0.0],
        "Qd": queue_depth,
        "pause": u8::from(paused),
        "Hmd": 1,
        "espV": firmware,
        "wifiIP": "192.168.1.40",
        "ssid": "workshop",
        "MAC": "24:6f:28:aa:bb:cc",
        "tod": "12:30:00",
    })
}

pub fn settings_json(max_val: f64, max_speed: f64) -> Value {
    json!({
        "robotConfig": {
            "robotType": "SandTableScara",
            "robotGeom": {
                "axis0": { "maxSpeed": max_speed, "maxVal": max_val },
                "axis1": { "maxSpeed": max_speed, "maxVal": max_val },
            }
        }
    })
}

pub fn file_list_json(files: &[(&str, u64)]) -> Value {
    let files = files
        .iter()
        .map(|(name, size)| json!({ "name": name, "size": size }))
        .collect::<Vec<_>>();
    json!({ "rslt": "ok", "fsName": "sd", "files": files })
}

pub fn config(host: &str) -> SessionConfig {
    SessionConfig {
        host: host.to_string(),
        ..SessionConfig::default()
    }
}

/// Engine on a manual clock, already past its first poll and bootstrap.
pub fn connected_engine(device: &Arc<ScriptedDevice>) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let mut engine = Engine::new(
        Arc::clone(device) as Arc<dyn DeviceTransport>,
        Arc::clone(&clock) as Arc<dyn sandbot::clock::Clock>,
        config(HOST),
    )
    .expect("engine");
    assert!(engine.settle(SETTLE), "engine did not settle");
    (engine, clock)
}
