//! HTTP device client.
//!
//! One request, one attempt: the client keeps no state between calls and
//! never retries. Scheduling and retry policy belong to the session.

#![allow(missing_docs)]

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use smol_str::SmolStr;
use tracing::debug;

use crate::command::MotionCommand;
use crate::error::SandbotError;

/// Transport timeout for every device request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Form field the file manager expects uploads in.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File carried by an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: SmolStr,
    pub content: Vec<u8>,
}

/// One request against the robot's HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub method: Method,
    pub path: String,
    pub upload: Option<Upload>,
    /// Human name of the action, used in rejection messages.
    pub action: SmolStr,
}

impl DeviceRequest {
    fn get(path: String, action: impl Into<SmolStr>) -> Self {
        Self {
            method: Method::Get,
            path,
            upload: None,
            action: action.into(),
        }
    }

    #[must_use]
    pub fn status() -> Self {
        Self::get("/status".into(), "status")
    }

    #[must_use]
    pub fn settings() -> Self {
        Self::get("/getsettings".into(), "settings")
    }

    #[must_use]
    pub fn file_list() -> Self {
        Self::get("/filelist/".into(), "list files")
    }

    #[must_use]
    pub fn delete_file(fs: &str, name: &str) -> Self {
        Self::get(format!("/deleteFile/{}", file_path(fs, name)), "delete")
    }

    #[must_use]
    pub fn play_file(fs: &str, name: &str) -> Self {
        Self::get(format!("/playFile/{}", file_path(fs, name)), "play")
    }

    #[must_use]
    pub fn file_content(fs: &str, name: &str) -> Self {
        Self::get(format!("/files/{}", file_path(fs, name)), "fetch file")
    }

    #[must_use]
    pub fn exec(command: MotionCommand) -> Self {
        Self::get(
            format!("/exec/{}", urlencoding::encode(command.exec_command())),
            command.label(),
        )
    }

    #[must_use]
    pub fn upload(file_name: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            path: "/uploadtofileman".into(),
            upload: Some(Upload {
                file_name: file_name.into(),
                content: content.into(),
            }),
            action: "upload".into(),
        }
    }
}

fn file_path(fs: &str, name: &str) -> String {
    format!("{}/{}", urlencoding::encode(fs), urlencoding::encode(name))
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReply {
    pub status: u16,
    pub body: String,
}

impl DeviceReply {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, SandbotError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Something that can carry a [`DeviceRequest`] to a robot.
///
/// Non-2xx answers are [`SandbotError::DeviceRejected`]; anything that never
/// produced an answer is [`SandbotError::Transport`].
pub trait DeviceTransport: Send + Sync + 'static {
    fn request(&self, host: &str, request: &DeviceRequest) -> Result<DeviceReply, SandbotError>;
}

/// `http://host` unless the host already names a scheme.
#[must_use]
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Encode a single-file `multipart/form-data` body.
#[must_use]
pub fn multipart_body(boundary: &str, upload: &Upload) -> Vec<u8> {
    let mut body = Vec::with_capacity(upload.content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{UPLOAD_FIELD}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            upload.file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(&upload.content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn multipart_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    format!("----sandbot{nanos:x}")
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpDevice {
    agent: ureq::Agent,
}

impl HttpDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTransport for HttpDevice {
    fn request(&self, host: &str, request: &DeviceRequest) -> Result<DeviceReply, SandbotError> {
        if host.trim().is_empty() {
            return Err(SandbotError::Precondition("no robot address configured".into()));
        }
        let url = format!("{}{}", base_url(host), request.path);
        debug!("{} {url}", request.method);
        let result = match (&request.method, &request.upload) {
            (Method::Post, Some(upload)) => {
                let boundary = multipart_boundary();
                self.agent
                    .post(&url)
                    .set(
                        "Content-Type",
                        &format!("multipart/form-data; boundary={boundary}"),
                    )
                    .send_bytes(&multipart_body(&boundary, upload))
            }
            (Method::Post, None) => self.agent.post(&url).call(),
            (Method::Get, _) => self.agent.get(&url).call(),
        };
        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|err| SandbotError::Transport(err.to_string().into()))?;
                Ok(DeviceReply { status, body })
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                let body = body.trim();
                let reason = if body.is_empty() || body.len() > 120 {
                    format!("HTTP {code}")
                } else {
                    format!("HTTP {code}: {body}")
                };
                Err(SandbotError::DeviceRejected {
                    action: request.action.clone(),
                    reason: reason.into(),
                })
            }
            Err(err) => Err(SandbotError::Transport(err.to_string().into())),
        }
    }
}
