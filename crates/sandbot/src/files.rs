//! Device file listings.

#![allow(missing_docs)]

use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::SandbotError;

/// File system used when the listing has not been fetched yet.
pub const DEFAULT_FS: &str = "sd";

/// One entry of `/filelist/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileDescriptor {
    pub name: SmolStr,
    #[serde(default)]
    pub size: u64,
}

/// Visible files of one device file system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    pub fs_name: SmolStr,
    pub files: Vec<FileDescriptor>,
}

#[derive(Debug, Deserialize)]
struct FileListJson {
    rslt: Option<String>,
    #[serde(rename = "fsName", default)]
    fs_name: String,
    #[serde(default)]
    files: Vec<FileDescriptor>,
}

impl FileListing {
    /// Parse a `/filelist/` body, dropping dotfiles.
    pub fn from_json(value: &Value) -> Result<Self, SandbotError> {
        let raw = FileListJson::deserialize(value)?;
        if raw.rslt.as_deref() != Some("ok") {
            return Err(SandbotError::DeviceRejected {
                action: "list files".into(),
                reason: raw.rslt.unwrap_or_else(|| "unknown error".to_string()).into(),
            });
        }
        Ok(Self {
            fs_name: raw.fs_name.into(),
            files: raw
                .files
                .into_iter()
                .filter(|file| !file.name.starts_with('.'))
                .collect(),
        })
    }

    /// File system name to address files with.
    #[must_use]
    pub fn fs(&self) -> &str {
        if self.fs_name.is_empty() {
            DEFAULT_FS
        } else {
            self.fs_name.as_str()
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|file| file.name.as_str() == name)
    }
}

/// Case-insensitive substring search, sorted by name.
#[must_use]
pub fn filter_files<'a>(files: &'a [FileDescriptor], search: &str) -> Vec<&'a FileDescriptor> {
    let needle = search.to_lowercase();
    let mut matches = files
        .iter()
        .filter(|file| file.name.to_lowercase().contains(&needle))
        .collect::<Vec<_>>();
    matches.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    matches
}

/// Check the `rslt` field of a device mutation reply.
pub fn check_result(action: &str, value: &Value) -> Result<(), SandbotError> {
    match value.get("rslt").and_then(Value::as_str) {
        Some("ok") => Ok(()),
        Some(other) => Err(SandbotError::DeviceRejected {
            action: action.into(),
            reason: other.into(),
        }),
        None => Err(SandbotError::DeviceRejected {
            action: action.into(),
            reason: "unknown error".into(),
        }),
    }
}

/// Human-readable size (`512 B`, `1.5 KB`, `2.0 MB`).
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Pattern and playlist files the device can play.
#[must_use]
pub fn is_playable(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".thr") || lower.ends_with(".seq")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_drops_dotfiles() {
        let listing = FileListing::from_json(&json!({
            "rslt": "ok",
            "fsName": "sd",
            "files": [
                { "name": ".network", "size": 80 },
                { "name": "spiral.thr", "size": 2048 },
                { "name": "night.seq", "size": 30 }
            ]
        }))
        .unwrap();
        assert_eq!(listing.fs(), "sd");
        let names = listing
            .files
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["spiral.thr", "night.seq"]);
    }

    #[test]
    fn listing_failure_carries_device_reason() {
        let err = FileListing::from_json(&json!({ "rslt": "fail", "files": [] })).unwrap_err();
        assert_eq!(
            err,
            SandbotError::DeviceRejected {
                action: "list files".into(),
                reason: "fail".into()
            }
        );
    }

    #[test]
    fn search_is_case_insensitive_and_sorted() {
        let files = ["Zeta.thr", "alpha.thr", "beta.seq", "ALPHA2.thr"]
            .into_iter()
            .map(|name| FileDescriptor {
                name: name.into(),
                size: 1,
            })
            .collect::<Vec<_>>();
        let found = filter_files(&files, "alp")
            .into_iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(found, vec!["alpha.thr", "ALPHA2.thr"]);
        assert_eq!(filter_files(&files, "").len(), 4);
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
    }
}
