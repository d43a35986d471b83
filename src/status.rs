use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{MonitorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Enabled,
    Disabled,
}

impl MonitorStatus {
    /// Only the exact word `enabled` turns the monitor on.
    pub fn parse(value: &str) -> Self {
        if value.trim() == "enabled" {
            MonitorStatus::Enabled
        } else {
            MonitorStatus::Disabled
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Enabled => "enabled",
            MonitorStatus::Disabled => "disabled",
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, MonitorStatus::Enabled)
    }

    pub fn toggled(self) -> Self {
        match self {
            MonitorStatus::Enabled => MonitorStatus::Disabled,
            MonitorStatus::Disabled => MonitorStatus::Enabled,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single persisted on/off flag shared by the scheduled run and every
/// control surface.
pub trait StatusStore: Send + Sync {
    fn get(&self) -> Result<MonitorStatus>;
    fn set(&self, status: MonitorStatus) -> Result<()>;

    fn toggle(&self) -> Result<MonitorStatus> {
        let next = self.get()?.toggled();
        self.set(next)?;
        Ok(next)
    }
}

pub struct FileStatusStore {
    path: PathBuf,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusStore for FileStatusStore {
    fn get(&self) -> Result<MonitorStatus> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(MonitorStatus::parse(&contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(MonitorStatus::Disabled),
            Err(err) => Err(MonitorError::io("read status file", err)),
        }
    }

    fn set(&self, status: MonitorStatus) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| MonitorError::io("create status dir", err))?;
            }
        }
        let tmp_path = self.path.with_extension("status.tmp");
        std::fs::write(&tmp_path, status.as_str())
            .map_err(|err| MonitorError::io("write status file", err))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|err| MonitorError::io("finalize status file", err))?;
        tracing::info!(status = %status, path = %self.path.display(), "monitor status updated");
        Ok(())
    }
}

/// Process-local store, handy for tests and dry runs.
#[derive(Debug)]
pub struct MemoryStatusStore {
    status: Mutex<MonitorStatus>,
}

impl MemoryStatusStore {
    pub fn new(status: MonitorStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self) -> Result<MonitorStatus> {
        Ok(*self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn set(&self, status: MonitorStatus) -> Result<()> {
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
        Ok(())
    }
}

/// Flag operations shared by the CLI, the chat bot and the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Enable,
    Disable,
    Toggle,
    Status,
}

impl ControlCommand {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "on" | "enable" | "start" => Some(ControlCommand::Enable),
            "off" | "disable" | "stop" => Some(ControlCommand::Disable),
            "toggle" => Some(ControlCommand::Toggle),
            "status" => Some(ControlCommand::Status),
            _ => None,
        }
    }

    /// Applies the command and returns the status now in effect.
    pub fn apply(self, store: &dyn StatusStore) -> Result<MonitorStatus> {
        match self {
            ControlCommand::Enable => {
                store.set(MonitorStatus::Enabled)?;
                Ok(MonitorStatus::Enabled)
            }
            ControlCommand::Disable => {
                store.set(MonitorStatus::Disabled)?;
                Ok(MonitorStatus::Disabled)
            }
            ControlCommand::Toggle => store.toggle(),
            ControlCommand::Status => store.get(),
        }
    }
}
