//! JSON files written through a temp file and a rename.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::{MonitorError, Result};

/// Missing or blank files read as `T::default()`.
pub(crate) async fn read_json<T>(path: &Path, what: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| MonitorError::io(format!("read {}", what), err))?;
    if data.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&data).map_err(|err| MonitorError::parse(what, err))
}

pub(crate) async fn write_json<T>(path: &Path, value: &T, what: &str) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| MonitorError::io(format!("create {} dir", what), err))?;
        }
    }
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| MonitorError::parse(format!("{} payload", what), err))?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, payload)
        .await
        .map_err(|err| MonitorError::io(format!("write {}", what), err))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|err| MonitorError::io(format!("finalize {}", what), err))
}
