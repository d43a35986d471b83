use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::report::RunSummary;
use crate::storage::{read_json, write_json};
use crate::Result;

/// Newest-first JSON log of assembled run reports.
pub struct RunHistoryStore {
    path: PathBuf,
    limit: usize,
    runs: Mutex<Vec<RunSummary>>,
}

impl RunHistoryStore {
    pub async fn load(path: PathBuf, limit: usize) -> Result<Self> {
        let runs = read_json(&path, "run history").await?;
        Ok(Self {
            path,
            limit: limit.max(1),
            runs: Mutex::new(runs),
        })
    }

    pub async fn list(&self) -> Vec<RunSummary> {
        let guard = self.runs.lock().await;
        guard.clone()
    }

    pub async fn get(&self, run_id: &str) -> Option<RunSummary> {
        let guard = self.runs.lock().await;
        guard.iter().find(|run| run.run_id == run_id).cloned()
    }

    pub async fn add(&self, run: RunSummary) -> Result<()> {
        let mut guard = self.runs.lock().await;
        guard.insert(0, run);
        if guard.len() > self.limit {
            guard.truncate(self.limit);
        }
        write_json(&self.path, guard.as_slice(), "run history").await
    }
}
