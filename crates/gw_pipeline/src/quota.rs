use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use gw_core::{Error, Result};

/// One calendar day's worth of commentary-generation spend, persisted as
/// a small JSON document so the cap survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub day: String,
    pub count: u32,
}

/// Day-keyed usage counter. Days are keyed in UTC so a server's local
/// timezone cannot produce a surprise extra day of spend.
pub struct QuotaTracker {
    path: PathBuf,
    // serializes the read-modify-write; the pipeline lock already keeps
    // summarize stages from overlapping, this covers same-process callers
    lock: Mutex<()>,
}

fn today_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

impl QuotaTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current day's state. A stored state from a previous day is reset
    /// to zero and persisted before returning.
    pub fn state(&self) -> Result<QuotaState> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.state_locked()
    }

    pub fn can_consume(&self, cap: u32) -> Result<bool> {
        Ok(self.state()?.count < cap)
    }

    /// Consume one unit and return the new count. Re-reads state first so
    /// a day rollover mid-batch starts a fresh counter.
    pub fn record_use(&self) -> Result<u32> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.state_locked()?;
        state.count += 1;
        self.save(&state)?;
        Ok(state.count)
    }

    fn state_locked(&self) -> Result<QuotaState> {
        let today = today_key();
        match self.load()? {
            Some(state) if state.day == today => Ok(state),
            Some(stale) => {
                info!(from = %stale.day, to = %today, "quota day rolled over, resetting");
                let fresh = QuotaState {
                    day: today,
                    count: 0,
                };
                self.save(&fresh)?;
                Ok(fresh)
            }
            None => Ok(QuotaState {
                day: today,
                count: 0,
            }),
        }
    }

    fn load(&self) -> Result<Option<QuotaState>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            // a missing file is a fresh day; anything else is surfaced to
            // the caller, never treated as zero spend
            Err(e) => return Err(Error::Io(e)),
        };
        let state: QuotaState = serde_json::from_str(&raw).map_err(|e| {
            Error::Storage(format!(
                "corrupt quota state at {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(state))
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
