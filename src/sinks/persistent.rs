//! Persistent sink: append-only JSONL event log, one file per day, mirroring
//! the teacher's `tax/json_logger.rs` rotation scheme.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use tracing::error;

use super::events::EngineEvent;

pub struct PersistentSink {
    base_dir: PathBuf,
    file: Mutex<Option<(String, std::fs::File)>>,
}

impl PersistentSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), file: Mutex::new(None) }
    }

    pub async fn consume(&self, event: &EngineEvent) {
        if let Err(e) = self.append(event) {
            error!("persistent sink: failed to append event: {}", e);
        }
    }

    fn append(&self, event: &EngineEvent) -> Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let line = serde_json::to_string(event)?;

        let mut guard = self.file.lock().unwrap();
        let needs_new = match &*guard {
            Some((date, _)) => date != &today,
            None => true,
        };
        if needs_new {
            std::fs::create_dir_all(&self.base_dir)?;
            let path = self.path_for(&today);
            let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            *guard = Some((today.clone(), file));
        }
        if let Some((_, file)) = guard.as_mut() {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    fn path_for(&self, date: &str) -> PathBuf {
        self.base_dir.join(format!("events_{date}.jsonl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("arb_sentinel_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn consume_appends_a_jsonl_line() {
        let dir = temp_dir("persistent_sink");
        let sink = PersistentSink::new(dir.clone());
        sink.consume(&EngineEvent::Spread { block_height: 1, route: "r".into(), gross_usd: 1.0, net_usd: 1.0 }).await;

        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let content = fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert!(content.contains("\"kind\":\"spread\""));

        let _ = fs::remove_dir_all(&dir);
    }
}
