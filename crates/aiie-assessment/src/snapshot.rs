//! 会话快照与持久化
//!
//! 会话在每次状态变更后保存快照，进程重启后可据此恢复作答。
//! 存储后端是可替换的：内存实现用于测试，文件实现用于本地持久化。
//! 多个调用方同时写同一会话时以最后一次写入为准，不做合并或加锁。

use aiie_core::{AiieError, CaseAnswer, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// 会话快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub assessment_id: String,
    /// 按病例顺序排列的 (病例ID, 作答)
    pub answers: Vec<(String, CaseAnswer)>,
    pub current_case_index: usize,
    pub time_remaining_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 快照存储接口
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()>;
    fn load(&self, key: &str) -> Result<Option<SessionSnapshot>>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// 读取快照，读取失败视为没有可用备份
pub fn load_or_none(store: &dyn SnapshotStore, key: &str) -> Option<SessionSnapshot> {
    match store.load(key) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Failed to load snapshot {}: {}", key, e);
            None
        }
    }
}

/// 内存快照存储
///
/// 以序列化后的 JSON 保存，保证读写经过完整的编解码。
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let json = snapshot.to_json()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AiieError::Storage("snapshot store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionSnapshot>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AiieError::Storage("snapshot store lock poisoned".to_string()))?;
        entries
            .get(key)
            .map(|json| SessionSnapshot::from_json(json))
            .transpose()
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AiieError::Storage("snapshot store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// 文件快照存储，每个会话一个 JSON 文件
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    base_path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.base_path)?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, snapshot.to_json()?)?;
        std::fs::rename(&tmp_path, &path)?;

        debug!("Snapshot {} written to {}", key, path.display());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(json) => Ok(Some(SessionSnapshot::from_json(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            assessment_id: "neuro-101".to_string(),
            answers: vec![
                (
                    "case-1".to_string(),
                    CaseAnswer {
                        selected_imaging_ids: vec!["mri".to_string(), "ct".to_string()],
                        flagged: true,
                        time_spent_seconds: 50,
                    },
                ),
                ("case-2".to_string(), CaseAnswer::default()),
            ],
            current_case_index: 1,
            time_remaining_seconds: 1234,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_json_schema() {
        let json = sample_snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["assessmentId"], "neuro-101");
        assert_eq!(value["currentCaseIndex"], 1);
        assert_eq!(value["timeRemainingSeconds"], 1234);
        assert_eq!(value["answers"][0][0], "case-1");
        assert_eq!(value["answers"][0][1]["timeSpentSeconds"], 50);
        assert_eq!(value["answers"][0][1]["flagged"], true);
    }

    #[test]
    fn test_in_memory_round_trip() {
        let store = InMemorySnapshotStore::new();
        let snapshot = sample_snapshot();

        assert!(store.load("neuro-101").unwrap().is_none());
        store.save("neuro-101", &snapshot).unwrap();
        assert_eq!(store.load("neuro-101").unwrap(), Some(snapshot));

        store.remove("neuro-101").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshots"));
        let snapshot = sample_snapshot();

        store.save("assessment/neuro 101", &snapshot).unwrap();
        assert_eq!(store.load("assessment/neuro 101").unwrap(), Some(snapshot));

        store.remove("assessment/neuro 101").unwrap();
        assert!(store.load("assessment/neuro 101").unwrap().is_none());
        store.remove("assessment/neuro 101").unwrap();
    }

    #[test]
    fn test_corrupt_file_is_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        assert!(store.load("broken").is_err());
        assert!(load_or_none(&store, "broken").is_none());
    }
}
