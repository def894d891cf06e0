use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::task::{Priority, Task};

pub const THEME_KEY: &str = "deadline_theme_v1";

pub fn tasks_key(category: &str) -> String {
    format!("deadline_tasks_{category}_v1")
}

pub fn title_history_key(category: &str) -> String {
    format!("deadline_title_history_{category}_v1")
}

/// Synchronous string key-value storage. Reads never fail: anything that
/// cannot be read is reported as absent.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Option<String>;

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls seen so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug)]
pub struct DirStore {
    pub data_dir: PathBuf,
}

impl DirStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened key-value directory");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", file_stem(key)))
    }
}

impl KeyValueStore for DirStore {
    #[tracing::instrument(skip(self))]
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "unreadable entry treated as absent");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "saving entry atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

fn file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string(tasks).context("failed to encode tasks")
}

pub fn encode_history(entries: &[String]) -> anyhow::Result<String> {
    serde_json::to_string(entries).context("failed to encode title history")
}

/// Parses a stored task collection. Never fails: malformed input yields an
/// empty collection and unusable records are dropped.
#[tracing::instrument(skip(raw))]
pub fn decode_tasks(raw: Option<&str>) -> Vec<Task> {
    let Some(items) = parse_array(raw, "tasks") else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            warn!(index = idx, "dropping non-object task record");
            continue;
        };

        let (Some(id), Some(title), Some(due_date)) = (
            scalar_field(fields.get("id")),
            scalar_field(fields.get("title")),
            scalar_field(fields.get("dueDate")),
        ) else {
            warn!(index = idx, "dropping task record with a structured id, title or due date");
            continue;
        };
        let id = id.unwrap_or_else(|| {
            debug!(index = idx, "task record without id; assigning a fresh one");
            Uuid::new_v4().to_string()
        });
        let title = title.unwrap_or_default();
        let due_date = due_date.unwrap_or_default();

        if title.is_empty() || due_date.is_empty() {
            warn!(index = idx, id = %id, "dropping task record with empty title or due date");
            continue;
        }

        let priority = Priority::from_stored(fields.get("priority").and_then(Value::as_str));
        let done = fields.get("done").map(truthy).unwrap_or(false);

        out.push(Task {
            id,
            title,
            due_date,
            priority,
            done,
        });
    }

    debug!(count = out.len(), "decoded tasks");
    out
}

#[tracing::instrument(skip(raw))]
pub fn decode_history(raw: Option<&str>) -> Vec<String> {
    let Some(items) = parse_array(raw, "title history") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(coerce_scalar)
        .filter(|title| !title.is_empty())
        .collect()
}

fn parse_array(raw: Option<&str>, what: &str) -> Option<Vec<Value>> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Some(items),
        Ok(_) => {
            warn!(what, "stored value is not an array; treating as empty");
            None
        }
        Err(err) => {
            warn!(what, error = %err, "failed parsing stored value; treating as empty");
            None
        }
    }
}

/// Outer `None` marks a shape violation (array or object); inner `None` is a
/// missing or null field.
fn scalar_field(value: Option<&Value>) -> Option<Option<String>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::Array(_) | Value::Object(_)) => None,
        Some(scalar) => Some(coerce_scalar(scalar)),
    }
}

fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn keys_are_namespaced_by_category() {
        assert_eq!(tasks_key("dcard"), "deadline_tasks_dcard_v1");
        assert_eq!(title_history_key("dcard"), "deadline_title_history_dcard_v1");
        assert_ne!(tasks_key("a"), tasks_key("b"));
    }

    #[test]
    fn corrupt_or_non_array_tasks_decode_to_empty() {
        assert!(decode_tasks(None).is_empty());
        assert!(decode_tasks(Some("")).is_empty());
        assert!(decode_tasks(Some("{not json")).is_empty());
        assert!(decode_tasks(Some(r#"{"id":"x"}"#)).is_empty());
        assert!(decode_tasks(Some("42")).is_empty());
    }

    #[test]
    fn decode_drops_and_normalizes_records() {
        let raw = r#"[
            {"id":"a","title":"Keep","dueDate":"2025-01-02","priority":"high","done":true},
            {"id":"b","title":"","dueDate":"2025-01-02"},
            {"id":"c","title":"No date"},
            {"id":"d","title":"Odd priority","dueDate":"2025-01-03","priority":"urgent"},
            {"id":7,"title":"Numeric id","dueDate":"2025-01-04","done":1},
            {"title":"No id","dueDate":"2025-01-05"},
            "not an object",
            null
        ]"#;
        let tasks = decode_tasks(Some(raw));
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Keep", "Odd priority", "Numeric id", "No id"]);

        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[0].done);
        assert_eq!(tasks[1].priority, Priority::Medium);
        assert!(!tasks[1].done);
        assert_eq!(tasks[2].id, "7");
        assert!(tasks[2].done);
        assert!(!tasks[3].id.is_empty());
    }

    #[test]
    fn decode_drops_records_with_structured_fields() {
        let raw = r#"[
            {"id":{"a":1},"title":"Object id","dueDate":"2025-01-01"},
            {"id":"x","title":["t"],"dueDate":"2025-01-01"},
            {"id":"y","title":"Array due","dueDate":["2025-01-01"]},
            {"id":"z","title":"Plain","dueDate":"2025-01-01"}
        ]"#;
        let tasks = decode_tasks(Some(raw));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "z");
    }

    #[test]
    fn non_iso_due_dates_are_kept_and_compared_as_text() {
        let raw = r#"[
            {"id":"a","title":"Slashed","dueDate":"2025/1/5"},
            {"id":"b","title":"Iso","dueDate":"2025-01-05"}
        ]"#;
        let tasks = decode_tasks(Some(raw));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].due_date, "2025/1/5");

        // '/' sorts after '-', so the slashed date orders last and is not
        // overdue against an ISO "today" sharing the "2025" prefix.
        let board = crate::view::classify(&tasks, "2025-06-01");
        let ids: Vec<&str> = board.pending.iter().map(|r| r.task.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(board.pending[0].overdue);
        assert!(!board.pending[1].overdue);

        let board = crate::view::classify(&tasks, "2026-01-01");
        assert!(board.pending.iter().all(|row| row.overdue));
        assert_eq!(board.counts.overdue, 2);
    }

    #[test]
    fn decode_history_keeps_scalars_only() {
        let raw = r#"["Buy milk", "", 12, null, {"x":1}, ["y"], "Walk dog"]"#;
        assert_eq!(
            decode_history(Some(raw)),
            vec!["Buy milk".to_string(), "12".to_string(), "Walk dog".to_string()]
        );
        assert!(decode_history(Some("\"text\"")).is_empty());
        assert!(decode_history(Some("[")).is_empty());
    }

    #[test]
    fn encoded_tasks_round_trip() {
        let tasks = vec![
            Task {
                id: "1".into(),
                title: "One".into(),
                due_date: "2025-03-01".into(),
                priority: Priority::Low,
                done: true,
            },
            Task {
                id: "2".into(),
                title: "Two".into(),
                due_date: "2025-03-02".into(),
                priority: Priority::High,
                done: false,
            },
        ];
        let raw = encode_tasks(&tasks).expect("encode");
        assert_eq!(decode_tasks(Some(&raw)), tasks);
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load("k"), None);
        store.save("k", "v").expect("save");
        assert_eq!(store.load("k").as_deref(), Some("v"));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn dir_store_round_trips_and_reports_missing_as_absent() {
        let temp = tempdir().expect("tempdir");
        let mut store = DirStore::open(&temp.path().join("data")).expect("open");

        assert_eq!(store.load("deadline_tasks_dcard_v1"), None);
        store.save("deadline_tasks_dcard_v1", "[]").expect("save");
        store.save("deadline_tasks_dcard_v1", "[1]").expect("overwrite");
        assert_eq!(store.load("deadline_tasks_dcard_v1").as_deref(), Some("[1]"));
    }

    #[test]
    fn dir_store_escapes_unsafe_key_characters() {
        let temp = tempdir().expect("tempdir");
        let store = DirStore::open(temp.path()).expect("open");
        let path = store.path_for("deadline_tasks_../x_v1");
        assert_eq!(path.parent(), Some(temp.path()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("deadline_tasks_%2E%2E%2Fx_v1.json")
        );
    }
}
