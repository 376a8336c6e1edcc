//! Purpose: Keep a bounded, most-recent-first log of network exchanges.
//! Exports: `ActivityLog`, `ActivityRecord`, `DEFAULT_ACTIVITY_CAPACITY`.
//! Role: Observability only; nothing reads it to make decisions.
//! Invariants: Never grows past its capacity; the newest record is first.
//! Invariants: Recording cannot fail; formatting problems degrade to placeholders.
use std::collections::VecDeque;
use std::time::SystemTime;

use serde_json::{Map, Value, json};

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub time: String,
    pub title: String,
    pub body: String,
}

impl ActivityRecord {
    pub fn new(title: impl Into<String>, body: &Value) -> Self {
        let body = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
        Self {
            time: time_now().unwrap_or_else(|| "-".to_string()),
            title: title.into(),
            body,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("time".to_string(), json!(self.time));
        inner.insert("title".to_string(), json!(self.title));
        inner.insert("body".to_string(), json!(self.body));
        Value::Object(inner)
    }
}

impl std::fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}\n{}\n", self.time, self.title, self.body)
    }
}

#[derive(Clone, Debug)]
pub struct ActivityLog {
    records: VecDeque<ActivityRecord>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_ACTIVITY_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, record: ActivityRecord) {
        if self.capacity == 0 {
            return;
        }
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    pub fn records(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&ActivityRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

fn time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}
