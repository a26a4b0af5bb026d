// Per-session parameter memory.
//
// Dialogflow sometimes drops an output context between turns (lifespans run
// out, the user wanders off to another intent and back). We keep the last
// non-blank value of every booking parameter per session so later turns can
// still find them. This lives only in process memory.

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `""` and `[]` never overwrite a stored value. `null` is handled separately:
/// it removes the key.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Map<String, Value>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything stored for the session.
    pub fn reset(&self, session: &str) {
        self.sessions.remove(session);
    }

    /// Merges `params` into the session and returns the result.
    pub fn merge(&self, session: &str, params: &Map<String, Value>) -> Map<String, Value> {
        let mut entry = self.sessions.entry(session.to_string()).or_default();
        for (key, value) in params {
            if value.is_null() {
                entry.remove(key);
            } else if !is_blank(value) {
                entry.insert(key.clone(), value.clone());
            }
        }
        entry.value().clone()
    }

    pub fn get(&self, session: &str) -> Map<String, Value> {
        self.sessions
            .get(session)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Every session, sorted by id. Only exposed through the debug endpoint.
    pub fn snapshot(&self) -> BTreeMap<String, Map<String, Value>> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
