use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// Context for sharing data between tasks in a graph execution.
///
/// Cloning is cheap and every clone sees the same entries, which is how
/// fan-out children observe what upstream tasks wrote.
#[derive(Clone, Debug)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.set_sync(key, value)
    }

    pub fn set_sync(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| GraphError::ContextError(format!("failed to serialize '{key}': {e}")))?;
        self.data.insert(key, value);
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    pub fn get_sync<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Like [`Context::get_sync`] but distinguishes a missing key from a value of the wrong shape.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .data
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GraphError::ContextError(format!("'{key}' not found in context")))?;
        serde_json::from_value(value)
            .map_err(|e| GraphError::ContextError(format!("'{key}' has unexpected shape: {e}")))
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.remove_sync(key)
    }

    pub fn remove_sync(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub async fn clear(&self) {
        self.data.clear();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_entries() {
        let context = Context::new();
        let other = context.clone();

        context.set("count", 3u32).await.unwrap();

        assert_eq!(other.get::<u32>("count").await, Some(3));
        assert!(other.remove("count").await.is_some());
        assert!(!context.contains_key("count"));
    }

    #[test]
    fn require_reports_missing_and_mistyped_keys() {
        let context = Context::new();
        context.set_sync("name", "protocol").unwrap();

        let missing = context.require::<String>("absent").unwrap_err();
        assert!(missing.to_string().contains("'absent' not found"));

        let mistyped = context.require::<u64>("name").unwrap_err();
        assert!(mistyped.to_string().contains("unexpected shape"));

        assert_eq!(context.require::<String>("name").unwrap(), "protocol");
    }
}
