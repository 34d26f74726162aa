use anyhow::Context;
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SAVED_SYSTEM_PROMPT_KEY: &str = "savedSystemPrompt";

pub struct PromptStore {
    path: PathBuf,
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("super-prompt").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> anyhow::Result<Map<String, Value>> {
        if !self.path.exists() {
            debug!("No prompt store at {}", self.path.display());
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed prompt store {}", self.path.display()))
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn load(&self) -> anyhow::Result<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(SAVED_SYSTEM_PROMPT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn save(&self, system_prompt: &str) -> anyhow::Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(
            SAVED_SYSTEM_PROMPT_KEY.to_string(),
            Value::String(system_prompt.to_string()),
        );
        self.write_entries(&entries)?;
        info!("Saved system prompt to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<bool> {
        let mut entries = self.read_entries()?;
        let removed = entries.remove(SAVED_SYSTEM_PROMPT_KEY).is_some();
        if removed {
            self.write_entries(&entries)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = PromptStore::new(temp_dir.path().join("storage.json"));
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_save_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = PromptStore::new(temp_dir.path().join("nested/storage.json"));

        store.save("You are helpful.").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("You are helpful."));

        store.save("Be brief.").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("Be brief."));

        assert!(store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_preserves_other_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = PromptStore::new(&path);
        store.save("Sys").unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[SAVED_SYSTEM_PROMPT_KEY], "Sys");
    }

    #[test]
    fn test_malformed_store_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        assert!(PromptStore::new(&path).load().is_err());
    }
}
