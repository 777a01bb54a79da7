//! Reading and writing property files.
//!
//! Two layouts are accepted on read: a JSON document of nested maps and the
//! older flat `key=value` listing. Writes always produce JSON.

use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde_json::Value;

use super::PropertyStore;
use super::interrupt::WriteGuard;
use crate::error::StoreError;

pub const CONFIG_HEADER: &str = "# Tungsten configuration properties";

static FLAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w.]+)(?:\[([\w.]+)\])?\s*=\s*(.*)$").expect("flat property pattern is valid")
});

impl PropertyStore {
    /// Load a property file. A missing file yields an empty store.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_properties(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the store as JSON under the standard header.
    ///
    /// The file is replaced atomically. An interrupt that arrives while the
    /// write is in progress is held until the file is in place and then
    /// reported as [`StoreError::Interrupted`].
    pub fn store(&self, path: &Path) -> anyhow::Result<()> {
        let guard = WriteGuard::begin();
        let written = self.write_atomically(path);
        if guard.finish() {
            return Err(StoreError::Interrupted(path.to_path_buf()).into());
        }
        written?;
        tracing::debug!(path = %path.display(), "stored configuration");
        Ok(())
    }

    fn write_atomically(&self, path: &Path) -> anyhow::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        temp.write_all(self.to_file_string()?.as_bytes())
            .context("Failed to write config contents")?;
        temp.persist(path)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn to_file_string(&self) -> anyhow::Result<String> {
        let date = chrono::Local::now().to_rfc2822();
        Ok(format!(
            "{CONFIG_HEADER}\n# Date: {date}\n{}\n",
            to_json_string(self)?
        ))
    }
}

/// Parse either file layout. Lines beginning with `#` are ignored.
pub fn parse_properties(content: &str) -> anyhow::Result<PropertyStore> {
    let body: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect();

    let first = body.iter().map(|l| l.trim()).find(|l| !l.is_empty());
    match first {
        None => Ok(PropertyStore::new()),
        Some(line) if line.starts_with('{') => parse_json(&body.join("\n")),
        Some(_) => Ok(parse_flat(&body)),
    }
}

fn parse_json(text: &str) -> anyhow::Result<PropertyStore> {
    let value: Value = serde_json::from_str(text).context("Invalid JSON configuration")?;
    let Value::Object(map) = value else {
        anyhow::bail!("Configuration document must be a JSON object");
    };
    let mut store = PropertyStore::new();
    for (key, child) in map {
        import_json(&mut store, &key, child);
    }
    Ok(store)
}

fn import_json(store: &mut PropertyStore, path: &str, value: Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                import_json(store, &super::join_path(path, &key), child);
            }
        }
        Value::String(s) => store.set(path, Some(&s)),
        Value::Null => {}
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().map(scalar_text).collect();
            store.set(path, Some(&joined.join(",")));
        }
        other => store.set(path, Some(&scalar_text(&other))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_flat(lines: &[&str]) -> PropertyStore {
    let mut store = PropertyStore::new();
    for line in lines {
        let Some(caps) = FLAT_LINE.captures(line.trim()) else {
            continue;
        };
        let mut key = caps[1].to_string();
        if let Some(sub) = caps.get(2) {
            key = super::join_path(&key, sub.as_str());
        }
        let value = caps[3].trim();
        store.set(&key, Some(value));
    }
    store
}

pub fn to_json_string(store: &PropertyStore) -> anyhow::Result<String> {
    serde_json::to_string_pretty(store).context("Failed to serialize configuration")
}

/// Sorted `key=value` listing of every leaf.
pub fn to_flat_string(store: &PropertyStore) -> String {
    store
        .leaf_paths()
        .into_iter()
        .map(|path| format!("{}={}\n", path, store.get(&path).unwrap_or_default()))
        .collect()
}
