use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    Compact,
    Pretty,
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

/// Overwrite `path` with `value`, creating missing parent directories.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T, style: JsonStyle) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes = match style {
        JsonStyle::Compact => serde_json::to_vec(value),
        JsonStyle::Pretty => serde_json::to_vec_pretty(value),
    }
    .context("failed to serialize JSON")?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn creates_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("out.json");
        write_json_file(&path, &json!([{"id": 1}]), JsonStyle::Pretty)?;
        let back: Value = read_json_file(&path)?;
        assert_eq!(back, json!([{"id": 1}]));
        Ok(())
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = read_json_file::<Value>(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
