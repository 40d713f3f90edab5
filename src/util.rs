use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize JSON")?;
    fs::write(path, json.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parse JSON {}", path.display()))?;
    Ok(value)
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_string(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_helpers_round_trip_through_nested_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out").join("value.json");
        let value = BTreeMap::from([("claims".to_string(), 3u32)]);
        write_json(&path, &value).expect("write json");
        let loaded: BTreeMap<String, u32> = read_json(&path).expect("read json");
        assert_eq!(loaded, value);
    }

    #[test]
    fn read_json_names_the_file_on_parse_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "[1,").expect("write broken");
        let err = read_json::<Vec<u32>>(&path).expect_err("parse failure");
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("diagnosis-drug mismatch", 10), "diagnos...");
    }
}
