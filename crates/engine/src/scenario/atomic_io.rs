use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::types::ScenarioError;

/// Serializes `value` as pretty JSON and replaces `path` with it via a
/// sibling temp file, so readers never observe a half-written document.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), ScenarioError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|source| ScenarioError::Encode { what, source })?;
    text.push('\n');
    write_text_atomic(path, &text).map_err(|source| ScenarioError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text.as_bytes())?;
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("scenario.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn writes_into_missing_directories_and_replaces_existing() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("out").join("report.json");

        write_json_atomic(&path, "report", &json!({ "ticks": 1 })).expect("first write");
        write_json_atomic(&path, "report", &json!({ "ticks": 2 })).expect("second write");

        let raw = fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["ticks"], 2);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn temp_path_sits_next_to_target() {
        let tmp = temp_path_for(Path::new("/var/data/elevator.json"));
        assert_eq!(tmp, PathBuf::from("/var/data/elevator.json.tmp"));
    }
}
