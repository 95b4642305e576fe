// Cache store for reading and writing JSON files.
// Files are pretty-printed and replaced atomically, never patched in place.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Result, ScanError};

/// Read a JSON file. A missing file is `Ok(None)`; one that reads but does not
/// decode (invalid UTF-8 included) is `ScanError::CorruptCache`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read(path)?;
    let value = serde_json::from_slice(&contents).map_err(|source| ScanError::CorruptCache {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

/// Write data as pretty JSON, replacing any existing file.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(data)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_write_and_read_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("test.json");

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };
        write_json(&path, &data).unwrap();

        let read: Option<TestData> = read_json(&path).unwrap();
        assert_eq!(read, Some(data));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_written_json_is_pretty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pretty.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");
        let read: Option<TestData> = read_json(&path).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_read_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<TestData>(&path).unwrap_err();
        assert!(matches!(err, ScanError::CorruptCache { .. }));
    }

    #[test]
    fn test_read_invalid_utf8_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("binary.json");
        fs::write(&path, [0xff, 0xfe, b'{']).unwrap();
        let err = read_json::<TestData>(&path).unwrap_err();
        assert!(matches!(err, ScanError::CorruptCache { .. }));
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_json::<TestData>(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ScanError::Io(_)));
    }
}
