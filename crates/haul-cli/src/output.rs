//! File input and report output shared by the subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read and parse a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty JSON for stdout.
pub fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Sample {
        name: String,
    }

    #[test]
    fn reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name":"T-1"}}"#).unwrap();
        let sample: Sample = read_json(file.path()).unwrap();
        assert_eq!(sample.name, "T-1");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_json::<Sample>(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/bundle.json"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = read_json::<Sample>(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }
}
