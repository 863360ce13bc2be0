use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::block::MAX_CHILDREN_PER_REQUEST;
use crate::error::Error;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub upload: UploadOptions,
}

/// How the uploader treats empty entries and failures
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadOptions {
    /// Stop the run at the first failed entry.
    pub halt_on_error: bool,
    pub add_empty_pages: bool,
    pub add_empty_folders: bool,
    /// Directory that receives copies of files that failed to upload.
    pub quarantine_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub error_file: PathBuf,
    pub batch_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            halt_on_error: false,
            add_empty_pages: true,
            add_empty_folders: true,
            quarantine_dir: None,
            log_file: PathBuf::from("upload_logs.json"),
            error_file: PathBuf::from("upload_errors.json"),
            batch_size: MAX_CHILDREN_PER_REQUEST,
        }
    }
}

impl UploadOptions {
    /// Batch size limited to what a single request accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_CHILDREN_PER_REQUEST)
    }
}

impl Config {
    /// The defaults bundled with the binary.
    pub fn compiled_default() -> Self {
        toml::from_str(include_str!("default_config.toml")).unwrap_or_default()
    }

    /// Load config from a TOML file, or return the compiled defaults if the
    /// file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::compiled_default());
        }

        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            config_path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            config_path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn compiled_default_matches_code_defaults() {
        assert_eq!(Config::compiled_default(), Config::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[upload]\nhalt_on_error = true\nquarantine_dir = \"failed\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert!(config.upload.halt_on_error);
        assert_eq!(config.upload.quarantine_dir, Some(PathBuf::from("failed")));
        assert!(config.upload.add_empty_pages);
        assert_eq!(config.upload.batch_size, 100);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[upload\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn batch_size_is_clamped() {
        let mut options = UploadOptions {
            batch_size: 500,
            ..UploadOptions::default()
        };
        assert_eq!(options.effective_batch_size(), 100);

        options.batch_size = 0;
        assert_eq!(options.effective_batch_size(), 1);
    }
}
