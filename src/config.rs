//! `boltwire.toml` configuration.
//!
//! ```toml
//! [codec]
//! max_block_size = 1048576        # plaintext bytes per written block
//! read_max_block_size = 1073741824
//!
//! [output]
//! format = "json"                 # or "table"
//!
//! [decode]
//! compressed = true
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::codec::{DEFAULT_MAX_BLOCK_SIZE, DEFAULT_WRITE_BLOCK_SIZE};
use crate::error::{WireError, WireResult};

pub const CONFIG_FILE: &str = "boltwire.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoltConfig {
    pub codec: CodecConfig,
    pub output: OutputConfig,
    pub decode: DecodeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Plaintext bytes per block when compressing.
    pub max_block_size: usize,
    /// Largest block accepted when decompressing.
    pub read_max_block_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_WRITE_BLOCK_SIZE,
            read_max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Treat response files as block-compressed.
    pub compressed: bool,
}

impl BoltConfig {
    pub fn from_toml(content: &str) -> WireResult<Self> {
        let config: BoltConfig =
            toml::from_str(content).map_err(|e| WireError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> WireResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| WireError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content).map_err(|e| match e {
            WireError::Config(message) => WireError::Config(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    /// Load from `explicit` if given (it must exist), else the first of
    /// `./boltwire.toml` and the user config directory that exists, else
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> WireResult<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading config");
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Where [`load`](Self::load) looks when no path is given.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("boltwire").join("config.toml"));
        }
        paths
    }

    fn validate(&self) -> WireResult<()> {
        if self.codec.max_block_size == 0 {
            return Err(WireError::Config("codec.max_block_size must be positive".into()));
        }
        if self.codec.max_block_size > i32::MAX as usize {
            return Err(WireError::Config(format!(
                "codec.max_block_size must not exceed {}",
                i32::MAX
            )));
        }
        if self.codec.read_max_block_size == 0 {
            return Err(WireError::Config("codec.read_max_block_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(BoltConfig::from_toml("").unwrap(), BoltConfig::default());
        assert_eq!(
            BoltConfig::default().codec.read_max_block_size,
            DEFAULT_MAX_BLOCK_SIZE
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = BoltConfig::from_toml(
            r#"
            [output]
            format = "json"

            [decode]
            compressed = true
            "#,
        )
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.decode.compressed);
        assert_eq!(config.codec, CodecConfig::default());
    }

    #[test]
    fn test_codec_sizes() {
        let config = BoltConfig::from_toml("[codec]\nmax_block_size = 4096\n").unwrap();
        assert_eq!(config.codec.max_block_size, 4096);
        assert_eq!(config.codec.read_max_block_size, DEFAULT_MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_invalid_config() {
        for content in [
            "[output]\nformat = \"xml\"\n",
            "[codec]\nmax_block_size = 0\n",
            "[codec]\nmax_block_size = \"big\"\n",
            "[unknown]\nkey = 1\n",
            "not toml at all [",
        ] {
            let err = BoltConfig::from_toml(content).unwrap_err();
            assert!(matches!(err, WireError::Config(_)), "{content}");
        }
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = BoltConfig::load(Some(Path::new("/nonexistent/boltwire.toml"))).unwrap_err();
        assert!(matches!(err, WireError::Config(_)));
    }

    #[test]
    fn test_search_paths_start_with_local_file() {
        assert_eq!(BoltConfig::search_paths()[0], PathBuf::from(CONFIG_FILE));
    }
}
