//! Downloader configuration, read from a TOML file.

use crate::error::{Error, Result};
use crate::utils::file_system::DEFAULT_MAX_FILENAME_LEN;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Immutable settings handed to the [`Downloader`](crate::Downloader).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where temporaries and final files are written.
    pub output_dir: PathBuf,
    /// The ffmpeg executable, looked up in `PATH` when relative.
    pub ffmpeg: PathBuf,
    /// Base URL of the bilibili web API.
    pub api_base: String,
    /// Size in bytes of each chunk written while downloading.
    pub chunk_size: usize,
    pub max_filename_len: usize,
    /// Default `qn` code when none is chosen interactively.
    pub quality: u32,
    pub user_agent: String,
    pub referer: String,
    pub accept_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            ffmpeg: PathBuf::from("ffmpeg"),
            api_base: "https://api.bilibili.com".to_string(),
            chunk_size: 1024,
            max_filename_len: DEFAULT_MAX_FILENAME_LEN,
            quality: 80,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: "https://www.bilibili.com/".to_string(),
            accept_language: "zh-CN,zh;q=0.9".to_string(),
        }
    }
}

impl Config {
    /// `<config dir>/bilidl/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bilidl").join("config.toml"))
    }

    /// Loads the config at `path`. A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
