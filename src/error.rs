//! The errors that can occur.

use std::path::PathBuf;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur while downloading a video.
#[derive(Debug, Error)]
pub enum Error {
    /// No video identifier could be found in the input.
    #[error("No BV identifier found in {0:?}")]
    NotFound(String),
    /// An error occurred while talking to a remote host.
    #[error("An error occurred while fetching: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API answered, but with a failure code or an unusable payload.
    #[error("The API returned code {code}: {message}")]
    Remote { code: i64, message: String },
    /// The API answered successfully but without a DASH video/audio pair.
    #[error("No DASH streams available: {0}")]
    NoStreams(String),
    /// The media tool could not be spawned.
    #[error("Media tool not found: {}", .0.display())]
    ToolMissing(PathBuf),
    /// The media tool ran but exited with a failure.
    #[error("Muxing failed with code {code}: {stderr}")]
    Mux { code: i32, stderr: String },
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// A configured header value is not valid HTTP.
    #[error("Invalid header value: {0:?}")]
    Header(String),
    /// The configuration file could not be parsed.
    #[error("Malformed config file {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}
