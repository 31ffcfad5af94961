//! Tools for working with the file system.

use crate::error::Result;
use crate::quality::Quality;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs::{File, OpenOptions};

/// The default maximum length, in chars, of a sanitized file name.
pub const DEFAULT_MAX_FILENAME_LEN: usize = 100;

static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid illegal chars regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Makes `name` usable as a single path component.
///
/// Removes the characters `\ / * ? : " < > |`, collapses whitespace runs into
/// a single space, trims both ends and truncates to `max_len` chars.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let name = ILLEGAL_CHARS.replace_all(name, "");
    let name = WHITESPACE.replace_all(&name, " ");
    let truncated: String = name.trim().chars().take(max_len).collect();

    truncated.trim_end().to_string()
}

/// The files produced by one download-and-mux cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// The raw video track, removed after a successful mux.
    pub video: PathBuf,
    /// The raw audio track, removed after a successful mux.
    pub audio: PathBuf,
    /// The muxed result.
    pub output: PathBuf,
}

impl OutputPaths {
    /// Builds the paths for `stem` (an already sanitized title) inside `dir`.
    pub fn new(dir: impl AsRef<Path>, stem: &str, quality: Quality) -> Self {
        let dir = dir.as_ref();

        Self {
            video: dir.join(format!("{stem}_video.mp4")),
            audio: dir.join(format!("{stem}_audio.m4a")),
            output: dir.join(format!("{stem}_{}.mp4", quality.label())),
        }
    }
}

/// Creates or truncates the file at the given destination for writing.
pub async fn create_file(destination: impl AsRef<Path>) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(destination)
        .await?;

    Ok(file)
}

/// Creates a new directory at the given destination.
/// If the directory already exists, nothing is done.
pub async fn create_dir(destination: impl AsRef<Path>) -> Result<()> {
    tokio::fs::create_dir_all(destination).await?;
    Ok(())
}

/// Removes a temporary file and logs any errors.
/// Does not propagate errors to avoid interrupting the execution flow.
///
/// Returns `true` if the file was successfully deleted.
pub async fn remove_temp_file(file_path: impl AsRef<Path>) -> bool {
    let file_path = file_path.as_ref();
    let result = tokio::fs::remove_file(file_path).await;

    if let Err(ref e) = result {
        log::warn!(
            "Failed to remove temporary file {}: {}",
            file_path.display(),
            e
        );
    }

    result.is_ok()
}
