//! Combines the downloaded tracks with ffmpeg.

use crate::error::Result;
use crate::executor::Executor;
use crate::utils::file_system::{self, OutputPaths};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const FFMPEG_QUIET_ARGS: [&str; 3] = ["-hide_banner", "-loglevel", "error"];

/// Interface for the [ffmpeg](https://ffmpeg.org) program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Muxer {
    executable: PathBuf,
}

impl Muxer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Verifies that the executable can be started, by running `-version`.
    ///
    /// The exit status is ignored, only a failed spawn is an error.
    pub async fn probe(&self) -> Result<()> {
        let code = Executor::new(&self.executable)
            .arg("-version")
            .status()
            .await?;
        log::debug!("{} -version exited with {}", self.executable.display(), code);

        Ok(())
    }

    /// Stream-copies `video` and `audio` into `output`, cut to the shorter
    /// of the two.
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let run = Executor::new(&self.executable)
            .args(FFMPEG_QUIET_ARGS)
            .arg("-y")
            .args([OsStr::new("-i"), video.as_os_str()])
            .args([OsStr::new("-i"), audio.as_os_str()])
            .args(["-c", "copy"])
            .arg("-shortest")
            .arg(output)
            .execute()
            .await?;

        if !run.stderr.trim().is_empty() {
            log::debug!("ffmpeg: {}", run.stderr.trim());
        }

        Ok(())
    }

    /// Muxes the temporaries of `paths` into its output, then removes them.
    ///
    /// The temporaries are kept when muxing fails.
    pub async fn merge(&self, paths: &OutputPaths) -> Result<()> {
        log::info!("Merging tracks into {}", paths.output.display());
        self.mux(&paths.video, &paths.audio, &paths.output).await?;

        file_system::remove_temp_file(&paths.video).await;
        file_system::remove_temp_file(&paths.audio).await;

        Ok(())
    }
}
