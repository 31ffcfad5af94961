//! Download bilibili videos as a single file.
//!
//! A [`Downloader`] runs one request at a time through a fixed pipeline:
//! the `BV` identifier is extracted from the URL, the title and content id
//! are resolved, the DASH video and audio tracks are located and downloaded
//! one after the other, and ffmpeg stream-copies them into the final file.
//!
//! ```rust,no_run
//! # use bilidl::{Config, Downloader, Quality};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(Config::default())?;
//! let path = downloader
//!     .download("https://www.bilibili.com/video/BV1GJ411x7h7", Quality::P1080)
//!     .await?;
//! println!("Saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod fetcher;
pub mod muxer;
pub mod quality;
pub mod utils;

pub use api::{BiliClient, StreamPair, VideoReference};
pub use config::Config;
pub use error::{Error, Result};
pub use extractor::extract_bvid;
pub use fetcher::{Fetcher, Progress};
pub use muxer::Muxer;
pub use quality::Quality;
pub use utils::file_system::{OutputPaths, sanitize_filename};

const PROGRESS_TEMPLATE: &str = "{prefix:>6} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";

/// Sequences the download pipeline for one video at a time.
#[derive(Debug)]
pub struct Downloader {
    config: Config,
    client: BiliClient,
    muxer: Muxer,
    progress: MultiProgress,
}

impl Downloader {
    /// Creates a downloader from immutable settings.
    ///
    /// # Errors
    ///
    /// Fails if a configured header value is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let client = BiliClient::new(&config)?;
        let muxer = Muxer::new(&config.ffmpeg);

        Ok(Self {
            config,
            client,
            muxer,
            progress: MultiProgress::new(),
        })
    }

    /// Draws the track progress bars into `progress`, typically the one the
    /// logger is bridged to.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Downloads the video referenced by `url` and returns the muxed file.
    ///
    /// The media tool is probed before any network request. When a stage
    /// fails the request is aborted and any temporaries already written stay
    /// on disk.
    pub async fn download(&self, url: &str, quality: Quality) -> Result<PathBuf> {
        self.muxer.probe().await?;
        utils::file_system::create_dir(&self.config.output_dir).await?;

        let bvid = extract_bvid(url)?;
        let video = self.client.fetch_video_info(&bvid).await?;
        log::info!("Found \"{}\" ({})", video.title, video.identifier);

        let streams = self.client.fetch_stream_pair(&video, quality).await?;
        let paths = self.output_paths(&video, quality);

        self.download_track("video", &streams.video_url, &paths.video)
            .await?;
        self.download_track("audio", &streams.audio_url, &paths.audio)
            .await?;

        self.muxer.merge(&paths).await?;
        log::info!("Video saved to {}", paths.output.display());

        Ok(paths.output)
    }

    /// Paths of the temporaries and the final file for `video`.
    pub fn output_paths(&self, video: &VideoReference, quality: Quality) -> OutputPaths {
        let mut stem = sanitize_filename(&video.title, self.config.max_filename_len);
        if stem.is_empty() {
            stem = video.identifier.clone();
        }

        OutputPaths::new(&self.config.output_dir, &stem, quality)
    }

    async fn download_track(&self, label: &str, url: &str, destination: &Path) -> Result<u64> {
        log::info!("Downloading {} track", label);

        let bar = self.progress.add(ProgressBar::no_length());
        bar.set_style(
            ProgressStyle::with_template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_prefix(label.to_string());

        let callback_bar = bar.clone();
        let fetcher = Fetcher::new(self.client.http().clone())
            .with_chunk_size(self.config.chunk_size)
            .with_progress_callback(move |progress: &Progress| {
                if let Some(total) = progress.total {
                    callback_bar.set_length(total);
                }
                callback_bar.set_position(progress.downloaded);
                callback_bar.set_message(format!(
                    "{:.2}% | {:.2} KB/s",
                    progress.percent(),
                    progress.speed_kbps()
                ));
            });

        match fetcher.fetch_asset(url, destination).await {
            Ok(bytes) => {
                bar.finish_with_message(format!("{label} done"));
                Ok(bytes)
            }
            Err(e) => {
                bar.abandon_with_message(format!("{label} failed"));
                Err(e)
            }
        }
    }
}
