//! Streaming download of a single media track to disk.

use crate::error::Result;
use crate::utils::file_system;
use futures_util::StreamExt;
use reqwest::Client;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// The default number of bytes written per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// A snapshot of a running download, handed to the progress callback after
/// every chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Total size announced by the server, if any.
    pub total: Option<u64>,
    /// Bytes written to disk so far.
    pub downloaded: u64,
    /// Wall-clock time since the download started.
    pub elapsed: Duration,
}

impl Progress {
    /// Percentage complete, or 0 when the total size is unknown.
    pub fn percent(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => self.downloaded as f64 / total as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// Average throughput in KB/s, or 0 when no time has elapsed.
    pub fn speed_kbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.downloaded as f64 / secs / 1024.0
        } else {
            0.0
        }
    }
}

type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// The fetcher is responsible for downloading data from a URL.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    /// The size of each chunk written to the destination.
    chunk_size: usize,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("chunk_size", &self.chunk_size)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "Fn"),
            )
            .finish()
    }
}

impl Fetcher {
    /// Creates a new fetcher sending its requests through `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_callback: None,
        }
    }

    /// Configures the size of each written chunk in bytes. Zero is treated as one.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Configures a callback for tracking download progress.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Downloads `url` into `destination`, truncating any existing file.
    ///
    /// Returns the number of bytes written. On error the destination may hold
    /// a partial download and must not be used.
    ///
    /// # Errors
    ///
    /// Fails on a non-2xx status, a broken connection or a write failure.
    pub async fn fetch_asset(&self, url: &str, destination: impl AsRef<Path>) -> Result<u64> {
        let destination = destination.as_ref();
        log::debug!("Fetching {} into {}", url, destination.display());

        let started = Instant::now();
        let response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length().filter(|&length| length > 0);

        let mut dest = file_system::create_file(destination).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;

            for chunk in bytes.chunks(self.chunk_size) {
                dest.write_all(chunk).await?;
                downloaded += chunk.len() as u64;

                if let Some(callback) = &self.progress_callback {
                    callback(&Progress {
                        total,
                        downloaded,
                        elapsed: started.elapsed(),
                    });
                }
            }
        }

        dest.flush().await?;
        log::debug!(
            "Fetched {} bytes into {} in {:?}",
            downloaded,
            destination.display(),
            started.elapsed()
        );

        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn percent_is_zero_without_total() {
        let progress = Progress {
            total: None,
            downloaded: 4096,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(progress.percent(), 0.0);
        assert_eq!(progress.speed_kbps(), 4.0);
    }

    #[test]
    fn speed_is_zero_without_elapsed_time() {
        let progress = Progress {
            total: Some(2048),
            downloaded: 1024,
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.percent(), 50.0);
        assert_eq!(progress.speed_kbps(), 0.0);
    }

    #[tokio::test]
    async fn writes_whole_body_with_monotonic_progress() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..10_240u32).map(|i| (i % 251) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/video.m4s"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("video.mp4");
        let percents = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&percents);

        let fetcher = Fetcher::new(Client::new())
            .with_chunk_size(1024)
            .with_progress_callback(move |p| seen.lock().unwrap().push(p.percent()));

        let written = fetcher
            .fetch_asset(&format!("{}/video.m4s", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(written, 10_240);
        assert_eq!(std::fs::read(&destination).unwrap(), body);

        let percents = percents.lock().unwrap();
        assert!(percents.len() >= 10, "one update per chunk at least");
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn truncates_existing_destination() {
        let server = MockServer::start().await;
        Mock::given(path("/audio.m4s"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 100]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("audio.m4a");
        std::fs::write(&destination, vec![0u8; 5000]).unwrap();

        Fetcher::new(Client::new())
            .fetch_asset(&format!("{}/audio.m4s", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(std::fs::metadata(&destination).unwrap().len(), 100);
    }

    #[tokio::test]
    async fn error_status_fails_without_creating_file() {
        let server = MockServer::start().await;
        Mock::given(path("/expired.m4s"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("video.mp4");

        let err = Fetcher::new(Client::new())
            .fetch_asset(&format!("{}/expired.m4s", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let server = MockServer::start().await;
        Mock::given(path("/video.m4s"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing").join("video.mp4");

        let err = Fetcher::new(Client::new())
            .fetch_asset(&format!("{}/video.m4s", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::IO(_)));
    }
}
