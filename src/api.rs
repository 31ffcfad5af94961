//! Client for the two bilibili web API endpoints used by the pipeline.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::quality::Quality;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const VIEW_PATH: &str = "/x/web-interface/view";
const PLAY_URL_PATH: &str = "/x/player/playurl";

/// A resolved video: public identifier, display title and content id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    pub identifier: String,
    pub title: String,
    pub content_id: u64,
}

/// Direct, short-lived URLs of the video-only and audio-only tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPair {
    pub video_url: String,
    pub audio_url: String,
}

/// The envelope shared by every API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Fails on a non-zero code, otherwise returns the raw payload.
    fn into_data(self) -> Result<serde_json::Value> {
        if self.code != 0 {
            let message = self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(Error::Remote {
                code: self.code,
                message,
            });
        }

        self.data.ok_or_else(|| Error::Remote {
            code: self.code,
            message: "response carried no data".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ViewData {
    title: String,
    cid: u64,
}

#[derive(Debug, Deserialize)]
struct PlayUrlData {
    #[serde(default)]
    dash: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Dash {
    #[serde(default)]
    video: Option<Vec<DashStream>>,
    #[serde(default)]
    audio: Option<Vec<DashStream>>,
}

#[derive(Debug, Deserialize)]
struct DashStream {
    base_url: String,
}

/// HTTP client carrying the browser-like headers bilibili expects.
#[derive(Debug, Clone)]
pub struct BiliClient {
    client: Client,
    api_base: String,
}

impl BiliClient {
    /// Builds the underlying `reqwest` client from the configured headers.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(&config.referer)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// The configured HTTP client, shared with the stream fetcher.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Resolves a BV identifier into its title and content id.
    pub async fn fetch_video_info(&self, bvid: &str) -> Result<VideoReference> {
        let url = format!("{}{}", self.api_base, VIEW_PATH);
        let data = self.get_api(&url, &[("bvid", bvid.to_string())]).await?;

        let view: ViewData = decode_payload(data)?;
        log::debug!("Resolved {} to cid {}: {}", bvid, view.cid, view.title);

        Ok(VideoReference {
            identifier: bvid.to_string(),
            title: view.title,
            content_id: view.cid,
        })
    }

    /// Asks for the DASH streams of `video` at the given quality and picks the
    /// first video and the first audio representation.
    pub async fn fetch_stream_pair(
        &self,
        video: &VideoReference,
        quality: Quality,
    ) -> Result<StreamPair> {
        let url = format!("{}{}", self.api_base, PLAY_URL_PATH);
        let params = [
            ("bvid", video.identifier.clone()),
            ("cid", video.content_id.to_string()),
            ("qn", quality.code().to_string()),
            ("fnver", "0".to_string()),
            ("fnval", "16".to_string()),
            ("fourk", "1".to_string()),
        ];
        let data = self.get_api(&url, &params).await?;

        let play: PlayUrlData = decode_payload(data)?;
        let dash = play
            .dash
            .ok_or_else(|| Error::NoStreams("response has no DASH section".to_string()))?;
        let dash: Dash = serde_json::from_value(dash)
            .map_err(|e| Error::NoStreams(format!("malformed DASH section: {e}")))?;

        let video_url = first_base_url(dash.video, "video")?;
        let audio_url = first_base_url(dash.audio, "audio")?;

        Ok(StreamPair {
            video_url,
            audio_url,
        })
    }

    async fn get_api(&self, url: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        log::debug!("GET {} {:?}", url, params);

        let response = self.client.get(url).query(params).send().await?;
        let envelope: ApiResponse = response.json().await?;

        envelope.into_data()
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::Header(value.to_string()))
}

fn decode_payload<T: DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::Remote {
        code: 0,
        message: format!("unexpected payload: {e}"),
    })
}

fn first_base_url(streams: Option<Vec<DashStream>>, kind: &str) -> Result<String> {
    streams
        .and_then(|streams| streams.into_iter().next())
        .map(|stream| stream.base_url)
        .ok_or_else(|| Error::NoStreams(format!("no {kind} stream in DASH section")))
}
