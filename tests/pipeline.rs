#![cfg(unix)]

use bilidl::{Config, Downloader, Error, Quality};
use indicatif::{MultiProgress, ProgressDrawTarget};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BVID: &str = "BV1xyz123";
const PAGE_URL: &str = "https://www.bilibili.com/video/BV1xyz123/?p=1";

/// Writes an executable shell script standing in for ffmpeg.
fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Mimics a successful run: creates the last argument, the output file.
fn working_ffmpeg(dir: &Path) -> PathBuf {
    fake_ffmpeg(dir, "for last; do :; done\n[ \"$last\" = \"-version\" ] || : > \"$last\"")
}

async fn mock_platform(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/x/web-interface/view"))
        .and(query_param("bvid", BVID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "0",
            "data": { "bvid": BVID, "title": "Example: a <test> video", "cid": 12345 }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x/player/playurl"))
        .and(query_param("cid", "12345"))
        .and(query_param("qn", "64"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "dash": {
                    "video": [
                        { "id": 64, "base_url": format!("{}/media/video.m4s", server.uri()) }
                    ],
                    "audio": [
                        { "id": 30280, "base_url": format!("{}/media/audio.m4s", server.uri()) }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/video.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10_240]))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/audio.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 4_096]))
        .expect(1)
        .mount(server)
        .await;
}

fn downloader(server: &MockServer, workdir: &TempDir, ffmpeg: PathBuf) -> Downloader {
    let config = Config {
        output_dir: workdir.path().join("downloads"),
        ffmpeg,
        api_base: server.uri(),
        ..Config::default()
    };

    Downloader::new(config)
        .unwrap()
        .with_progress(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
}

#[tokio::test]
async fn downloads_and_merges_both_tracks() {
    let server = MockServer::start().await;
    mock_platform(&server).await;
    let workdir = tempfile::tempdir().unwrap();
    let downloader = downloader(&server, &workdir, working_ffmpeg(workdir.path()));

    let output = downloader.download(PAGE_URL, Quality::P720).await.unwrap();

    let dir = workdir.path().join("downloads");
    assert_eq!(output, dir.join("Example a test video_720P.mp4"));
    assert!(output.exists());
    assert!(!dir.join("Example a test video_video.mp4").exists());
    assert!(!dir.join("Example a test video_audio.m4a").exists());
}

#[tokio::test]
async fn failed_merge_keeps_downloaded_tracks() {
    let server = MockServer::start().await;
    mock_platform(&server).await;
    let workdir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_ffmpeg(
        workdir.path(),
        "[ \"$1\" = \"-version\" ] && exit 0\necho 'moov atom not found' >&2\nexit 1",
    );
    let downloader = downloader(&server, &workdir, ffmpeg);

    let err = downloader
        .download(PAGE_URL, Quality::P720)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mux { code: 1, .. }));
    let dir = workdir.path().join("downloads");
    assert!(!dir.join("Example a test video_720P.mp4").exists());
    assert_eq!(
        std::fs::metadata(dir.join("Example a test video_video.mp4"))
            .unwrap()
            .len(),
        10_240
    );
    assert_eq!(
        std::fs::metadata(dir.join("Example a test video_audio.m4a"))
            .unwrap()
            .len(),
        4_096
    );
}

#[tokio::test]
async fn missing_tool_fails_before_any_request() {
    let server = MockServer::start().await;
    let workdir = tempfile::tempdir().unwrap();
    let downloader = downloader(&server, &workdir, workdir.path().join("no-ffmpeg-here"));

    let err = downloader
        .download(PAGE_URL, Quality::P1080)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ToolMissing(_)));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
    assert!(!workdir.path().join("downloads").exists());
}

#[tokio::test]
async fn url_without_identifier_fails_before_any_request() {
    let server = MockServer::start().await;
    let workdir = tempfile::tempdir().unwrap();
    let downloader = downloader(&server, &workdir, working_ffmpeg(workdir.path()));

    let err = downloader
        .download("https://www.bilibili.com/", Quality::P1080)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_stream_url_aborts_before_merge() {
    let server = MockServer::start().await;
    Mock::given(path("/x/web-interface/view"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "title": "Example", "cid": 12345 }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/x/player/playurl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "dash": {
                    "video": [ { "base_url": format!("{}/media/video.m4s", server.uri()) } ],
                    "audio": [ { "base_url": format!("{}/media/audio.m4s", server.uri()) } ]
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/media/video.m4s"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(path("/media/audio.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 16]))
        .expect(0)
        .mount(&server)
        .await;

    let workdir = tempfile::tempdir().unwrap();
    let downloader = downloader(&server, &workdir, working_ffmpeg(workdir.path()));

    let err = downloader
        .download(PAGE_URL, Quality::P1080)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert!(!workdir.path().join("downloads/Example_1080P.mp4").exists());
}
