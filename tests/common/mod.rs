//! Common test utilities for the server integration tests.
//!
//! `TestApp` spawns the real router on a random port with a mock converter
//! standing in for the external conversion backend, plus isolated temp
//! directories for the artifact and staging roots.

#![allow(dead_code)]

use async_trait::async_trait;
use paper_podcast::{
    routes,
    services::{
        converter::{ArtifactRef, ConvertError, Converter},
        podcast_service::{ArtifactLayout, PodcastService},
    },
};
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tempfile::TempDir;
use tokio::{net::TcpListener, task::JoinHandle};

/// What the mock conversion backend should do when called.
pub enum MockBehavior {
    /// Produce a real final file and segment directory, then report them.
    Succeed,
    /// Fail with the given diagnostic message.
    Fail(String),
    /// Report an artifact reference that does not follow the naming
    /// convention.
    Malformed,
}

/// In-process stand-in for the external conversion collaborator.
pub struct MockConverter {
    final_root: PathBuf,
    segments_root: PathBuf,
    behavior: MockBehavior,
    delay: Duration,
    counter: AtomicU64,
    /// Every staged input path seen, with whether it existed at call time.
    pub seen_inputs: Mutex<Vec<(PathBuf, bool)>>,
}

impl MockConverter {
    pub fn new(layout: &ArtifactLayout, behavior: MockBehavior, delay: Duration) -> Self {
        Self {
            final_root: layout.final_root(),
            segments_root: layout.segments_root(),
            behavior,
            delay,
            counter: AtomicU64::new(0),
            seen_inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Converter for MockConverter {
    async fn convert(&self, input: &Path) -> Result<ArtifactRef, ConvertError> {
        self.seen_inputs
            .lock()
            .unwrap()
            .push((input.to_path_buf(), input.exists()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                let id = format!("20240101120000{n:02}");

                let final_path = self.final_root.join(format!("podcast_{id}.mp3"));
                tokio::fs::create_dir_all(&self.final_root).await.unwrap();
                tokio::fs::write(&final_path, fake_audio()).await.unwrap();

                let segments = self.segments_root.join(format!("podcast_{id}"));
                tokio::fs::create_dir_all(&segments).await.unwrap();
                tokio::fs::write(segments.join("segment_001.mp3"), fake_audio())
                    .await
                    .unwrap();

                Ok(ArtifactRef(final_path))
            }
            MockBehavior::Fail(detail) => Err(ConvertError::Failed {
                status: "exit status: 1".into(),
                detail: detail.clone(),
            }),
            MockBehavior::Malformed => {
                Ok(ArtifactRef(PathBuf::from("episode-without-convention.ogg")))
            }
        }
    }
}

pub fn fake_audio() -> &'static [u8] {
    b"ID3\x03\x00fake-mp3-bytes"
}

/// A running server instance backed by temp directories.
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub converter: Arc<MockConverter>,
    pub layout: ArtifactLayout,
    pub temp_root: PathBuf,
    _work_dir: TempDir,
    server: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn(behavior: MockBehavior) -> Self {
        Self::spawn_with(behavior, Duration::ZERO, Duration::from_secs(30)).await
    }

    pub async fn spawn_with(
        behavior: MockBehavior,
        delay: Duration,
        conversion_timeout: Duration,
    ) -> Self {
        let work_dir = tempfile::tempdir().expect("create test work dir");
        let layout = ArtifactLayout::new(work_dir.path().join("podcast"));
        let temp_root = work_dir.path().join("temp");
        std::fs::create_dir_all(layout.final_root()).unwrap();
        std::fs::create_dir_all(layout.segments_root()).unwrap();
        std::fs::create_dir_all(&temp_root).unwrap();

        let converter = Arc::new(MockConverter::new(&layout, behavior, delay));
        let service = PodcastService::new(
            converter.clone(),
            layout.clone(),
            temp_root.clone(),
            4,
            conversion_timeout,
        );

        let app = routes::routes::routes(layout.root()).with_state(service);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let address = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        Self {
            address,
            client: reqwest::Client::new(),
            converter,
            layout,
            temp_root,
            _work_dir: work_dir,
            server,
        }
    }

    /// POST a multipart upload to `/generate-podcast/`.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(format!("{}/generate-podcast/", self.address))
            .multipart(form)
            .send()
            .await
            .expect("upload request")
    }

    /// Names of files currently sitting in the staging root.
    pub fn staged_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.temp_root)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}
