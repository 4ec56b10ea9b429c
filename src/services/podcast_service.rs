//! src/services/podcast_service.rs
//!
//! PodcastService — conversion job orchestration and artifact lifecycle.
//! Owns the whole arc of a job: validate the upload, stage it to a unique
//! temp file, invoke the external converter exactly once under a timeout
//! and a bounded concurrency gate, derive the canonical artifact paths,
//! and guarantee staged-input cleanup on every exit path. The conversion
//! algorithm itself lives behind the `Converter` trait.

use crate::models::job::{JobId, JobRecord, JobState};
use crate::models::response::PodcastResponse;
use crate::services::converter::{ArtifactRef, Converter};
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    sync::Semaphore,
    time::timeout,
};
use tracing::{error, info, warn};

/// Prefix the converter uses for every final artifact name.
pub const FINAL_PREFIX: &str = "podcast_";
/// Audio container extension of the final artifact.
pub const AUDIO_EXT: &str = "mp3";
/// The single recognized document extension for uploads.
pub const DOCUMENT_EXT: &str = "pdf";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("only PDF files are accepted (got `{0}`)")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Storage(#[from] io::Error),
    #[error("podcast generation failed: {0}")]
    Conversion(String),
    #[error("podcast generation timed out after {0}s")]
    Timeout(u64),
    #[error("converter returned unrecognized artifact reference `{0}`")]
    MalformedArtifactReference(String),
    #[error("podcast `{0}` not found")]
    NotFound(String),
}

pub type JobResult<T> = Result<T, JobError>;

/// Canonical locations for one completed job, both built from the same
/// extracted identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub podcast_file: String,
    pub segments_dir: String,
}

/// Fixed on-disk layout of produced artifacts.
///
/// Final audio lives at `<root>/final/podcast_<id>.mp3`, segments at
/// `<root>/segments/podcast_<id>`. Names are never reused because ids are
/// unique per job, so both roots are append-only and need no locking.
#[derive(Clone, Debug)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn final_root(&self) -> PathBuf {
        self.root.join("final")
    }

    pub fn segments_root(&self) -> PathBuf {
        self.root.join("segments")
    }

    /// Derive the result paths from the converter's artifact reference.
    ///
    /// Pure string transform, no I/O. The job identity is extracted once
    /// from the final artifact's name and reused verbatim for the segment
    /// directory; a reference that does not match the
    /// `podcast_<id>.mp3` convention is rejected rather than silently
    /// mapped to a wrong path.
    pub fn locate(&self, artifact: &ArtifactRef) -> JobResult<ArtifactPaths> {
        let malformed = || JobError::MalformedArtifactReference(artifact.0.display().to_string());

        let name = artifact.file_name().ok_or_else(malformed)?;
        let id = name
            .strip_prefix(FINAL_PREFIX)
            .and_then(|rest| rest.strip_suffix(&format!(".{AUDIO_EXT}")))
            .ok_or_else(malformed)?;
        if !is_name_safe(id) {
            return Err(malformed());
        }

        let public = self.root.display();
        Ok(ArtifactPaths {
            podcast_file: format!("{public}/final/{FINAL_PREFIX}{id}.{AUDIO_EXT}"),
            segments_dir: format!("{public}/segments/{FINAL_PREFIX}{id}"),
        })
    }

    /// Resolve a caller-supplied artifact name under the final root.
    ///
    /// No parsing of the name beyond refusing anything that could escape
    /// the root: separators, `..`, control bytes. Unknown and unsafe names
    /// are both reported as not found, never as content from elsewhere.
    pub fn resolve_download(&self, name: &str) -> JobResult<PathBuf> {
        if !is_name_safe(name) {
            return Err(JobError::NotFound(name.to_string()));
        }
        Ok(self.final_root().join(name))
    }
}

/// A single path component: non-empty, no separators, no `..`, no control
/// or backslash bytes.
fn is_name_safe(name: &str) -> bool {
    if name.is_empty() || name.contains("..") {
        return false;
    }
    !name
        .bytes()
        .any(|b| b == b'/' || b == b'\\' || b == b'\0' || b.is_ascii_control())
}

/// Uploaded document staged to a unique temp file, removed on drop.
///
/// The guard is the cleanup discipline: success, error, panic, and
/// cancellation all end in `Drop`, so no exit path needs its own removal
/// call. The name embeds the job id, never the caller's filename, so
/// concurrent uploads of `paper.pdf` stage to distinct paths.
pub struct StagedInput {
    path: PathBuf,
}

impl StagedInput {
    /// Write the full upload to `<dir>/<job-id>.pdf`, fsynced.
    ///
    /// Either the whole byte stream lands on disk and the handle is valid,
    /// or the error propagates and the partial file is removed by the
    /// guard's drop.
    pub async fn write(dir: &Path, job_id: JobId, data: &Bytes) -> JobResult<Self> {
        fs::create_dir_all(dir).await?;
        let staged = Self {
            path: dir.join(format!("{job_id}.{DOCUMENT_EXT}")),
        };
        let mut file = File::create(&staged.path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// PodcastService provides the two public operations of the API:
/// - Generate a podcast from an uploaded document
/// - Open a previously produced final artifact for download
///
/// Cloneable router state; the converter and the concurrency gate are
/// shared across clones.
#[derive(Clone)]
pub struct PodcastService {
    converter: Arc<dyn Converter>,
    layout: ArtifactLayout,
    temp_dir: PathBuf,
    gate: Arc<Semaphore>,
    conversion_timeout: Duration,
}

impl PodcastService {
    pub fn new(
        converter: Arc<dyn Converter>,
        layout: ArtifactLayout,
        temp_dir: impl Into<PathBuf>,
        max_concurrent_jobs: usize,
        conversion_timeout: Duration,
    ) -> Self {
        Self {
            converter,
            layout,
            temp_dir: temp_dir.into(),
            gate: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            conversion_timeout,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Run one conversion job end to end.
    ///
    /// Rejects unsupported formats before any storage write, then queues on
    /// the concurrency gate, stages the document, and hands it to the
    /// converter under the configured deadline. The staged input is removed
    /// whichever way this returns.
    pub async fn generate(&self, filename: &str, data: Bytes) -> JobResult<PodcastResponse> {
        let started = Instant::now();
        let mut job = JobRecord::new(filename);

        if let Err(err) = ensure_supported(filename) {
            job.advance(JobState::Rejected);
            warn!(job_id = %job.id, filename, "rejected before staging: {err}");
            return Err(err);
        }

        // Conversions are cost-intensive against the external backend, so
        // excess jobs wait here instead of all running at once.
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| JobError::Conversion("service is shutting down".into()))?;

        match self.run_job(&mut job, &data).await {
            Ok(paths) => {
                job.advance(JobState::Completed);
                let duration = started.elapsed().as_secs_f64();
                info!(job_id = %job.id, filename, duration, "podcast generated");
                Ok(PodcastResponse {
                    podcast_file: paths.podcast_file,
                    segments_dir: paths.segments_dir,
                    message: "Podcast generated successfully".into(),
                    duration,
                })
            }
            Err(err) => {
                let stage = job.state;
                job.advance(JobState::Failed);
                error!(job_id = %job.id, filename, %stage, "podcast generation failed: {err}");
                Err(err)
            }
        }
    }

    /// Staged section of the job: everything between the temp file coming
    /// into existence and the result paths being known.
    async fn run_job(&self, job: &mut JobRecord, data: &Bytes) -> JobResult<ArtifactPaths> {
        let staged = StagedInput::write(&self.temp_dir, job.id, data).await?;
        job.advance(JobState::Staged);

        job.advance(JobState::Converting);
        let artifact = match timeout(
            self.conversion_timeout,
            self.converter.convert(staged.path()),
        )
        .await
        {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(err)) => return Err(JobError::Conversion(err.to_string())),
            // The converter may keep running remotely; local resources are
            // released regardless.
            Err(_) => return Err(JobError::Timeout(self.conversion_timeout.as_secs())),
        };

        self.layout.locate(&artifact)
        // `staged` drops here on every path and removes the temp file.
    }

    /// Open a final artifact for streaming out.
    ///
    /// Returns the opened file and its length. Unknown names and names that
    /// would resolve outside the final root are both `NotFound`.
    pub async fn open_podcast(&self, name: &str) -> JobResult<(File, u64)> {
        let path = self.layout.resolve_download(name)?;
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                JobError::NotFound(name.to_string())
            } else {
                JobError::Storage(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }
}

/// Check the declared filename against the single recognized extension.
/// Runs before anything touches storage.
fn ensure_supported(filename: &str) -> JobResult<()> {
    let supported = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXT))
        .unwrap_or(false);
    if supported {
        Ok(())
    } else {
        Err(JobError::UnsupportedFormat(filename.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ArtifactLayout {
        ArtifactLayout::new("podcast")
    }

    #[test]
    fn locate_builds_both_paths_from_one_id() {
        let paths = layout()
            .locate(&ArtifactRef(PathBuf::from(
                "podcast/final/podcast_20240101120000.mp3",
            )))
            .unwrap();
        assert_eq!(paths.podcast_file, "podcast/final/podcast_20240101120000.mp3");
        assert_eq!(paths.segments_dir, "podcast/segments/podcast_20240101120000");

        let file_id = paths
            .podcast_file
            .rsplit('/')
            .next()
            .unwrap()
            .strip_prefix("podcast_")
            .unwrap()
            .strip_suffix(".mp3")
            .unwrap();
        let dir_id = paths
            .segments_dir
            .rsplit('/')
            .next()
            .unwrap()
            .strip_prefix("podcast_")
            .unwrap();
        assert_eq!(file_id, dir_id);
    }

    #[test]
    fn locate_rejects_references_off_convention() {
        let cases = [
            "podcast/final/episode_20240101.mp3",
            "podcast/final/podcast_20240101.wav",
            "podcast/final/podcast_.mp3",
            "podcast/final/",
        ];
        for case in cases {
            let err = layout().locate(&ArtifactRef(PathBuf::from(case))).unwrap_err();
            assert!(
                matches!(err, JobError::MalformedArtifactReference(_)),
                "expected malformed reference for {case}"
            );
        }
    }

    #[test]
    fn only_pdf_uploads_are_supported() {
        assert!(ensure_supported("paper.pdf").is_ok());
        assert!(ensure_supported("PAPER.PDF").is_ok());
        assert!(matches!(
            ensure_supported("notes.txt"),
            Err(JobError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ensure_supported("no_extension"),
            Err(JobError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn download_names_cannot_escape_final_root() {
        let layout = layout();
        for name in ["../secret.mp3", "a/b.mp3", "..", "", "x\\y.mp3", "nul\0.mp3"] {
            assert!(
                matches!(layout.resolve_download(name), Err(JobError::NotFound(_))),
                "expected rejection for {name:?}"
            );
        }
        let path = layout.resolve_download("podcast_1.mp3").unwrap();
        assert_eq!(path, PathBuf::from("podcast/final/podcast_1.mp3"));
    }

    #[tokio::test]
    async fn staged_input_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedInput::write(dir.path(), JobId::new(), &Bytes::from_static(b"%PDF-"))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn concurrent_jobs_stage_to_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedInput::write(dir.path(), JobId::new(), &Bytes::from_static(b"a"))
            .await
            .unwrap();
        let b = StagedInput::write(dir.path(), JobId::new(), &Bytes::from_static(b"b"))
            .await
            .unwrap();
        assert_ne!(a.path(), b.path());
    }
}
