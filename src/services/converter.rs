//! Boundary to the external document-to-audio conversion collaborator.
//!
//! The collaborator is opaque: it takes a staged document path and either
//! produces a final audio file (plus a segment directory alongside it) or
//! fails. Everything about parsing, summarization, and speech synthesis
//! lives behind this one call.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Opaque reference to a finished artifact, as reported by the converter.
///
/// Conceptually a storage location for the final audio file; the service
/// never trusts it blindly and re-derives canonical paths from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef(pub PathBuf);

impl ArtifactRef {
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter process error: {0}")]
    Process(std::io::Error),
    #[error("converter exited with {status}: {detail}")]
    Failed { status: String, detail: String },
    #[error("converter produced no artifact reference")]
    NoOutput,
}

/// One request makes exactly one `convert` call.
///
/// Implementations should honor future cancellation where they can; if the
/// backend cannot be cancelled, the caller still releases its local
/// resources while the remote work runs to completion unobserved.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path) -> Result<ArtifactRef, ConvertError>;
}

/// Converter that shells out to an external program.
///
/// The program receives the staged input path as its final argument and is
/// expected to print the produced final-audio path as the last non-empty
/// line of stdout. `kill_on_drop` ties the child's lifetime to the request:
/// a timeout or client disconnect drops the future and kills the process.
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    /// Build from a whitespace-separated command line, e.g.
    /// `"python3 generate_podcast.py"`.
    pub fn new(cmd: &str) -> Self {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "generate-podcast".into());
        Self {
            program,
            args: parts.collect(),
        }
    }
}

#[async_trait]
impl Converter for CommandConverter {
    async fn convert(&self, input: &Path) -> Result<ArtifactRef, ConvertError> {
        debug!(program = %self.program, input = %input.display(), "invoking converter");

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ConvertError::Process)?;

        // Dropping this future (timeout, client disconnect) kills the child.
        let output = child
            .wait_with_output()
            .await
            .map_err(ConvertError::Process)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_line(&stderr)
                .or_else(|| last_line(&stdout))
                .unwrap_or_else(|| "no diagnostic output".into());
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                detail,
            });
        }

        last_line(&stdout)
            .map(|line| ArtifactRef(PathBuf::from(line)))
            .ok_or(ConvertError::NoOutput)
    }
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .next_back()
        .map(str::to_string)
}
