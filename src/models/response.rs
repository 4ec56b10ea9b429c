//! Response payload returned by the podcast generation endpoint.

use serde::{Deserialize, Serialize};

/// JSON body of a successful `POST /generate-podcast/`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PodcastResponse {
    /// Public path of the final audio file, e.g.
    /// `podcast/final/podcast_20240101120000.mp3`.
    pub podcast_file: String,

    /// Public path of the matching segment directory, e.g.
    /// `podcast/segments/podcast_20240101120000`.
    pub segments_dir: String,

    /// Human-readable status message.
    pub message: String,

    /// Wall-clock seconds from request acceptance to completion.
    pub duration: f64,
}
