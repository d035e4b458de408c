// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sound attachment.
//!
//! The editor never plays or animates sound; it only needs the length of a
//! file to size the timeline and its name for display. Decoding sits behind
//! [`AudioDecoder`]. With the "audio" feature enabled, [`SystemDecoder`]
//! reads the file with rodio; without it, decoding reports itself as
//! unavailable.

use crate::project::FrameScale;
use motion_editor_sequencer::Audio;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while decoding a sound file
#[derive(Debug, Error)]
pub enum AudioError {
    /// File could not be opened
    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be decoded
    #[error("Cannot decode {path:?}: {reason}")]
    Decode {
        /// File that failed
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Built without a decoder
    #[error("Audio decoding not available: compile with --features audio")]
    Unavailable,
}

/// What the editor needs from a decoded sound
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Display name
    pub name: String,
    /// Length in seconds
    pub duration_seconds: f64,
}

/// Sound file decoder
pub trait AudioDecoder {
    /// Decode the file at `path`
    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioError>;
}

/// Merge a decoded sound into the document's sound record.
///
/// The delay of `previous` is kept so that replacing the file does not
/// shift it on the timeline.
pub fn attach(decoded: DecodedAudio, path: &Path, scale: FrameScale, previous: &Audio) -> Audio {
    Audio {
        name: decoded.name,
        path: Some(path.to_path_buf()),
        duration_frames: scale.seconds_to_frames(decoded.duration_seconds),
        delay_frames: previous.delay_frames,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decoder for the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDecoder;

#[cfg(feature = "audio")]
impl AudioDecoder for SystemDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioError> {
        use rodio::Source;
        use std::io::BufReader;

        let file = std::fs::File::open(path)?;
        let source = rodio::Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let duration_seconds = match source.total_duration() {
            Some(duration) => duration.as_secs_f64(),
            None => {
                // Streams without a length header have to be counted
                let rate = f64::from(source.sample_rate()) * f64::from(source.channels());
                let samples = source.count() as f64;
                if rate > 0.0 {
                    samples / rate
                } else {
                    0.0
                }
            }
        };

        tracing::debug!("Decoded {:?}: {:.2}s", path, duration_seconds);
        Ok(DecodedAudio {
            name: display_name(path),
            duration_seconds,
        })
    }
}

#[cfg(not(feature = "audio"))]
impl AudioDecoder for SystemDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioError> {
        tracing::warn!("Cannot decode {:?}: audio feature not enabled", path);
        Err(AudioError::Unavailable)
    }
}
