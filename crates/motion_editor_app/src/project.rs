// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project file format.
//!
//! A project is a JSON document with one entry per track. Keyframes are
//! keyed by their time in milliseconds; the body of each keyframe is the
//! plain record for the track's variant. The sound is referenced by a path
//! relative to the project file.

use indexmap::IndexMap;
use motion_editor_sequencer::{
    Audio, Document, Frame, ImportedTrack, Keyframe, KeyframeKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Current project format version
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Project file extension
pub const PROJECT_FILE_EXTENSION: &str = "exme";

/// Errors raised while reading or writing project files
#[derive(Debug, Error)]
pub enum ProjectError {
    /// File could not be read or written
    #[error("Project I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid project document
    #[error("Project JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by a newer editor
    #[error("Project version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

/// Text file access. Lets the editor core run against something other than the disk.
pub trait TextStore {
    /// Read a whole file
    fn read_text(&self, path: &Path) -> std::io::Result<String>;

    /// Replace a whole file
    fn write_text(&self, path: &Path, text: &str) -> std::io::Result<()>;
}

/// [`TextStore`] over the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl TextStore for FsStore {
    fn read_text(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, text: &str) -> std::io::Result<()> {
        std::fs::write(path, text)
    }
}

/// Conversion between grid frames and wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameScale {
    frames_per_second: u32,
}

impl Default for FrameScale {
    fn default() -> Self {
        Self::new(10)
    }
}

impl FrameScale {
    /// Create a scale; zero is treated as one frame per second
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            frames_per_second: frames_per_second.max(1),
        }
    }

    /// Frames per second
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Start time of a frame in whole milliseconds
    pub fn frame_to_ms(&self, frame: Frame) -> u64 {
        let fps = u64::from(self.frames_per_second);
        (u64::from(frame) * 1000 + fps / 2) / fps
    }

    /// Nearest frame to a millisecond time
    pub fn ms_to_frame(&self, ms: f64) -> Frame {
        let frame = (ms * f64::from(self.frames_per_second) / 1000.0).round();
        if frame <= 0.0 {
            0
        } else if frame >= f64::from(Frame::MAX) {
            Frame::MAX
        } else {
            frame as Frame
        }
    }

    /// Frame count as seconds
    pub fn frames_to_seconds(&self, frames: f64) -> f64 {
        frames / f64::from(self.frames_per_second)
    }

    /// Seconds as a (fractional) frame count
    pub fn seconds_to_frames(&self, seconds: f64) -> f64 {
        seconds * f64::from(self.frames_per_second)
    }
}

/// File metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    /// Version of the editor that wrote the file
    #[serde(default)]
    pub app_version: String,
    /// Format version; absent in files from older editors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
}

/// One track in the file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    /// Keyframe bodies keyed by milliseconds
    #[serde(default)]
    pub keyframes: IndexMap<String, Value>,
    /// Link flag; only written for link sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<bool>,
}

/// Sound reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundEntry {
    /// Path relative to the project file; empty when there is no sound
    #[serde(default)]
    pub name: String,
    /// Delay in seconds
    #[serde(default)]
    pub delay: f64,
}

/// The on-disk project document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// File metadata
    #[serde(default)]
    pub metadata: ProjectMetadata,
    /// Tracks in document order
    #[serde(default)]
    pub keyframes_list: Vec<TrackEntry>,
    /// Sound reference
    #[serde(default)]
    pub sound: SoundEntry,
}

fn encode_keyframe(keyframe: &Keyframe) -> serde_json::Result<Value> {
    match keyframe {
        Keyframe::Head(kf) => serde_json::to_value(kf),
        Keyframe::Antenna(kf) => serde_json::to_value(kf),
        Keyframe::Led(kf) => serde_json::to_value(kf),
    }
}

fn decode_keyframe(kind: KeyframeKind, body: Value) -> serde_json::Result<Keyframe> {
    Ok(match kind {
        KeyframeKind::Head => Keyframe::Head(serde_json::from_value(body)?),
        KeyframeKind::Antenna => Keyframe::Antenna(serde_json::from_value(body)?),
        KeyframeKind::Led => Keyframe::Led(serde_json::from_value(body)?),
    })
}

/// Express `path` relative to `base`, walking up with `..` where needed
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let shared = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[shared..] {
        relative.push(part.as_os_str());
    }
    relative
}

impl ProjectFile {
    /// Build the file representation of a document.
    ///
    /// `project_path` is where the file will be written; the sound path is
    /// stored relative to its directory.
    pub fn from_document(
        document: &Document,
        scale: FrameScale,
        app_version: &str,
        project_path: Option<&Path>,
    ) -> Result<Self> {
        let mut keyframes_list = Vec::with_capacity(document.track_count());
        for track in document.tracks() {
            let mut keyframes = IndexMap::with_capacity(track.len());
            for (frame, keyframe) in track.iter() {
                keyframes.insert(scale.frame_to_ms(frame).to_string(), encode_keyframe(keyframe)?);
            }
            keyframes_list.push(TrackEntry {
                keyframes,
                link: track.is_link_source().then_some(track.linked),
            });
        }

        let base = project_path.and_then(Path::parent).unwrap_or_else(|| Path::new(""));
        let name = document
            .audio
            .path
            .as_deref()
            .map(|path| relative_path(path, base).to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            metadata: ProjectMetadata {
                app_version: app_version.to_string(),
                format_version: Some(PROJECT_FORMAT_VERSION),
            },
            keyframes_list,
            sound: SoundEntry {
                name,
                delay: scale.frames_to_seconds(document.audio.delay_frames),
            },
        })
    }

    /// Per-track keyframes for [`Document::import`].
    ///
    /// Bodies that do not decode as the track's variant, and keys that are
    /// not numbers, are skipped with a warning.
    pub fn imported_tracks(&self, document: &Document, scale: FrameScale) -> Vec<ImportedTrack> {
        self.keyframes_list
            .iter()
            .zip(document.tracks())
            .map(|(entry, track)| {
                let mut imported = ImportedTrack {
                    link: entry.link,
                    ..Default::default()
                };
                for (key, body) in &entry.keyframes {
                    let Ok(ms) = key.parse::<f64>() else {
                        tracing::warn!("Skipping keyframe with invalid time {:?} on {}", key, track.name);
                        continue;
                    };
                    match decode_keyframe(track.kind(), body.clone()) {
                        Ok(keyframe) => {
                            imported.keyframes.insert(scale.ms_to_frame(ms), keyframe);
                        }
                        Err(e) => {
                            tracing::warn!("Skipping malformed keyframe at {}ms on {}: {}", key, track.name, e);
                        }
                    }
                }
                imported
            })
            .collect()
    }

    /// Sound metadata resolved against the project location. Duration is unknown until decoded.
    pub fn audio(&self, project_path: Option<&Path>, scale: FrameScale) -> Option<Audio> {
        if self.sound.name.is_empty() {
            return None;
        }

        let base = project_path.and_then(Path::parent).unwrap_or_else(|| Path::new(""));
        let path = base.join(&self.sound.name);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(Audio {
            name,
            path: Some(path),
            duration_frames: 0.0,
            delay_frames: scale.seconds_to_frames(self.sound.delay),
        })
    }

    /// Rebuild a document with the layout of `base`
    pub fn to_document(&self, base: &Document, scale: FrameScale, project_path: Option<&Path>) -> Document {
        base.import(self.imported_tracks(base, scale), self.audio(project_path, scale))
    }

    /// Parse project JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let project: ProjectFile = serde_json::from_str(text)?;

        // Version check
        if let Some(found) = project.metadata.format_version {
            if found > PROJECT_FORMAT_VERSION {
                return Err(ProjectError::UnsupportedVersion {
                    found,
                    supported: PROJECT_FORMAT_VERSION,
                });
            }
        }

        Ok(project)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a project file
    pub fn load(store: &dyn TextStore, path: &Path) -> Result<Self> {
        let project = Self::from_json(&store.read_text(path)?)?;
        tracing::info!("Loaded project from {:?}", path);
        Ok(project)
    }

    /// Save a project file
    pub fn save(&self, store: &dyn TextStore, path: &Path) -> Result<()> {
        store.write_text(path, &self.to_json()?)?;
        tracing::info!("Saved project to {:?}", path);
        Ok(())
    }
}
