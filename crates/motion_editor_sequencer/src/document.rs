// SPDX-License-Identifier: MIT OR Apache-2.0
//! The motion document and its mutation algebra.
//!
//! Every mutating operation takes `&self` and returns a new [`Document`];
//! the receiver is never modified, so callers can keep old values around as
//! undo snapshots. After each mutation the link invariant is restored: a
//! linked follower always carries a copy of its source's keyframes.

use crate::keyframe::{
    AntennaStart, HeadKeyframe, Keyframe, KeyframeKind, LedStart,
};
use crate::selection::CopyBuffer;
use crate::track::{Frame, LinkRole, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

/// Default last addressable frame
pub const DEFAULT_MAX_FRAME: Frame = 3000;

/// Index of the head track in the default layout
pub const HEAD_TRACK: usize = 0;
/// Index of the antenna track
pub const ANTENNA_TRACK: usize = 1;
/// Index of the left cheek LED (link source)
pub const CHEEK_LEFT_TRACK: usize = 2;
/// Index of the right cheek LED (follows the left cheek)
pub const CHEEK_RIGHT_TRACK: usize = 3;
/// Index of the record LED
pub const RECORD_LED_TRACK: usize = 4;
/// Index of the play LED
pub const PLAY_LED_TRACK: usize = 5;
/// Index of the function LED
pub const FUNCTION_LED_TRACK: usize = 6;

/// Errors raised by document mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// Frame already holds a keyframe
    #[error("Track {track} already has a keyframe at frame {frame}")]
    DuplicateFrame {
        /// Track index
        track: usize,
        /// Occupied frame
        frame: Frame,
    },

    /// Keyframe variant does not match the track
    #[error("Track {track} holds {expected:?} keyframes, got {found:?}")]
    TypeMismatch {
        /// Track index
        track: usize,
        /// Variant the track declares
        expected: KeyframeKind,
        /// Variant that was supplied
        found: KeyframeKind,
    },

    /// No keyframe at the addressed frame
    #[error("Track {track} has no keyframe at frame {frame}")]
    NoKeyframe {
        /// Track index
        track: usize,
        /// Empty frame
        frame: Frame,
    },

    /// Track index outside the document
    #[error("Track index out of range: {0}")]
    TrackOutOfRange(usize),

    /// Link operation on a track that is not a link source
    #[error("Track {0} is not a link source")]
    NotLinkSource(usize),

    /// Link role pointing at something other than a compatible source
    #[error("Track {track} cannot link to track {target}")]
    InvalidLink {
        /// Follower index
        track: usize,
        /// Declared source index
        target: usize,
    },

    /// Operation not available for this keyframe variant
    #[error("{operation} is not supported for {kind:?} keyframes")]
    Unsupported {
        /// Variant
        kind: KeyframeKind,
        /// Operation name
        operation: &'static str,
    },
}

/// Result type for document mutations
pub type Result<T> = std::result::Result<T, EditError>;

/// Single-cell address used by property panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyframePath {
    /// Track index
    pub track: usize,
    /// Frame on that track
    pub frame: Frame,
}

impl KeyframePath {
    /// Create a new path
    pub fn new(track: usize, frame: Frame) -> Self {
        Self { track, frame }
    }
}

/// Sound attached to the motion. Passed through, never animated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Audio {
    /// File name for display
    pub name: String,
    /// Absolute path of the sound file
    pub path: Option<PathBuf>,
    /// Length in frames
    pub duration_frames: f64,
    /// Playback delay in frames
    pub delay_frames: f64,
}

impl Audio {
    /// Whether a sound file is attached
    pub fn is_loaded(&self) -> bool {
        self.path.is_some()
    }
}

/// Keyframes for one track, as read from a project file
#[derive(Debug, Clone, Default)]
pub struct ImportedTrack {
    /// Keyframes keyed by internal frame
    pub keyframes: BTreeMap<Frame, Keyframe>,
    /// Stored link flag (only meaningful for link sources)
    pub link: Option<bool>,
}

/// The full animatable document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Tracks in fixed order
    tracks: Vec<Track>,
    /// Sound metadata
    pub audio: Audio,
    /// Last addressable frame
    max_frame: Frame,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            tracks: default_tracks(),
            audio: Audio::default(),
            max_frame: DEFAULT_MAX_FRAME,
        }
    }
}

/// Head, antenna and the five LED channels
fn default_tracks() -> Vec<Track> {
    vec![
        Track::new("Head", KeyframeKind::Head),
        Track::new("Antenna", KeyframeKind::Antenna),
        Track::new("Left Cheek", KeyframeKind::Led).with_role(LinkRole::Source {
            group: "Cheeks".to_string(),
        }),
        Track::new("Right Cheek", KeyframeKind::Led).with_role(LinkRole::LinkedTo(CHEEK_LEFT_TRACK)),
        Track::new("Record LED", KeyframeKind::Led),
        Track::new("Play LED", KeyframeKind::Led),
        Track::new("Function LED", KeyframeKind::Led),
    ]
}

impl Document {
    /// Create a document from custom tracks, validating link roles
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        for (index, track) in tracks.iter().enumerate() {
            let Some(target) = track.link_target() else {
                continue;
            };
            let valid = target != index
                && tracks
                    .get(target)
                    .is_some_and(|source| source.is_link_source() && source.kind() == track.kind());
            if !valid {
                return Err(EditError::InvalidLink { track: index, target });
            }
        }

        Ok(Self {
            tracks,
            audio: Audio::default(),
            max_frame: DEFAULT_MAX_FRAME,
        })
    }

    /// Set the last addressable frame
    pub fn with_max_frame(mut self, max_frame: Frame) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Last addressable frame
    pub fn max_frame(&self) -> Frame {
        self.max_frame
    }

    /// Clamp a frame into `[0, max_frame]`
    pub fn clamp_frame(&self, frame: Frame) -> Frame {
        frame.min(self.max_frame)
    }

    /// All tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Get a track
    pub fn track(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(EditError::TrackOutOfRange(index))
    }

    fn track_mut(&mut self, index: usize) -> Result<&mut Track> {
        self.tracks.get_mut(index).ok_or(EditError::TrackOutOfRange(index))
    }

    /// Keyframe at a path
    pub fn keyframe(&self, path: KeyframePath) -> Option<&Keyframe> {
        self.tracks.get(path.track)?.get(path.frame)
    }

    /// Whether a keyframe exists at a path
    pub fn has_keyframe(&self, path: KeyframePath) -> bool {
        self.keyframe(path).is_some()
    }

    /// Index that edits addressed to `index` apply to.
    ///
    /// A following track mirrors its source, so edits go to the source.
    pub fn route_track(&self, index: usize) -> Result<usize> {
        let track = self.track(index)?;
        Ok(match track.link_target() {
            Some(source) if track.linked => source,
            _ => index,
        })
    }

    /// [`Document::route_track`] for a single cell
    pub fn route_path(&self, path: KeyframePath) -> Result<KeyframePath> {
        Ok(KeyframePath::new(self.route_track(path.track)?, path.frame))
    }

    /// Default keyframe for a new cell. Head keyframes start at the previous position.
    pub fn seed_keyframe(&self, track: usize, frame: Frame) -> Result<Keyframe> {
        let track = self.track(track)?;
        let seeded = match track.keyframe_before(frame) {
            Some((_, Keyframe::Head(prev))) => Keyframe::Head(HeadKeyframe::at(prev.x, prev.y)),
            _ => track.kind().default_keyframe(),
        };
        Ok(seeded)
    }

    /// Insert a keyframe on an empty frame
    pub fn add_keyframe(&self, track: usize, frame: Frame, keyframe: Keyframe) -> Result<Self> {
        let index = self.route_track(track)?;
        let frame = self.clamp_frame(frame);
        let mut next = self.clone();

        let target = next.track_mut(index)?;
        if target.contains(frame) {
            return Err(EditError::DuplicateFrame { track: index, frame });
        }
        target.insert(frame, keyframe).map_err(|found| EditError::TypeMismatch {
            track: index,
            expected: target.kind(),
            found: found.kind(),
        })?;

        tracing::debug!("Added {:?} keyframe at track {} frame {}", keyframe.kind(), index, frame);
        next.sync_links(index);
        Ok(next)
    }

    /// Move a keyframe. The destination is overwritten if occupied.
    pub fn move_keyframe(&self, track: usize, from: Frame, to: Frame) -> Result<Self> {
        let index = self.route_track(track)?;
        let to = self.clamp_frame(to);
        let mut next = self.clone();

        let target = next.track_mut(index)?;
        let keyframe = target
            .remove(from)
            .ok_or(EditError::NoKeyframe { track: index, frame: from })?;
        target.insert(to, keyframe).map_err(|found| EditError::TypeMismatch {
            track: index,
            expected: target.kind(),
            found: found.kind(),
        })?;

        tracing::debug!("Moved keyframe on track {} from {} to {}", index, from, to);
        next.sync_links(index);
        Ok(next)
    }

    /// Relocate several keyframes of one track together.
    ///
    /// Every source is lifted before any is placed, so moves may chain
    /// through each other's frames.
    pub fn move_keyframes(&self, track: usize, moves: impl IntoIterator<Item = (Frame, Frame)>) -> Result<Self> {
        let index = self.route_track(track)?;
        let max_frame = self.max_frame;
        let mut next = self.clone();

        let target = next.track_mut(index)?;
        let mut lifted = Vec::new();
        for (from, to) in moves {
            let keyframe = target
                .remove(from)
                .ok_or(EditError::NoKeyframe { track: index, frame: from })?;
            lifted.push((to.min(max_frame), keyframe));
        }
        for (to, keyframe) in lifted {
            target.insert(to, keyframe).map_err(|found| EditError::TypeMismatch {
                track: index,
                expected: target.kind(),
                found: found.kind(),
            })?;
        }

        tracing::debug!("Moved keyframes on track {}", index);
        next.sync_links(index);
        Ok(next)
    }

    /// Remove keyframes at the given frames; absent frames are ignored
    pub fn delete_keyframes(&self, track: usize, frames: impl IntoIterator<Item = Frame>) -> Result<Self> {
        let index = self.route_track(track)?;
        let mut next = self.clone();

        let target = next.track_mut(index)?;
        let removed = frames.into_iter().filter(|&frame| target.remove(frame).is_some()).count();

        tracing::debug!("Deleted {} keyframes on track {}", removed, index);
        next.sync_links(index);
        Ok(next)
    }

    /// Apply a field update to one keyframe. The update may not change the variant.
    pub fn edit_keyframe(&self, path: KeyframePath, update: impl FnOnce(&mut Keyframe)) -> Result<Self> {
        let path = self.route_path(path)?;
        let mut next = self.clone();

        let target = next.track_mut(path.track)?;
        let expected = target.kind();
        let keyframe = target.get_mut(path.frame).ok_or(EditError::NoKeyframe {
            track: path.track,
            frame: path.frame,
        })?;

        let mut edited = *keyframe;
        update(&mut edited);
        if edited.kind() != expected {
            return Err(EditError::TypeMismatch {
                track: path.track,
                expected,
                found: edited.kind(),
            });
        }
        *keyframe = edited;

        next.sync_links(path.track);
        Ok(next)
    }

    /// Set a zeroed start override when absent, clear it when present
    pub fn toggle_start_override(&self, path: KeyframePath) -> Result<Self> {
        if let Some(Keyframe::Head(_)) = self.keyframe(self.route_path(path)?) {
            return Err(EditError::Unsupported {
                kind: KeyframeKind::Head,
                operation: "start override",
            });
        }

        self.edit_keyframe(path, |keyframe| match keyframe {
            Keyframe::Led(kf) => {
                kf.start = match kf.start {
                    Some(_) => None,
                    None => Some(LedStart::default()),
                };
            }
            Keyframe::Antenna(kf) => {
                kf.start = match kf.start {
                    Some(_) => None,
                    None => Some(AntennaStart::default()),
                };
            }
            Keyframe::Head(_) => {}
        })
    }

    /// Activate the link group of a source track and mirror its keyframes
    pub fn link_track(&self, source: usize) -> Result<Self> {
        self.set_linked(source, true)
    }

    /// Deactivate the link group of a source track. Followers keep their current keyframes.
    pub fn unlink_track(&self, source: usize) -> Result<Self> {
        self.set_linked(source, false)
    }

    fn set_linked(&self, source: usize, linked: bool) -> Result<Self> {
        if !self.track(source)?.is_link_source() {
            return Err(EditError::NotLinkSource(source));
        }

        let mut next = self.clone();
        for (index, track) in next.tracks.iter_mut().enumerate() {
            if index == source || track.link_target() == Some(source) {
                track.linked = linked;
            }
        }

        tracing::debug!("Track {} linked = {}", source, linked);
        next.sync_links(source);
        Ok(next)
    }

    /// Replace every track's keyframes with imported data.
    ///
    /// Tracks missing from `tracks` end up empty and extra entries are
    /// ignored. Link sources take the stored `link` flag; followers inherit
    /// the flag of their source.
    pub fn import(&self, tracks: Vec<ImportedTrack>, audio: Option<Audio>) -> Self {
        let mut next = Self::default().with_max_frame(self.max_frame);
        next.tracks = self
            .tracks
            .iter()
            .map(|track| {
                let mut fresh = track.clone();
                fresh.clear();
                fresh.linked = false;
                fresh
            })
            .collect();

        if tracks.len() > next.tracks.len() {
            tracing::warn!(
                "Ignoring {} extra tracks in imported motion",
                tracks.len() - next.tracks.len()
            );
        }

        for (track, imported) in next.tracks.iter_mut().zip(tracks) {
            let max_frame = next.max_frame;
            let (in_range, out_of_range): (BTreeMap<_, _>, BTreeMap<_, _>) =
                imported.keyframes.into_iter().partition(|(frame, _)| *frame <= max_frame);
            if !out_of_range.is_empty() {
                tracing::warn!("Dropped {} keyframes past frame {} on {}", out_of_range.len(), max_frame, track.name);
            }

            let skipped = track.replace_keyframes(in_range);
            if skipped > 0 {
                tracing::warn!("Skipped {} mismatched keyframes on {}", skipped, track.name);
            }
            if track.is_link_source() {
                if let Some(link) = imported.link {
                    track.linked = link;
                }
            }
        }

        for index in 0..next.tracks.len() {
            if let Some(source) = next.tracks[index].link_target() {
                let linked = next.tracks[source].linked;
                next.tracks[index].linked = linked;
            }
        }
        for index in 0..next.tracks.len() {
            next.sync_links(index);
        }

        next.audio = audio.unwrap_or_default();
        tracing::info!("Imported motion with {} keyframes", next.keyframe_count());
        next
    }

    /// Empty default document, keeping the frame limit
    pub fn reset(&self) -> Self {
        Self::default().with_max_frame(self.max_frame)
    }

    /// Overlay a copy buffer with its top-left cell at `(at_track, at_frame)`.
    ///
    /// Empty buffer cells delete, filled cells overwrite. Cells whose variant
    /// does not fit the target track, or that fall outside the document, are
    /// skipped. Rows landing on a linked follower are applied to its source:
    /// the source's own row wins, and a follower cell only fills a frame the
    /// source row leaves empty.
    pub fn paste(&self, at_track: usize, at_frame: Frame, buffer: &CopyBuffer) -> Result<Self> {
        let mut rows: Vec<(usize, usize, &Vec<Option<Keyframe>>)> = Vec::new();
        for (row_offset, row) in buffer.rows().iter().enumerate() {
            let addressed = at_track + row_offset;
            match self.route_track(addressed) {
                Ok(index) => rows.push((index, addressed, row)),
                Err(_) => tracing::debug!("Paste row {} falls outside the document", row_offset),
            }
        }
        // Rows addressed to the track itself go first
        rows.sort_by_key(|&(index, addressed, _)| index != addressed);

        let mut cells: BTreeMap<usize, BTreeMap<Frame, Option<Keyframe>>> = BTreeMap::new();
        for (index, _, row) in rows {
            let track = self.track(index)?;
            let overlay = cells.entry(index).or_default();

            for (column, cell) in row.iter().enumerate() {
                let frame = at_frame + column as Frame;
                if frame > self.max_frame {
                    break;
                }
                if let Some(keyframe) = cell {
                    if keyframe.kind() != track.kind() {
                        tracing::debug!("Skipped pasting {:?} keyframe onto {}", keyframe.kind(), track.name);
                        continue;
                    }
                }
                let slot = overlay.entry(frame).or_insert(*cell);
                if slot.is_none() {
                    *slot = *cell;
                }
            }
        }

        let mut next = self.clone();
        for (index, overlay) in cells {
            let target = next.track_mut(index)?;
            for (frame, cell) in overlay {
                match cell {
                    None => {
                        target.remove(frame);
                    }
                    Some(keyframe) => {
                        if target.insert(frame, keyframe).is_err() {
                            tracing::debug!("Skipped pasting {:?} keyframe onto {}", keyframe.kind(), target.name);
                        }
                    }
                }
            }
            next.sync_links(index);
        }

        Ok(next)
    }

    /// Delete every keyframe inside a rectangle of tracks and frames
    pub fn delete_range(&self, tracks: Range<usize>, frames: Range<Frame>) -> Result<Self> {
        let mut next = self.clone();
        for track in tracks {
            next = next.delete_keyframes(track, frames.clone())?;
        }
        Ok(next)
    }

    /// Attach sound metadata
    pub fn with_audio(&self, audio: Audio) -> Self {
        let mut next = self.clone();
        next.audio = audio;
        next
    }

    /// Change the sound delay
    pub fn with_audio_delay(&self, delay_frames: f64) -> Self {
        let mut next = self.clone();
        next.audio.delay_frames = delay_frames;
        next
    }

    /// Remove the sound
    pub fn without_audio(&self) -> Self {
        self.with_audio(Audio::default())
    }

    /// Total number of keyframes across tracks
    pub fn keyframe_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Copy the keyframes of `index` onto every linked follower, if it is an active source
    fn sync_links(&mut self, index: usize) {
        let Some(source) = self.tracks.get(index) else {
            return;
        };
        if !(source.is_link_source() && source.linked) {
            return;
        }

        let keyframes = source.keyframes().clone();
        for track in &mut self.tracks {
            if track.linked && track.link_target() == Some(index) {
                track.replace_keyframes(keyframes.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{AntennaKeyframe, LedKeyframe};

    fn led(r: u8) -> Keyframe {
        Keyframe::Led(LedKeyframe::rgb(r, 0, 0))
    }

    fn frames(doc: &Document, track: usize) -> Vec<Frame> {
        doc.track(track).unwrap().frames().collect()
    }

    #[test]
    fn test_default_layout() {
        let doc = Document::default();
        assert_eq!(doc.track_count(), 7);
        assert_eq!(doc.track(HEAD_TRACK).unwrap().kind(), KeyframeKind::Head);
        assert_eq!(doc.track(ANTENNA_TRACK).unwrap().kind(), KeyframeKind::Antenna);
        assert!(doc.track(CHEEK_LEFT_TRACK).unwrap().is_link_source());
        assert_eq!(doc.track(CHEEK_RIGHT_TRACK).unwrap().link_target(), Some(CHEEK_LEFT_TRACK));
        assert_eq!(doc.track(FUNCTION_LED_TRACK).unwrap().name, "Function LED");
    }

    #[test]
    fn test_new_rejects_chained_links() {
        let tracks = vec![
            Track::new("A", KeyframeKind::Led).with_role(LinkRole::Source { group: "G".into() }),
            Track::new("B", KeyframeKind::Led).with_role(LinkRole::LinkedTo(0)),
            Track::new("C", KeyframeKind::Led).with_role(LinkRole::LinkedTo(1)),
        ];
        assert_eq!(
            Document::new(tracks).unwrap_err(),
            EditError::InvalidLink { track: 2, target: 1 }
        );

        let mixed = vec![
            Track::new("A", KeyframeKind::Head).with_role(LinkRole::Source { group: "G".into() }),
            Track::new("B", KeyframeKind::Led).with_role(LinkRole::LinkedTo(0)),
        ];
        assert!(Document::new(mixed).is_err());
    }

    #[test]
    fn test_mutations_keep_order_and_leave_input() {
        let doc = Document::default();
        let doc1 = doc.add_keyframe(RECORD_LED_TRACK, 8, led(1)).unwrap();
        let doc2 = doc1.add_keyframe(RECORD_LED_TRACK, 3, led(2)).unwrap();
        let doc3 = doc2.add_keyframe(RECORD_LED_TRACK, 5, led(3)).unwrap();
        assert_eq!(frames(&doc3, RECORD_LED_TRACK), vec![3, 5, 8]);
        assert!(doc.track(RECORD_LED_TRACK).unwrap().is_empty());

        let moved = doc3.move_keyframe(RECORD_LED_TRACK, 8, 1).unwrap();
        assert_eq!(frames(&moved, RECORD_LED_TRACK), vec![1, 3, 5]);

        let deleted = moved.delete_keyframes(RECORD_LED_TRACK, [3, 42]).unwrap();
        assert_eq!(frames(&deleted, RECORD_LED_TRACK), vec![1, 5]);
    }

    #[test]
    fn test_add_errors() {
        let doc = Document::default().add_keyframe(PLAY_LED_TRACK, 4, led(1)).unwrap();
        assert_eq!(
            doc.add_keyframe(PLAY_LED_TRACK, 4, led(2)).unwrap_err(),
            EditError::DuplicateFrame { track: PLAY_LED_TRACK, frame: 4 }
        );
        assert_eq!(
            doc.add_keyframe(PLAY_LED_TRACK, 5, AntennaKeyframe::default().into()).unwrap_err(),
            EditError::TypeMismatch {
                track: PLAY_LED_TRACK,
                expected: KeyframeKind::Led,
                found: KeyframeKind::Antenna,
            }
        );
        assert_eq!(doc.add_keyframe(99, 0, led(1)).unwrap_err(), EditError::TrackOutOfRange(99));
    }

    #[test]
    fn test_add_clamps_frame() {
        let doc = Document::default().with_max_frame(100);
        let doc = doc.add_keyframe(PLAY_LED_TRACK, 500, led(1)).unwrap();
        assert_eq!(frames(&doc, PLAY_LED_TRACK), vec![100]);
    }

    #[test]
    fn test_move_overwrites_destination() {
        let doc = Document::default()
            .add_keyframe(PLAY_LED_TRACK, 1, led(1))
            .unwrap()
            .add_keyframe(PLAY_LED_TRACK, 2, led(2))
            .unwrap();
        let moved = doc.move_keyframe(PLAY_LED_TRACK, 1, 2).unwrap();
        assert_eq!(frames(&moved, PLAY_LED_TRACK), vec![2]);
        assert_eq!(moved.keyframe(KeyframePath::new(PLAY_LED_TRACK, 2)), Some(&led(1)));

        assert_eq!(
            moved.move_keyframe(PLAY_LED_TRACK, 1, 3).unwrap_err(),
            EditError::NoKeyframe { track: PLAY_LED_TRACK, frame: 1 }
        );
    }

    #[test]
    fn test_move_keyframes_chains() {
        let doc = Document::default()
            .add_keyframe(PLAY_LED_TRACK, 1, led(1))
            .and_then(|d| d.add_keyframe(PLAY_LED_TRACK, 2, led(2)))
            .unwrap();
        let moved = doc.move_keyframes(PLAY_LED_TRACK, [(1, 2), (2, 3)]).unwrap();
        assert_eq!(frames(&moved, PLAY_LED_TRACK), vec![2, 3]);
        assert_eq!(moved.keyframe(KeyframePath::new(PLAY_LED_TRACK, 2)), Some(&led(1)));
        assert_eq!(moved.keyframe(KeyframePath::new(PLAY_LED_TRACK, 3)), Some(&led(2)));
    }

    #[test]
    fn test_link_propagation() {
        let doc = Document::default()
            .add_keyframe(CHEEK_LEFT_TRACK, 2, led(1))
            .unwrap()
            .add_keyframe(CHEEK_RIGHT_TRACK, 7, led(9))
            .unwrap();
        assert_eq!(frames(&doc, CHEEK_RIGHT_TRACK), vec![7]);

        let linked = doc.link_track(CHEEK_LEFT_TRACK).unwrap();
        assert!(linked.track(CHEEK_RIGHT_TRACK).unwrap().linked);
        assert_eq!(frames(&linked, CHEEK_RIGHT_TRACK), vec![2]);

        let steps = linked
            .add_keyframe(CHEEK_LEFT_TRACK, 5, led(2))
            .and_then(|d| d.move_keyframe(CHEEK_LEFT_TRACK, 2, 3))
            .and_then(|d| d.edit_keyframe(KeyframePath::new(CHEEK_LEFT_TRACK, 3), |kf| {
                if let Keyframe::Led(led) = kf {
                    led.keep = true;
                }
            }))
            .and_then(|d| d.delete_keyframes(CHEEK_LEFT_TRACK, [5]))
            .unwrap();
        assert_eq!(
            steps.track(CHEEK_LEFT_TRACK).unwrap().keyframes(),
            steps.track(CHEEK_RIGHT_TRACK).unwrap().keyframes()
        );
        assert!(steps.keyframe(KeyframePath::new(CHEEK_RIGHT_TRACK, 3)).unwrap().keep());
    }

    #[test]
    fn test_follower_edits_route_to_source() {
        let doc = Document::default().link_track(CHEEK_LEFT_TRACK).unwrap();
        let doc = doc.add_keyframe(CHEEK_RIGHT_TRACK, 4, led(3)).unwrap();
        assert_eq!(frames(&doc, CHEEK_LEFT_TRACK), vec![4]);
        assert_eq!(frames(&doc, CHEEK_RIGHT_TRACK), vec![4]);
    }

    #[test]
    fn test_unlink_keeps_follower_content() {
        let doc = Document::default()
            .link_track(CHEEK_LEFT_TRACK)
            .and_then(|d| d.add_keyframe(CHEEK_LEFT_TRACK, 1, led(1)))
            .and_then(|d| d.unlink_track(CHEEK_LEFT_TRACK))
            .and_then(|d| d.add_keyframe(CHEEK_LEFT_TRACK, 2, led(2)))
            .unwrap();
        assert!(!doc.track(CHEEK_RIGHT_TRACK).unwrap().linked);
        assert_eq!(frames(&doc, CHEEK_LEFT_TRACK), vec![1, 2]);
        assert_eq!(frames(&doc, CHEEK_RIGHT_TRACK), vec![1]);

        assert_eq!(
            doc.link_track(CHEEK_RIGHT_TRACK).unwrap_err(),
            EditError::NotLinkSource(CHEEK_RIGHT_TRACK)
        );
    }

    #[test]
    fn test_edit_cannot_change_variant() {
        let path = KeyframePath::new(PLAY_LED_TRACK, 0);
        let doc = Document::default().add_keyframe(path.track, path.frame, led(1)).unwrap();
        let err = doc
            .edit_keyframe(path, |kf| *kf = Keyframe::Antenna(AntennaKeyframe::default()))
            .unwrap_err();
        assert!(matches!(err, EditError::TypeMismatch { .. }));
    }

    #[test]
    fn test_toggle_start_override() {
        let path = KeyframePath::new(ANTENNA_TRACK, 2);
        let doc = Document::default()
            .add_keyframe(path.track, path.frame, AntennaKeyframe::wave(2.0, 0.5).into())
            .unwrap();
        let on = doc.toggle_start_override(path).unwrap();
        assert_eq!(on.keyframe(path).unwrap().as_antenna().unwrap().start, Some(AntennaStart::default()));
        let off = on.toggle_start_override(path).unwrap();
        assert_eq!(off.keyframe(path).unwrap().as_antenna().unwrap().start, None);

        let head = Document::default()
            .add_keyframe(HEAD_TRACK, 0, HeadKeyframe::default().into())
            .unwrap();
        assert!(matches!(
            head.toggle_start_override(KeyframePath::new(HEAD_TRACK, 0)),
            Err(EditError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_seed_head_keyframe_inherits_position() {
        let doc = Document::default()
            .add_keyframe(HEAD_TRACK, 0, HeadKeyframe::at(12.0, 34.0).into())
            .unwrap();
        let seeded = doc.seed_keyframe(HEAD_TRACK, 10).unwrap();
        assert_eq!(seeded.as_head().unwrap().position(), HeadKeyframe::at(12.0, 34.0).position());
        assert_eq!(doc.seed_keyframe(PLAY_LED_TRACK, 10).unwrap(), Keyframe::Led(LedKeyframe::default()));
    }

    #[test]
    fn test_paste_skips_mismatched_cells() {
        let doc = Document::default()
            .add_keyframe(ANTENNA_TRACK, 11, AntennaKeyframe::default().into())
            .unwrap()
            .add_keyframe(RECORD_LED_TRACK, 12, led(7))
            .unwrap();
        // Two rows: an LED row pasted onto the antenna track, an LED row onto cheek-left
        let buffer = CopyBuffer::from_rows(vec![
            vec![Some(led(1)), None],
            vec![Some(led(2)), Some(led(3))],
        ]);
        let pasted = doc.paste(ANTENNA_TRACK, 10, &buffer).unwrap();

        // Antenna: LED cell skipped, empty cell deletes frame 11
        assert!(pasted.track(ANTENNA_TRACK).unwrap().is_empty());
        assert_eq!(frames(&pasted, CHEEK_LEFT_TRACK), vec![10, 11]);
        assert_eq!(frames(&pasted, RECORD_LED_TRACK), vec![12]);
    }

    #[test]
    fn test_paste_onto_linked_pair_keeps_source_row() {
        let doc = Document::default()
            .link_track(CHEEK_LEFT_TRACK)
            .and_then(|d| d.add_keyframe(CHEEK_LEFT_TRACK, 6, led(5)))
            .unwrap();
        // Copied while the cheeks were unlinked: only the left one had keys
        let buffer = CopyBuffer::from_rows(vec![
            vec![Some(led(1)), None, None],
            vec![None, Some(led(2)), None],
        ]);
        let pasted = doc.paste(CHEEK_LEFT_TRACK, 4, &buffer).unwrap();

        assert_eq!(frames(&pasted, CHEEK_LEFT_TRACK), vec![4, 5]);
        assert_eq!(pasted.keyframe(KeyframePath::new(CHEEK_LEFT_TRACK, 4)), Some(&led(1)));
        assert_eq!(pasted.keyframe(KeyframePath::new(CHEEK_LEFT_TRACK, 5)), Some(&led(2)));
        assert_eq!(
            pasted.track(CHEEK_LEFT_TRACK).unwrap().keyframes(),
            pasted.track(CHEEK_RIGHT_TRACK).unwrap().keyframes()
        );
    }

    #[test]
    fn test_delete_range() {
        let doc = Document::default()
            .add_keyframe(RECORD_LED_TRACK, 1, led(1))
            .and_then(|d| d.add_keyframe(PLAY_LED_TRACK, 2, led(1)))
            .and_then(|d| d.add_keyframe(PLAY_LED_TRACK, 9, led(1)))
            .unwrap();
        let cleared = doc.delete_range(RECORD_LED_TRACK..PLAY_LED_TRACK + 1, 0..5).unwrap();
        assert!(cleared.track(RECORD_LED_TRACK).unwrap().is_empty());
        assert_eq!(frames(&cleared, PLAY_LED_TRACK), vec![9]);
    }

    #[test]
    fn test_import_link_inheritance() {
        let mut cheek = ImportedTrack::default();
        cheek.keyframes.insert(3, led(5));
        cheek.link = Some(true);
        let mut wrong = ImportedTrack::default();
        wrong.keyframes.insert(1, led(1));

        let tracks = vec![
            ImportedTrack::default(),
            wrong,
            cheek,
            ImportedTrack::default(),
        ];
        let doc = Document::default()
            .add_keyframe(FUNCTION_LED_TRACK, 1, led(1))
            .unwrap()
            .import(tracks, None);

        assert!(doc.track(ANTENNA_TRACK).unwrap().is_empty());
        assert!(doc.track(CHEEK_LEFT_TRACK).unwrap().linked);
        assert!(doc.track(CHEEK_RIGHT_TRACK).unwrap().linked);
        assert_eq!(frames(&doc, CHEEK_RIGHT_TRACK), vec![3]);
        assert!(doc.track(FUNCTION_LED_TRACK).unwrap().is_empty());
    }

    #[test]
    fn test_reset_keeps_frame_limit() {
        let doc = Document::default()
            .with_max_frame(50)
            .add_keyframe(HEAD_TRACK, 1, HeadKeyframe::default().into())
            .unwrap();
        let reset = doc.reset();
        assert_eq!(reset.keyframe_count(), 0);
        assert_eq!(reset.max_frame(), 50);
    }
}
