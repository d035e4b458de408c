// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor commands.
//!
//! A command is a serializable intent. Applying it to the current document
//! and selection yields the next document; whether that result is recorded
//! in the undo history is decided by the caller (see [`Commit`]).

use motion_editor_sequencer::{
    AntennaStart, Document, EditError, Frame, Keyframe, KeyframeKind, KeyframePath, LedStart, Point,
    PolarOffset, SelectionRange,
};
use serde::{Deserialize, Serialize};

/// Whether a dispatched command produces an undo step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Commit {
    /// Record a history entry
    #[default]
    Record,
    /// Intermediate update (e.g. while a slider is dragged); not recorded
    Transient,
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The document rejected the edit
    #[error(transparent)]
    Edit(#[from] EditError),

    /// Command needs a selection
    #[error("Nothing is selected")]
    NoSelection,

    /// Paste with nothing copied
    #[error("Clipboard is empty")]
    EmptyClipboard,
}

/// A field change on a single keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyframeEdit {
    /// Hold flag (LED and head)
    Keep(bool),
    /// LED target color
    LedColor {
        /// Red
        r: u8,
        /// Green
        g: u8,
        /// Blue
        b: u8,
        /// Alpha
        a: f64,
    },
    /// LED start override color
    StartColor {
        /// Red
        r: u8,
        /// Green
        g: u8,
        /// Blue
        b: u8,
        /// Alpha
        a: f64,
    },
    /// Antenna mode: position when true, waveform when false
    AntennaMode(bool),
    /// Antenna target position
    AntennaPosition(f64),
    /// Antenna waveform
    AntennaWave {
        /// Frequency
        frequency: f64,
        /// Amplitude
        amplitude: f64,
    },
    /// Antenna start override
    AntennaStart(AntennaStart),
    /// Head target position
    HeadPosition {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
    /// Head path handle, dragged to an offset from the keyframe
    HeadHandle {
        /// 0 incoming, 1 outgoing
        index: usize,
        /// Horizontal offset
        dx: f64,
        /// Vertical offset
        dy: f64,
    },
    /// Easing curve handle
    EasingHandle {
        /// 0 or 1
        index: usize,
        /// Handle position in editor coordinates
        point: Point,
    },
}

impl KeyframeEdit {
    /// Short name, used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keep(_) => "keep",
            Self::LedColor { .. } => "color",
            Self::StartColor { .. } => "start color",
            Self::AntennaMode(_) => "antenna mode",
            Self::AntennaPosition(_) => "antenna position",
            Self::AntennaWave { .. } => "antenna wave",
            Self::AntennaStart(_) => "antenna start",
            Self::HeadPosition { .. } => "head position",
            Self::HeadHandle { .. } => "head handle",
            Self::EasingHandle { .. } => "easing handle",
        }
    }

    /// Whether this edit applies to keyframes of `kind`
    pub fn supports(&self, kind: KeyframeKind) -> bool {
        match self {
            Self::Keep(_) => matches!(kind, KeyframeKind::Led | KeyframeKind::Head),
            Self::LedColor { .. } | Self::StartColor { .. } => kind == KeyframeKind::Led,
            Self::AntennaMode(_)
            | Self::AntennaPosition(_)
            | Self::AntennaWave { .. }
            | Self::AntennaStart(_) => kind == KeyframeKind::Antenna,
            Self::HeadPosition { .. } | Self::HeadHandle { .. } => kind == KeyframeKind::Head,
            Self::EasingHandle { index, .. } => *index < 2 && kind != KeyframeKind::Antenna,
        }
    }

    /// Apply to a keyframe. Unsupported combinations leave it unchanged.
    pub fn apply(&self, keyframe: &mut Keyframe) {
        match (*self, keyframe) {
            (Self::Keep(keep), Keyframe::Led(kf)) => kf.keep = keep,
            (Self::Keep(keep), Keyframe::Head(kf)) => kf.keep = keep,
            (Self::LedColor { r, g, b, a }, Keyframe::Led(kf)) => {
                kf.r = r;
                kf.g = g;
                kf.b = b;
                kf.a = a.clamp(0.0, 1.0);
            }
            (Self::StartColor { r, g, b, a }, Keyframe::Led(kf)) => {
                kf.start = Some(LedStart {
                    r,
                    g,
                    b,
                    a: a.clamp(0.0, 1.0),
                });
            }
            (Self::AntennaMode(use_position), Keyframe::Antenna(kf)) => kf.use_position = use_position,
            (Self::AntennaPosition(position), Keyframe::Antenna(kf)) => kf.position = position,
            (Self::AntennaWave { frequency, amplitude }, Keyframe::Antenna(kf)) => {
                kf.frequency = frequency;
                kf.amplitude = amplitude;
            }
            (Self::AntennaStart(start), Keyframe::Antenna(kf)) => kf.start = Some(start),
            (Self::HeadPosition { x, y }, Keyframe::Head(kf)) => {
                kf.x = x;
                kf.y = y;
            }
            (Self::HeadHandle { index, dx, dy }, Keyframe::Head(kf)) => {
                if let Some(handle) = kf.handles.get_mut(index) {
                    *handle = PolarOffset::from_offset(dx, dy);
                }
            }
            (Self::EasingHandle { index, point }, keyframe) => {
                if let Some(easing) = keyframe.easing_mut() {
                    easing.set_handle(index, point);
                }
            }
            _ => {}
        }
    }
}

/// Document-changing intents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditCommand {
    /// Insert a keyframe; `None` seeds a default for the track
    AddKeyframe {
        /// Track index
        track: usize,
        /// Frame
        frame: Frame,
        /// Keyframe to insert
        keyframe: Option<Keyframe>,
    },
    /// Move one keyframe, overwriting the destination
    MoveKeyframe {
        /// Track index
        track: usize,
        /// Current frame
        from: Frame,
        /// New frame
        to: Frame,
    },
    /// Delete keyframes on one track
    DeleteKeyframes {
        /// Track index
        track: usize,
        /// Frames to delete
        frames: Vec<Frame>,
    },
    /// Change fields of one keyframe
    EditKeyframe {
        /// Keyframe address
        path: KeyframePath,
        /// Change to apply
        edit: KeyframeEdit,
    },
    /// Add or remove the start override of one keyframe
    ToggleStartOverride {
        /// Keyframe address
        path: KeyframePath,
    },
    /// Link a source track with its followers
    Link {
        /// Source track index
        track: usize,
    },
    /// Unlink a source track from its followers
    Unlink {
        /// Source track index
        track: usize,
    },
    /// Delete every keyframe in the selection rectangle
    DeleteSelection,
    /// Copy the selection rectangle, then delete it
    Cut,
    /// Paste the copy buffer with its top-left cell at the given cell
    Paste {
        /// Top track
        track: usize,
        /// First frame
        frame: Frame,
    },
    /// Change the sound delay
    SetAudioDelay {
        /// Delay in frames
        frames: f64,
    },
    /// Detach the sound
    RemoveAudio,
    /// Start over with an empty document
    Reset,
}

impl EditCommand {
    /// Get a description of this command
    pub fn description(&self) -> &'static str {
        match self {
            Self::AddKeyframe { .. } => "Add keyframe",
            Self::MoveKeyframe { .. } => "Move keyframe",
            Self::DeleteKeyframes { .. } => "Delete keyframes",
            Self::EditKeyframe { .. } => "Edit keyframe",
            Self::ToggleStartOverride { .. } => "Toggle start point",
            Self::Link { .. } => "Link tracks",
            Self::Unlink { .. } => "Unlink tracks",
            Self::DeleteSelection => "Delete selection",
            Self::Cut => "Cut",
            Self::Paste { .. } => "Paste",
            Self::SetAudioDelay { .. } => "Set sound delay",
            Self::RemoveAudio => "Remove sound",
            Self::Reset => "Reset",
        }
    }

    /// Compute the next document. The selection follows the edit where it
    /// makes sense (an added keyframe becomes selected, a pasted block is
    /// selected, a reset clears it).
    pub fn apply(&self, document: &Document, selection: &mut SelectionRange) -> Result<Document, CommandError> {
        let next = match self {
            Self::AddKeyframe { track, frame, keyframe } => {
                let keyframe = match keyframe {
                    Some(keyframe) => *keyframe,
                    None => document.seed_keyframe(*track, *frame)?,
                };
                let next = document.add_keyframe(*track, *frame, keyframe)?;
                selection.select_single(*track, next.clamp_frame(*frame));
                next
            }
            Self::MoveKeyframe { track, from, to } => {
                let next = document.move_keyframe(*track, *from, *to)?;
                selection.move_selected(*track, *from, next.clamp_frame(*to));
                next
            }
            Self::DeleteKeyframes { track, frames } => document.delete_keyframes(*track, frames.iter().copied())?,
            Self::EditKeyframe { path, edit } => {
                let kind = document.track(document.route_track(path.track)?)?.kind();
                if !edit.supports(kind) {
                    return Err(EditError::Unsupported {
                        kind,
                        operation: edit.label(),
                    }
                    .into());
                }
                document.edit_keyframe(*path, |keyframe| edit.apply(keyframe))?
            }
            Self::ToggleStartOverride { path } => document.toggle_start_override(*path)?,
            Self::Link { track } => document.link_track(*track)?,
            Self::Unlink { track } => document.unlink_track(*track)?,
            Self::DeleteSelection => {
                let next = delete_selection(document, selection)?;
                selection.compute_selected_cells(&next);
                next
            }
            Self::Cut => {
                selection.copy(document).ok_or(CommandError::NoSelection)?;
                let next = delete_selection(document, selection)?;
                selection.compute_selected_cells(&next);
                next
            }
            Self::Paste { track, frame } => {
                let buffer = selection.copy_buffer().ok_or(CommandError::EmptyClipboard)?;
                let (width, height) = (buffer.width(), buffer.height());
                let next = document.paste(*track, *frame, buffer)?;
                if width > 0 && height > 0 {
                    let last_frame = next.clamp_frame(frame.saturating_add(width as Frame - 1));
                    let last_track = (track + height - 1).min(next.track_count().saturating_sub(1));
                    selection.start(*frame, *track, Some(last_frame), Some(last_track));
                    selection.compute_selected_cells(&next);
                }
                next
            }
            Self::SetAudioDelay { frames } => document.with_audio_delay(frames.max(0.0)),
            Self::RemoveAudio => document.without_audio(),
            Self::Reset => {
                selection.clear();
                document.reset()
            }
        };

        Ok(next)
    }
}

fn delete_selection(document: &Document, selection: &SelectionRange) -> Result<Document, CommandError> {
    let (Some(start_track), Some(end_track), Some(start_frame), Some(end_frame)) = (
        selection.start_track(),
        selection.end_track(),
        selection.start_frame(),
        selection.end_frame(),
    ) else {
        return Err(CommandError::NoSelection);
    };

    let end_track = end_track.min(document.track_count());
    Ok(document.delete_range(start_track..end_track, start_frame..end_frame)?)
}
