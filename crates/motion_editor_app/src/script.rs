// SPDX-License-Identifier: MIT OR Apache-2.0
//! Batch edit scripts.
//!
//! A script is a RON list of steps replayed through [`EditorState`] exactly
//! as pointer and keyboard input would drive it:
//!
//! ```ron
//! Script(steps: [
//!     Edit(AddKeyframe(track: 4, frame: 2, keyframe: None)),
//!     Select(track: 4, frame: 0, to_track: 4, to_frame: 10),
//!     Drag(track: 4, from: 2, to: 5),
//!     Undo,
//! ])
//! ```

use crate::commands::{CommandError, Commit, EditCommand};
use crate::state::EditorState;
use motion_editor_sequencer::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or running a script
#[derive(Debug, Error)]
pub enum ScriptError {
    /// File could not be read
    #[error("Script I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text is not a valid script
    #[error("Script parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A step failed
    #[error("Step {index} failed: {source}")]
    Step {
        /// Zero-based step index
        index: usize,
        /// Underlying error
        source: CommandError,
    },
}

/// One scripted input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Dispatch a command as one undo step
    Edit(EditCommand),
    /// Select the rectangle between two cells
    Select {
        /// Anchor track
        track: usize,
        /// Anchor frame
        frame: Frame,
        /// Opposite track
        to_track: usize,
        /// Opposite frame
        to_frame: Frame,
    },
    /// Select a whole track
    SelectTrack(usize),
    /// Select a frame across all tracks
    SelectFrame(Frame),
    /// Drop the selection
    ClearSelection,
    /// Press on a cell, drag along its track, release
    Drag {
        /// Track pressed on
        track: usize,
        /// Frame pressed on
        from: Frame,
        /// Frame released on
        to: Frame,
    },
    /// Copy the selection
    Copy,
    /// Undo one step
    Undo,
    /// Redo one step
    Redo,
}

/// A sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Steps in order
    pub steps: Vec<ScriptStep>,
}

impl Script {
    /// Parse script text
    pub fn from_ron(content: &str) -> Result<Self, ScriptError> {
        Ok(ron::from_str(content)?)
    }

    /// Load a script file
    pub fn load(path: &std::path::Path) -> Result<Self, ScriptError> {
        Self::from_ron(&std::fs::read_to_string(path)?)
    }

    /// Run every step, stopping at the first failure. Returns the number of steps run.
    pub fn run(&self, state: &mut EditorState) -> Result<usize, ScriptError> {
        for (index, step) in self.steps.iter().enumerate() {
            run_step(state, step).map_err(|source| ScriptError::Step { index, source })?;
        }
        tracing::info!("Ran {} script steps", self.steps.len());
        Ok(self.steps.len())
    }
}

fn run_step(state: &mut EditorState, step: &ScriptStep) -> Result<(), CommandError> {
    tracing::debug!("Script step {:?}", step);
    match step {
        ScriptStep::Edit(command) => state.dispatch(command, Commit::Record)?,
        ScriptStep::Select {
            track,
            frame,
            to_track,
            to_frame,
        } => state.select_cells(*track, *frame, *to_track, *to_frame),
        ScriptStep::SelectTrack(track) => state.select_track(*track),
        ScriptStep::SelectFrame(frame) => state.select_frame(*frame),
        ScriptStep::ClearSelection => state.clear_selection(),
        ScriptStep::Drag { track, from, to } => {
            state.begin_drag(*track, *from)?;
            state.drag_to(*track, *to);
            state.end_drag()?;
        }
        ScriptStep::Copy => {
            state.copy()?;
        }
        ScriptStep::Undo => {
            if !state.undo() {
                tracing::warn!("Nothing to undo");
            }
        }
        ScriptStep::Redo => {
            if !state.redo() {
                tracing::warn!("Nothing to redo");
            }
        }
    }
    Ok(())
}
