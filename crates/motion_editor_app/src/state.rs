// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state management.
//!
//! [`EditorState`] owns the document, the grid selection and the undo
//! history, and is the only place where they change together. Pointer
//! drags are explicit sessions: the document is left alone while a
//! selection is dragged and updated once, with one undo step, when the
//! drag ends.

use crate::audio::{self, AudioDecoder, AudioError};
use crate::commands::{CommandError, Commit, EditCommand};
use crate::config::EditorConfig;
use crate::history::{History, HistoryStats};
use crate::project::{self, FrameScale, ProjectFile, TextStore};
use motion_editor_sequencer::{CellMove, Document, Frame, SelectionRange};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

/// Maximum number of recent projects to remember
pub const MAX_RECENT_PROJECTS: usize = 10;

/// Pointer interaction in progress on the track grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragSession {
    /// No drag
    #[default]
    Idle,
    /// Stretching a new selection rectangle
    Selecting,
    /// Moving the selected keyframes
    Moving,
}

/// Main editor state
pub struct EditorState {
    /// Current document
    pub document: Document,

    /// Grid selection and copy buffer
    pub selection: SelectionRange,

    /// Undo/redo history
    history: History<Document>,

    /// Active pointer drag
    drag: DragSession,

    /// Editor settings
    pub config: EditorConfig,

    /// Current project file path
    pub project_path: Option<PathBuf>,

    /// Recent projects list
    pub recent_projects: VecDeque<PathBuf>,
}

impl EditorState {
    /// Create a new editor state with an empty document
    pub fn new(config: EditorConfig) -> Self {
        let document = Document::default().with_max_frame(config.max_frame_index);
        let mut history = History::with_max_depth(config.history_depth);
        history.add("New motion", document.clone());

        Self {
            document,
            selection: SelectionRange::new(),
            history,
            drag: DragSession::Idle,
            config,
            project_path: None,
            recent_projects: VecDeque::new(),
        }
    }

    /// Frame/time conversion in use
    pub fn scale(&self) -> FrameScale {
        self.config.frame_scale()
    }

    /// Apply a command. With [`Commit::Record`] the result becomes an undo step.
    pub fn dispatch(&mut self, command: &EditCommand, commit: Commit) -> Result<(), CommandError> {
        let next = command.apply(&self.document, &mut self.selection)?;
        self.document = next;
        if commit == Commit::Record {
            self.history.add(command.description(), self.document.clone());
        }
        Ok(())
    }

    /// Step back in history. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(document) = self.history.undo() else {
            return false;
        };
        self.document = document.clone();
        self.drag = DragSession::Idle;
        self.selection.clear();
        tracing::debug!("Undo");
        true
    }

    /// Step forward in history. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(document) = self.history.redo() else {
            return false;
        };
        self.document = document.clone();
        self.drag = DragSession::Idle;
        self.selection.clear();
        tracing::debug!("Redo");
        true
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Get history statistics
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// Whether the document differs from the last save
    pub fn needs_save(&self) -> bool {
        self.history.needs_save()
    }

    /// Active drag session
    pub fn drag(&self) -> DragSession {
        self.drag
    }

    fn clamp_cell(&self, track: usize, frame: Frame) -> (usize, Frame) {
        (
            track.min(self.document.track_count().saturating_sub(1)),
            self.document.clamp_frame(frame),
        )
    }

    /// Select the rectangle between two cells
    pub fn select_cells(&mut self, track: usize, frame: Frame, to_track: usize, to_frame: Frame) {
        let (track, frame) = self.clamp_cell(track, frame);
        let (to_track, to_frame) = self.clamp_cell(to_track, to_frame);
        self.selection.clear();
        self.selection.start(frame, track, Some(to_frame), Some(to_track));
        self.selection.compute_selected_cells(&self.document);
    }

    /// Select a whole track
    pub fn select_track(&mut self, track: usize) {
        let (track, _) = self.clamp_cell(track, 0);
        self.selection.clear();
        self.selection.select_rows(track, self.document.max_frame());
        self.selection.compute_selected_cells(&self.document);
    }

    /// Select a frame across all tracks
    pub fn select_frame(&mut self, frame: Frame) {
        let frame = self.document.clamp_frame(frame);
        self.selection.clear();
        self.selection.select_columns(frame, self.document.track_count());
        self.selection.compute_selected_cells(&self.document);
    }

    /// Drop the selection, keeping the copy buffer
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.drag = DragSession::Idle;
    }

    /// Pointer down on a cell. Inside the selection this grabs it for
    /// moving; elsewhere it starts a new selection.
    pub fn begin_drag(&mut self, track: usize, frame: Frame) -> Result<(), CommandError> {
        if self.drag != DragSession::Idle {
            self.end_drag()?;
        }

        let (track, frame) = self.clamp_cell(track, frame);
        if self.selection.contains(track, frame) {
            self.selection.grab_start(frame);
            self.drag = DragSession::Moving;
        } else {
            self.selection.clear();
            self.selection.start(frame, track, None, None);
            self.drag = DragSession::Selecting;
        }
        Ok(())
    }

    /// Pointer moved over a cell during a drag
    pub fn drag_to(&mut self, track: usize, frame: Frame) {
        let (track, frame) = self.clamp_cell(track, frame);
        match self.drag {
            DragSession::Idle => {}
            DragSession::Selecting => self.selection.extend(Some(frame), Some(track)),
            DragSession::Moving => self.selection.drag_move(frame, &self.document),
        }
    }

    /// Pointer released. Returns the number of keyframes moved.
    pub fn end_drag(&mut self) -> Result<usize, CommandError> {
        let session = std::mem::take(&mut self.drag);
        match session {
            DragSession::Idle => Ok(0),
            DragSession::Selecting => {
                self.selection.compute_selected_cells(&self.document);
                Ok(0)
            }
            DragSession::Moving => {
                let moves = self.selection.grab_end();
                if moves.is_empty() {
                    return Ok(0);
                }
                let count = moves.len();
                self.document = self.apply_moves(moves)?;
                self.history.add("Move keyframes", self.document.clone());
                tracing::debug!("Moved {} keyframes", count);
                Ok(count)
            }
        }
    }

    /// Relocate keyframes per track in one step. Cells of a linked
    /// follower are applied to its source unless the source already moved them.
    fn apply_moves(&self, moves: Vec<CellMove>) -> Result<Document, CommandError> {
        let mut by_track: BTreeMap<usize, BTreeMap<Frame, Frame>> = BTreeMap::new();
        for cell in moves {
            let track = self.document.route_track(cell.track)?;
            by_track.entry(track).or_default().entry(cell.from).or_insert(cell.to);
        }

        let mut next = self.document.clone();
        for (track, relocations) in by_track {
            next = next.move_keyframes(track, relocations)?;
        }
        Ok(next)
    }

    /// Copy the selection rectangle. Returns the number of keyframes copied.
    pub fn copy(&mut self) -> Result<usize, CommandError> {
        self.selection
            .copy(&self.document)
            .map(|buffer| buffer.keyframe_count())
            .ok_or(CommandError::NoSelection)
    }

    /// Attach a sound file
    pub fn load_audio(&mut self, decoder: &dyn AudioDecoder, path: &Path) -> Result<(), AudioError> {
        let decoded = decoder.decode(path)?;
        let audio = audio::attach(decoded, path, self.scale(), &self.document.audio);
        tracing::info!("Loaded sound {:?}", audio.name);
        self.document = self.document.with_audio(audio);
        self.history.add("Load sound", self.document.clone());
        Ok(())
    }

    /// Start a new, unsaved project
    pub fn new_project(&mut self) {
        self.document = self.document.reset();
        self.selection = SelectionRange::new();
        self.drag = DragSession::Idle;
        self.history.reset();
        self.history.add("New motion", self.document.clone());
        self.project_path = None;
        tracing::info!("Created new project");
    }

    /// Load a project file. History restarts at the loaded document.
    ///
    /// With a decoder the referenced sound is decoded again to recover its
    /// length; a sound that fails to decode stays referenced with no length.
    pub fn open_project(
        &mut self,
        store: &dyn TextStore,
        path: &Path,
        decoder: Option<&dyn AudioDecoder>,
    ) -> project::Result<()> {
        let file = ProjectFile::load(store, path)?;
        let mut document = file.to_document(&self.document, self.scale(), Some(path));
        if let (Some(decoder), Some(sound)) = (decoder, document.audio.path.clone()) {
            match decoder.decode(&sound) {
                Ok(decoded) => {
                    let audio = audio::attach(decoded, &sound, self.scale(), &document.audio);
                    document = document.with_audio(audio);
                }
                Err(err) => tracing::warn!("Could not reload sound {}: {}", sound.display(), err),
            }
        }
        self.document = document;
        self.selection = SelectionRange::new();
        self.drag = DragSession::Idle;
        self.history.reset();
        self.history.add("Open project", self.document.clone());
        self.project_path = Some(path.to_path_buf());
        self.add_to_recent(path.to_path_buf());
        Ok(())
    }

    /// Save the current document and mark it as saved
    pub fn save_project(&mut self, store: &dyn TextStore, path: &Path) -> project::Result<()> {
        let file = ProjectFile::from_document(&self.document, self.scale(), &self.config.app_version, Some(path))?;
        file.save(store, path)?;
        self.history.set_save_point();
        self.project_path = Some(path.to_path_buf());
        self.add_to_recent(path.to_path_buf());
        Ok(())
    }

    /// Add a project to the recent projects list
    pub fn add_to_recent(&mut self, path: PathBuf) {
        self.recent_projects.retain(|p| p != &path);
        self.recent_projects.push_front(path);
        self.recent_projects.truncate(MAX_RECENT_PROJECTS);
    }

    /// Get the project file name (for window title)
    pub fn project_name(&self) -> String {
        self.project_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|stem| stem.to_str())
            .unwrap_or("Untitled")
            .to_string()
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
