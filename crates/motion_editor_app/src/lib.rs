// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion Editor - editing session, project files and device export
//!
//! Builds on `motion_editor_sequencer` and adds what an editing session
//! needs around the document:
//! - Commands with explicit history commit control
//! - Undo/redo with a save point
//! - Drag sessions on the track grid
//! - Project files (JSON) and editor settings (RON)
//! - Conversion to the device motion format
//! - Collaborator traits for file access, audio decoding and remote rooms

pub mod audio;
pub mod commands;
pub mod config;
pub mod export;
pub mod history;
pub mod project;
pub mod remote;
pub mod script;
pub mod state;

pub use commands::{CommandError, Commit, EditCommand, KeyframeEdit};
pub use config::EditorConfig;
pub use export::{convert, ExportDocument};
pub use history::History;
pub use project::{FrameScale, FsStore, ProjectFile, TextStore};
pub use script::{Script, ScriptStep};
pub use state::{DragSession, EditorState};
