// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe timeline model for the Motion Editor.
//!
//! This crate holds everything that describes a robot motion:
//! - Head, antenna and LED keyframe variants
//! - Tracks with fixed variants and link roles
//! - The document and its immutable mutation algebra
//! - Easing curves, including the bisection inversion used for previews
//! - The selection-range engine with drag collision avoidance
//!
//! ## Architecture
//!
//! Documents are plain values. Every edit returns a new [`Document`], which
//! is what lets the editor keep undo snapshots without diffing.

pub mod document;
pub mod easing;
pub mod geometry;
pub mod keyframe;
pub mod selection;
pub mod track;

pub use document::{Audio, Document, EditError, ImportedTrack, KeyframePath};
pub use easing::{gradient, lerp_color, Bezier, Easing, Rgba};
pub use geometry::{Point, PolarOffset};
pub use keyframe::{
    AntennaKeyframe, AntennaStart, HeadKeyframe, Keyframe, KeyframeKind, LedKeyframe, LedStart,
};
pub use selection::{CellMove, CopyBuffer, Grab, SelectedCells, SelectionRange};
pub use track::{Frame, LinkRole, Track};
