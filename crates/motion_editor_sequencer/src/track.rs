// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for the sequencer.

use crate::keyframe::{Keyframe, KeyframeKind};
use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// Discrete timeline position
pub type Frame = u32;

/// How a track takes part in keyframe linking
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkRole {
    /// Not linked to anything
    #[default]
    Independent,
    /// Other tracks may mirror this one
    Source {
        /// Display name of the linked group (e.g. "Cheeks")
        group: String,
    },
    /// Mirrors the source track at this index while linked
    LinkedTo(usize),
}

/// A track of keyframes of one fixed variant
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Track name
    pub name: String,
    /// Variant every keyframe must have
    kind: KeyframeKind,
    /// Link role, fixed at construction
    role: LinkRole,
    /// Whether the link group is currently active
    pub linked: bool,
    /// Keyframes ordered by frame
    keyframes: BTreeMap<Frame, Keyframe>,
}

impl Track {
    /// Create a new independent track
    pub fn new(name: impl Into<String>, kind: KeyframeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            role: LinkRole::Independent,
            linked: false,
            keyframes: BTreeMap::new(),
        }
    }

    /// Set the link role
    pub fn with_role(mut self, role: LinkRole) -> Self {
        self.role = role;
        self
    }

    /// Declared keyframe variant
    pub fn kind(&self) -> KeyframeKind {
        self.kind
    }

    /// Link role
    pub fn role(&self) -> &LinkRole {
        &self.role
    }

    /// Whether other tracks may link to this one
    pub fn is_link_source(&self) -> bool {
        matches!(self.role, LinkRole::Source { .. })
    }

    /// Source index this track follows, if any
    pub fn link_target(&self) -> Option<usize> {
        match self.role {
            LinkRole::LinkedTo(source) => Some(source),
            _ => None,
        }
    }

    /// Whether this track currently mirrors its source
    pub fn is_following(&self) -> bool {
        self.linked && self.link_target().is_some()
    }

    /// Check whether a keyframe fits this track
    pub fn accepts(&self, keyframe: &Keyframe) -> bool {
        keyframe.kind() == self.kind
    }

    /// Insert or overwrite a keyframe. Returns the keyframe back if the variant does not match.
    pub fn insert(&mut self, frame: Frame, keyframe: Keyframe) -> Result<Option<Keyframe>, Keyframe> {
        if !self.accepts(&keyframe) {
            return Err(keyframe);
        }
        Ok(self.keyframes.insert(frame, keyframe))
    }

    /// Remove a keyframe
    pub fn remove(&mut self, frame: Frame) -> Option<Keyframe> {
        self.keyframes.remove(&frame)
    }

    /// Get keyframe at frame (if exists)
    pub fn get(&self, frame: Frame) -> Option<&Keyframe> {
        self.keyframes.get(&frame)
    }

    /// Get mutable keyframe at frame
    pub fn get_mut(&mut self, frame: Frame) -> Option<&mut Keyframe> {
        self.keyframes.get_mut(&frame)
    }

    /// Check if a keyframe exists at frame
    pub fn contains(&self, frame: Frame) -> bool {
        self.keyframes.contains_key(&frame)
    }

    /// Keyframes in ascending frame order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Frame, &Keyframe)> {
        self.keyframes.iter().map(|(&frame, kf)| (frame, kf))
    }

    /// Occupied frames in ascending order
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.keyframes.keys().copied()
    }

    /// Keyframes in a frame range
    pub fn range(&self, frames: impl RangeBounds<Frame>) -> impl DoubleEndedIterator<Item = (Frame, &Keyframe)> {
        self.keyframes.range(frames).map(|(&frame, kf)| (frame, kf))
    }

    /// Closest keyframe strictly before `frame`
    pub fn keyframe_before(&self, frame: Frame) -> Option<(Frame, &Keyframe)> {
        self.range(..frame).next_back()
    }

    /// Frame of the last keyframe
    pub fn last_frame(&self) -> Option<Frame> {
        self.keyframes.keys().next_back().copied()
    }

    /// Get keyframe count
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the track has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Borrow the keyframe map
    pub fn keyframes(&self) -> &BTreeMap<Frame, Keyframe> {
        &self.keyframes
    }

    /// Replace all keyframes. Entries of the wrong variant are dropped and counted.
    pub fn replace_keyframes(&mut self, keyframes: BTreeMap<Frame, Keyframe>) -> usize {
        let before = keyframes.len();
        let kind = self.kind;
        self.keyframes = keyframes.into_iter().filter(|(_, kf)| kf.kind() == kind).collect();
        before - self.keyframes.len()
    }

    /// Remove all keyframes
    pub fn clear(&mut self) {
        self.keyframes.clear();
    }
}
