// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rectangular cell selection over the track grid.
//!
//! A selection is an axis-aligned rectangle of cells (tracks × frames) plus
//! the sparse set of cells in it that actually hold keyframes. While the
//! user drags a selection, the sparse set maps each original frame to its
//! previewed frame; the document itself is only touched when the drag ends.

use crate::document::{Document, KeyframePath};
use crate::keyframe::Keyframe;
use crate::track::Frame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Selected cells per track: original frame to previewed frame
pub type SelectedCells = BTreeMap<usize, BTreeMap<Frame, Frame>>;

/// Dense snapshot of a rectangle. `None` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CopyBuffer {
    rows: Vec<Vec<Option<Keyframe>>>,
}

impl CopyBuffer {
    /// Create a buffer from rows of cells (one row per track)
    pub fn from_rows(rows: Vec<Vec<Option<Keyframe>>>) -> Self {
        Self { rows }
    }

    /// Rows of cells
    pub fn rows(&self) -> &[Vec<Option<Keyframe>>] {
        &self.rows
    }

    /// Number of tracks covered
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of frames covered
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of filled cells
    pub fn keyframe_count(&self) -> usize {
        self.rows.iter().flatten().filter(|cell| cell.is_some()).count()
    }
}

/// Frame-axis grab state of an ongoing drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grab {
    /// Frame the grab point currently sits on
    pub frame: Frame,
    /// Net movement since the grab started
    pub diff: i64,
    /// Sign of the last movement (-1, 0 or 1)
    pub direction: i64,
}

/// One keyframe relocation produced by the end of a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMove {
    /// Track index
    pub track: usize,
    /// Frame before the drag
    pub from: Frame,
    /// Frame after the drag
    pub to: Frame,
}

/// Half-open rectangle of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    start_frame: Frame,
    end_frame: Frame,
    start_track: usize,
    end_track: usize,
}

/// Selection state of the track grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionRange {
    /// Cell the selection was started from
    anchor: Option<(Frame, usize)>,
    rect: Option<Rect>,
    selected: Option<SelectedCells>,
    copy_buffer: Option<CopyBuffer>,
    grab: Option<Grab>,
}

fn span<T: Ord + Copy>(anchor: T, extent: T) -> (T, T) {
    if anchor <= extent {
        (anchor, extent)
    } else {
        (extent, anchor)
    }
}

impl SelectionRange {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a selection at the anchor cell; the extent defaults to the anchor itself
    pub fn start(
        &mut self,
        anchor_frame: Frame,
        anchor_track: usize,
        extent_frame: Option<Frame>,
        extent_track: Option<usize>,
    ) {
        let (start_frame, last_frame) = span(anchor_frame, extent_frame.unwrap_or(anchor_frame));
        let (start_track, last_track) = span(anchor_track, extent_track.unwrap_or(anchor_track));

        self.anchor = Some((anchor_frame, anchor_track));
        self.rect = Some(Rect {
            start_frame,
            end_frame: last_frame + 1,
            start_track,
            end_track: last_track + 1,
        });
    }

    /// Stretch the rectangle from the anchor to a cell. Either axis may be left alone.
    pub fn extend(&mut self, to_frame: Option<Frame>, to_track: Option<usize>) {
        let (Some((anchor_frame, anchor_track)), Some(rect)) = (self.anchor, self.rect.as_mut()) else {
            return;
        };

        if let Some(frame) = to_frame {
            let (start, last) = span(anchor_frame, frame);
            rect.start_frame = start;
            rect.end_frame = last + 1;
        }
        if let Some(track) = to_track {
            let (start, last) = span(anchor_track, track);
            rect.start_track = start;
            rect.end_track = last + 1;
        }
    }

    /// Select a whole track row
    pub fn select_rows(&mut self, track: usize, max_frame: Frame) {
        self.start(0, track, Some(max_frame), None);
    }

    /// Select a whole frame column
    pub fn select_columns(&mut self, frame: Frame, track_count: usize) {
        self.start(frame, 0, None, Some(track_count.saturating_sub(1)));
    }

    /// Select exactly one cell, e.g. a freshly added keyframe
    pub fn select_single(&mut self, track: usize, frame: Frame) {
        self.start(frame, track, None, None);
        let mut cells = BTreeMap::new();
        cells.insert(frame, frame);
        self.selected = Some(BTreeMap::from([(track, cells)]));
    }

    /// Collect the occupied cells inside the rectangle
    pub fn compute_selected_cells(&mut self, document: &Document) {
        self.selected = None;
        let Some(rect) = self.rect else {
            return;
        };

        let mut selected = SelectedCells::new();
        for track_index in rect.start_track..rect.end_track {
            let Ok(track) = document.track(track_index) else {
                break;
            };
            let cells: BTreeMap<Frame, Frame> = track
                .range(rect.start_frame..rect.end_frame)
                .map(|(frame, _)| (frame, frame))
                .collect();
            if !cells.is_empty() {
                selected.insert(track_index, cells);
            }
        }

        if !selected.is_empty() {
            self.selected = Some(selected);
        }
    }

    /// Whether a rectangle is set
    pub fn is_active(&self) -> bool {
        self.rect.is_some()
    }

    /// Whether the cell lies inside the rectangle
    pub fn contains(&self, track: usize, frame: Frame) -> bool {
        self.rect.is_some_and(|rect| {
            (rect.start_track..rect.end_track).contains(&track)
                && (rect.start_frame..rect.end_frame).contains(&frame)
        })
    }

    /// First selected frame
    pub fn start_frame(&self) -> Option<Frame> {
        self.rect.map(|rect| rect.start_frame)
    }

    /// One past the last selected frame
    pub fn end_frame(&self) -> Option<Frame> {
        self.rect.map(|rect| rect.end_frame)
    }

    /// First selected track
    pub fn start_track(&self) -> Option<usize> {
        self.rect.map(|rect| rect.start_track)
    }

    /// One past the last selected track
    pub fn end_track(&self) -> Option<usize> {
        self.rect.map(|rect| rect.end_track)
    }

    /// Width in frames
    pub fn width(&self) -> u32 {
        self.rect.map_or(0, |rect| rect.end_frame - rect.start_frame)
    }

    /// Height in tracks
    pub fn height(&self) -> usize {
        self.rect.map_or(0, |rect| rect.end_track - rect.start_track)
    }

    /// The addressed cell when exactly one cell is selected
    pub fn keyframe_path(&self) -> Option<KeyframePath> {
        let rect = self.rect?;
        (self.width() == 1 && self.height() == 1).then(|| KeyframePath::new(rect.start_track, rect.start_frame))
    }

    /// Sparse selected cells
    pub fn selected(&self) -> Option<&SelectedCells> {
        self.selected.as_ref()
    }

    /// Current grab state
    pub fn grab(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    /// Last copied block
    pub fn copy_buffer(&self) -> Option<&CopyBuffer> {
        self.copy_buffer.as_ref()
    }

    /// Frame a cell is drawn at while a drag is in progress
    pub fn display_frame(&self, track: usize, frame: Frame) -> Frame {
        self.selected
            .as_ref()
            .and_then(|selected| selected.get(&track))
            .and_then(|cells| cells.get(&frame))
            .copied()
            .unwrap_or(frame)
    }

    /// Start dragging the selection from `frame`
    pub fn grab_start(&mut self, frame: Frame) {
        self.grab = Some(Grab {
            frame,
            diff: 0,
            direction: 0,
        });
    }

    /// Follow the cursor to `frame`, updating the rectangle and the previewed cell positions.
    ///
    /// The rectangle never leaves `[0, max_frame]`. Each track is resolved on
    /// its own: cells are visited starting from the one furthest along the
    /// direction of motion, and a cell whose target is taken (by a cell
    /// already placed in this pass, or by an unselected keyframe) steps on
    /// one frame at a time in the direction of motion until it finds a free
    /// frame. A cell that runs out of the frame range keeps its previous
    /// position. When that position has already been handed to another cell,
    /// the whole track keeps its previous preview for this step, so no two
    /// cells ever share a frame.
    ///
    /// Blocked cells deliberately step *along* the motion, not back against
    /// it: a cell at 4 dragged +1 past an unselected keyframe at 5 lands on 6.
    /// Stepping backwards would leave it on its own origin and the drag would
    /// look stuck.
    pub fn drag_move(&mut self, frame: Frame, document: &Document) {
        let (Some(grab), Some(rect)) = (self.grab.as_mut(), self.rect.as_mut()) else {
            return;
        };
        if frame == grab.frame {
            return;
        }

        let max_frame = i64::from(document.max_frame());
        let mut diff = i64::from(frame) - i64::from(grab.frame);
        let direction = diff.signum();
        if i64::from(rect.start_frame) + diff < 0 {
            diff = -i64::from(rect.start_frame);
        }
        if i64::from(rect.end_frame) + diff > max_frame + 1 {
            diff = max_frame + 1 - i64::from(rect.end_frame);
        }

        let shift = |value: Frame| Frame::try_from(i64::from(value) + diff).unwrap_or(value);
        grab.frame = shift(grab.frame);
        grab.diff += diff;
        grab.direction = direction;
        rect.start_frame = shift(rect.start_frame);
        rect.end_frame = shift(rect.end_frame);
        if let Some((anchor_frame, _)) = self.anchor.as_mut() {
            *anchor_frame = shift(*anchor_frame);
        }

        if diff == 0 || direction == 0 {
            return;
        }
        let total = grab.diff;
        let Some(selected) = self.selected.as_mut() else {
            return;
        };

        for (&track_index, cells) in selected.iter_mut() {
            let track = document.track(track_index).ok();
            let occupied = |candidate: i64| {
                Frame::try_from(candidate)
                    .ok()
                    .is_some_and(|frame| !cells.contains_key(&frame) && track.is_some_and(|t| t.contains(frame)))
            };

            let mut order: Vec<(Frame, Frame)> = cells.iter().map(|(&origin, &current)| (origin, current)).collect();
            order.sort_by_key(|&(_, current)| current);
            if direction > 0 {
                order.reverse();
            }

            let mut taken = BTreeSet::new();
            let mut placed = BTreeMap::new();
            let mut stuck = false;
            for (origin, current) in order {
                let mut candidate = i64::from(origin) + total;
                while (0..=max_frame).contains(&candidate) && (taken.contains(&candidate) || occupied(candidate)) {
                    candidate += direction;
                }
                let target = match Frame::try_from(candidate) {
                    Ok(target) if candidate <= max_frame => target,
                    _ => current,
                };
                if !taken.insert(i64::from(target)) {
                    stuck = true;
                    break;
                }
                placed.insert(origin, target);
            }

            if stuck {
                tracing::debug!("Drag step on track {} has no free frames, keeping the previous preview", track_index);
                continue;
            }
            *cells = placed;
        }
    }

    /// Finish a drag. Returns the relocations to apply, empty when the net movement is zero.
    ///
    /// The selected cells are rebased onto their new frames.
    pub fn grab_end(&mut self) -> Vec<CellMove> {
        let Some(grab) = self.grab.take() else {
            return Vec::new();
        };
        let Some(selected) = self.selected.as_mut() else {
            return Vec::new();
        };
        if grab.diff == 0 {
            return Vec::new();
        }

        let mut moves = Vec::new();
        for (&track, cells) in selected.iter_mut() {
            moves.extend(
                cells
                    .iter()
                    .filter(|(from, to)| from != to)
                    .map(|(&from, &to)| CellMove { track, from, to }),
            );
            *cells = cells.values().map(|&to| (to, to)).collect();
        }
        moves
    }

    /// Follow a single keyframe move inside the selected set
    pub fn move_selected(&mut self, track: usize, from: Frame, to: Frame) {
        let Some(cells) = self.selected.as_mut().and_then(|selected| selected.get_mut(&track)) else {
            return;
        };
        if cells.remove(&from).is_some() {
            cells.insert(to, to);
        }
    }

    /// Snapshot the rectangle into the copy buffer
    pub fn copy(&mut self, document: &Document) -> Option<&CopyBuffer> {
        let rect = self.rect?;

        let rows = (rect.start_track..rect.end_track)
            .filter_map(|index| document.track(index).ok())
            .map(|track| {
                (rect.start_frame..rect.end_frame)
                    .map(|frame| track.get(frame).copied())
                    .collect()
            })
            .collect();

        let buffer = CopyBuffer::from_rows(rows);
        tracing::debug!("Copied {} keyframes", buffer.keyframe_count());
        self.copy_buffer = Some(buffer);
        self.copy_buffer.as_ref()
    }

    /// Drop the rectangle, the selected cells and any grab. The copy buffer survives.
    pub fn clear(&mut self) {
        self.anchor = None;
        self.rect = None;
        self.selected = None;
        self.grab = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PLAY_LED_TRACK, RECORD_LED_TRACK};
    use crate::keyframe::LedKeyframe;

    fn led() -> Keyframe {
        Keyframe::Led(LedKeyframe::default())
    }

    fn document_with(track: usize, frames: &[Frame]) -> Document {
        frames.iter().fold(Document::default(), |doc, &frame| doc.add_keyframe(track, frame, led()).unwrap())
    }

    fn cells(range: &SelectionRange, track: usize) -> Vec<(Frame, Frame)> {
        range.selected().unwrap()[&track].iter().map(|(&o, &c)| (o, c)).collect()
    }

    #[test]
    fn test_extend_normalises_against_anchor() {
        let mut range = SelectionRange::new();
        range.start(5, 1, None, None);
        assert_eq!(range.width(), 1);

        range.extend(Some(2), None);
        assert_eq!(range.start_frame(), Some(2));
        assert_eq!(range.end_frame(), Some(6));
        assert_eq!(range.height(), 1);

        range.extend(None, Some(0));
        assert_eq!(range.start_track(), Some(0));
        assert_eq!(range.end_track(), Some(2));

        range.extend(Some(9), None);
        assert_eq!((range.start_frame(), range.end_frame()), (Some(5), Some(10)));
    }

    #[test]
    fn test_keyframe_path_only_for_single_cell() {
        let mut range = SelectionRange::new();
        range.start(3, 2, None, None);
        assert_eq!(range.keyframe_path(), Some(KeyframePath::new(2, 3)));
        range.extend(Some(4), None);
        assert_eq!(range.keyframe_path(), None);
    }

    #[test]
    fn test_selected_cells_are_sparse() {
        let doc = document_with(RECORD_LED_TRACK, &[1, 3, 9]);
        let mut range = SelectionRange::new();
        range.start(0, RECORD_LED_TRACK, Some(5), Some(PLAY_LED_TRACK));
        range.compute_selected_cells(&doc);

        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(1, 1), (3, 3)]);
        assert!(!range.selected().unwrap().contains_key(&PLAY_LED_TRACK));

        range.start(20, RECORD_LED_TRACK, None, None);
        range.compute_selected_cells(&doc);
        assert!(range.selected().is_none());
    }

    #[test]
    fn test_drag_skips_unselected_keyframe() {
        // 2 and 4 selected, 5 occupied but outside the selection
        let doc = document_with(RECORD_LED_TRACK, &[2, 4, 5]);
        let mut range = SelectionRange::new();
        range.start(2, RECORD_LED_TRACK, Some(4), None);
        range.compute_selected_cells(&doc);
        range.grab_start(3);

        range.drag_move(4, &doc);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(2, 3), (4, 6)]);

        range.drag_move(5, &doc);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(2, 4), (4, 6)]);
        assert_eq!(range.display_frame(RECORD_LED_TRACK, 4), 6);
        assert_eq!(range.display_frame(RECORD_LED_TRACK, 5), 5);
    }

    #[test]
    fn test_drag_left_clamps_at_zero() {
        let doc = document_with(RECORD_LED_TRACK, &[1, 2]);
        let mut range = SelectionRange::new();
        range.start(1, RECORD_LED_TRACK, Some(2), None);
        range.compute_selected_cells(&doc);
        range.grab_start(2);

        range.drag_move(0, &doc);
        assert_eq!(range.start_frame(), Some(0));
        assert_eq!(range.grab().unwrap().diff, -1);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_drag_right_clamps_at_max_frame() {
        let doc = document_with(RECORD_LED_TRACK, &[10]).with_max_frame(12);
        let mut range = SelectionRange::new();
        range.start(10, RECORD_LED_TRACK, None, None);
        range.compute_selected_cells(&doc);
        range.grab_start(10);

        range.drag_move(50, &doc);
        assert_eq!(range.end_frame(), Some(13));
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(10, 12)]);
    }

    #[test]
    fn test_blocked_cell_keeps_position() {
        let doc = document_with(RECORD_LED_TRACK, &[10, 12]).with_max_frame(12);
        let mut range = SelectionRange::new();
        range.start(10, RECORD_LED_TRACK, None, None);
        range.compute_selected_cells(&doc);
        range.grab_start(10);

        range.drag_move(12, &doc);
        assert_eq!(range.start_frame(), Some(12));
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(10, 10)]);
        assert!(range.grab_end().is_empty());
    }

    #[test]
    fn test_fallback_never_shares_a_frame() {
        let doc = document_with(RECORD_LED_TRACK, &[0, 1, 2, 3, 7]).with_max_frame(7);
        let mut range = SelectionRange::new();
        range.start(0, RECORD_LED_TRACK, Some(2), None);
        range.compute_selected_cells(&doc);
        range.grab_start(0);

        range.drag_move(3, &doc);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(0, 6), (1, 4), (2, 5)]);

        // Frame 2 would fall back onto 5, which frame 0 just took
        range.drag_move(5, &doc);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(0, 6), (1, 4), (2, 5)]);

        let moves = range.grab_end();
        let moved = doc
            .move_keyframes(RECORD_LED_TRACK, moves.iter().map(|m| (m.from, m.to)))
            .unwrap();
        assert_eq!(moved.keyframe_count(), 5);
        let frames: Vec<Frame> = moved.track(RECORD_LED_TRACK).unwrap().frames().collect();
        assert_eq!(frames, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_drag_sequences_keep_every_keyframe() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = |bound: u32| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % u64::from(bound)) as Frame
        };

        for _ in 0..500 {
            let max_frame = 4 + next(12);
            let keys: Vec<Frame> = (0..=max_frame).filter(|_| next(2) == 0).collect();
            let doc = document_with(RECORD_LED_TRACK, &keys).with_max_frame(max_frame);
            let count = doc.keyframe_count();

            let from = next(max_frame + 1);
            let to = next(max_frame + 1);
            let mut range = SelectionRange::new();
            range.start(from, RECORD_LED_TRACK, Some(to), None);
            range.compute_selected_cells(&doc);
            range.grab_start(next(max_frame + 1));

            for _ in 0..1 + next(5) {
                range.drag_move(next(max_frame + 4), &doc);
                let Some(selected) = range.selected().and_then(|selected| selected.get(&RECORD_LED_TRACK)) else {
                    break;
                };
                let targets: Vec<Frame> = selected.values().copied().collect();
                let unique: BTreeSet<Frame> = targets.iter().copied().collect();
                assert_eq!(unique.len(), targets.len(), "keys {keys:?} targets {targets:?}");
                for target in targets {
                    assert!(target <= max_frame);
                    assert!(
                        selected.contains_key(&target) || !keys.contains(&target),
                        "keys {keys:?} target {target} lands on an unselected keyframe"
                    );
                }
            }

            let moves = range.grab_end();
            let moved = doc
                .move_keyframes(RECORD_LED_TRACK, moves.iter().map(|m| (m.from, m.to)))
                .unwrap();
            assert_eq!(moved.keyframe_count(), count, "keys {keys:?} moves {moves:?}");
        }
    }

    #[test]
    fn test_grab_end_reports_moves() {
        let doc = document_with(RECORD_LED_TRACK, &[2, 4]);
        let mut range = SelectionRange::new();
        range.start(2, RECORD_LED_TRACK, Some(4), None);
        range.compute_selected_cells(&doc);
        range.grab_start(2);
        range.drag_move(4, &doc);

        let moves = range.grab_end();
        assert_eq!(
            moves,
            vec![
                CellMove { track: RECORD_LED_TRACK, from: 2, to: 4 },
                CellMove { track: RECORD_LED_TRACK, from: 4, to: 6 },
            ]
        );
        assert!(range.grab().is_none());
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(4, 4), (6, 6)]);
    }

    #[test]
    fn test_grab_end_without_net_movement() {
        let doc = document_with(RECORD_LED_TRACK, &[2]);
        let mut range = SelectionRange::new();
        range.start(2, RECORD_LED_TRACK, None, None);
        range.compute_selected_cells(&doc);
        range.grab_start(2);
        range.drag_move(5, &doc);
        range.drag_move(2, &doc);

        assert!(range.grab_end().is_empty());
    }

    #[test]
    fn test_copy_is_dense_and_survives_clear() {
        let doc = document_with(RECORD_LED_TRACK, &[1, 3]);
        let mut range = SelectionRange::new();
        range.start(1, RECORD_LED_TRACK, Some(3), Some(PLAY_LED_TRACK));

        let buffer = range.copy(&doc).unwrap().clone();
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.width(), 3);
        assert_eq!(buffer.rows()[0], vec![Some(led()), None, Some(led())]);
        assert_eq!(buffer.rows()[1], vec![None, None, None]);

        range.clear();
        assert!(!range.is_active());
        assert_eq!(range.copy_buffer(), Some(&buffer));
    }

    #[test]
    fn test_move_selected_follows_keyframe() {
        let mut range = SelectionRange::new();
        range.select_single(RECORD_LED_TRACK, 4);
        range.move_selected(RECORD_LED_TRACK, 4, 8);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(8, 8)]);
        range.move_selected(RECORD_LED_TRACK, 1, 2);
        assert_eq!(cells(&range, RECORD_LED_TRACK), vec![(8, 8)]);
    }

    #[test]
    fn test_header_helpers() {
        let mut range = SelectionRange::new();
        range.select_rows(3, 100);
        assert_eq!(range.width(), 101);
        assert!(range.contains(3, 100));
        assert!(!range.contains(2, 0));

        range.select_columns(7, 7);
        assert_eq!(range.height(), 7);
        assert_eq!(range.width(), 1);
    }
}
