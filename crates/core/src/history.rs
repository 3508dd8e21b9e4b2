//! Linear undo/redo history for diagram annotation.
//!
//! The history is a list of snapshots plus a cursor. Every edit appends a
//! full snapshot; undo and redo only move the cursor. Editing after an undo
//! drops the redo tail.

use serde::Serialize;

use crate::diagram::Point;

/// Maximum number of snapshots retained; the oldest are discarded first.
pub const MAX_HISTORY_STEPS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationHistory {
    steps: Vec<Vec<Point>>,
    cursor: usize,
}

/// Serializable view of a history's current state.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryState {
    pub points: Vec<Point>,
    pub step: usize,
    pub total_steps: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Default for AnnotationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationHistory {
    /// A history holding a single empty snapshot.
    pub fn new() -> Self {
        Self {
            steps: vec![Vec::new()],
            cursor: 0,
        }
    }

    /// A history whose only snapshot is `points`; nothing can be undone.
    pub fn loaded(points: Vec<Point>) -> Self {
        Self {
            steps: vec![points],
            cursor: 0,
        }
    }

    /// Rebuild a history by replaying `points` one at a time, so every
    /// point after the first `base` is an individually undoable step.
    ///
    /// The first `base` points form the initial snapshot, as do any
    /// earlier points that do not fit in [`MAX_HISTORY_STEPS`].
    pub fn replayed(points: &[Point], base: usize) -> Self {
        let split = points
            .len()
            .saturating_sub(MAX_HISTORY_STEPS - 1)
            .max(base.min(points.len()));
        let mut history = Self::loaded(points[..split].to_vec());
        for point in &points[split..] {
            history.add_point(point.clone());
        }
        history
    }

    /// Points visible at the cursor.
    pub fn current(&self) -> &[Point] {
        &self.steps[self.cursor]
    }

    /// Number of points in the first snapshot, below which undo stops.
    pub fn base_len(&self) -> usize {
        self.steps[0].len()
    }

    pub fn step(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.steps.len()
    }

    /// Append a snapshot after the cursor, discarding any redo tail.
    pub fn push(&mut self, points: Vec<Point>) {
        self.steps.truncate(self.cursor + 1);
        self.steps.push(points);
        self.cursor += 1;

        if self.steps.len() > MAX_HISTORY_STEPS {
            let overflow = self.steps.len() - MAX_HISTORY_STEPS;
            self.steps.drain(..overflow);
            self.cursor -= overflow;
        }
    }

    /// Append a snapshot equal to the current one plus `point`.
    pub fn add_point(&mut self, point: Point) {
        let mut next = self.current().to_vec();
        next.push(point);
        self.push(next);
    }

    /// Move the cursor back one step. Returns `false` at the first step.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Move the cursor forward one step. Returns `false` without a redo tail.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Reset to a single empty snapshot.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            points: self.current().to_vec(),
            step: self.cursor,
            total_steps: self.steps.len(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }
}
