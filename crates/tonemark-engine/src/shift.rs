//! Keeps flags attached to their lines while the document grows or shrinks.
//!
//! The host reports every edit as a [`ChangeEvent`]. Only two facts are
//! used: the new line count and the line where the first changed range
//! starts. Every flag at or after that line moves by the line-count delta.
//! This assumes a single edit region per event, which is what interactive
//! typing, pasting and line deletion produce.

use std::ops::Range;

use crate::markers::{DocumentId, MarkerSet};

/// One content change reported by the host, in 0-based line coordinates.
pub type LineRange = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub document: DocumentId,
    pub new_line_count: usize,
    pub changes: Vec<LineRange>,
}

impl ChangeEvent {
    pub fn new(document: DocumentId, new_line_count: usize, changes: Vec<LineRange>) -> Self {
        Self {
            document,
            new_line_count,
            changes,
        }
    }

    /// Line where the first reported change begins (0 when none was reported)
    pub fn edit_start_line(&self) -> usize {
        self.changes.first().map_or(0, |range| range.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOutcome {
    /// Line count did not change, or it was not known before this event
    Unchanged,
    /// `moved` flags changed line; `merged` flags collapsed onto another one
    Shifted { moved: usize, merged: usize },
}

/// Shift the flags of `set` for a document that now has `new_line_count`
/// lines after an edit beginning at `edit_start`.
///
/// A flag inside a deleted region lands on `edit_start` rather than before
/// it, so no line ever goes negative. Flags that collapse onto the same line
/// are merged.
pub fn apply_line_change(
    set: &mut MarkerSet,
    new_line_count: usize,
    edit_start: usize,
) -> ShiftOutcome {
    let old_line_count = set.line_count();
    if new_line_count == old_line_count {
        return ShiftOutcome::Unchanged;
    }
    set.set_line_count(new_line_count);
    if old_line_count == 0 {
        return ShiftOutcome::Unchanged;
    }

    let delta = new_line_count as i64 - old_line_count as i64;
    let mut moved = 0;
    for line in set.lines_mut().iter_mut().filter(|line| **line >= edit_start) {
        let shifted = shift_line(*line, delta, edit_start);
        if shifted != *line {
            *line = shifted;
            moved += 1;
        }
    }
    let merged = if delta < 0 { set.normalize() } else { 0 };

    log::debug!(
        "{}: {old_line_count} -> {new_line_count} lines from line {edit_start}, {moved} flags moved, {merged} merged",
        set.document()
    );
    ShiftOutcome::Shifted { moved, merged }
}

/// Convenience wrapper taking the host's event as-is.
pub fn apply_change_event(set: &mut MarkerSet, event: &ChangeEvent) -> ShiftOutcome {
    apply_line_change(set, event.new_line_count, event.edit_start_line())
}

fn shift_line(line: usize, delta: i64, floor: usize) -> usize {
    (line as i64).saturating_add(delta).max(floor as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn flags(line_count: usize, lines: &[usize]) -> MarkerSet {
        MarkerSet::with_lines(DocumentId::from("/w/app.py"), line_count, lines.iter().copied())
    }

    #[test]
    fn test_single_line_insert_shifts_following_flags() {
        let mut set = flags(12, &[2, 5, 9]);
        let outcome = apply_line_change(&mut set, 13, 4);
        assert_eq!(set.lines(), &[2, 6, 10]);
        assert_eq!(set.line_count(), 13);
        assert_eq!(outcome, ShiftOutcome::Shifted { moved: 2, merged: 0 });
    }

    #[test]
    fn test_same_line_count_is_noop() {
        let mut set = flags(12, &[2, 5, 9]);
        assert_eq!(apply_line_change(&mut set, 12, 0), ShiftOutcome::Unchanged);
        assert_eq!(set.lines(), &[2, 5, 9]);
    }

    #[test]
    fn test_flag_on_edit_line_moves_with_the_edit() {
        // Enter pressed at the start of a flagged line pushes it down
        let mut set = flags(10, &[3]);
        apply_line_change(&mut set, 11, 3);
        assert_eq!(set.lines(), &[4]);
    }

    #[test]
    fn test_deleting_lines_pulls_flags_up() {
        let mut set = flags(20, &[1, 10, 15]);
        apply_line_change(&mut set, 17, 5);
        assert_eq!(set.lines(), &[1, 7, 12]);
    }

    #[test]
    fn test_flags_inside_deleted_region_collapse_to_edit_start() {
        let mut set = flags(20, &[4, 6, 7, 12]);
        let outcome = apply_line_change(&mut set, 15, 5);
        // 6 and 7 would land before line 5; both floor at 5 and merge
        assert_eq!(set.lines(), &[4, 5, 7]);
        assert_eq!(outcome, ShiftOutcome::Shifted { moved: 3, merged: 1 });
    }

    #[test]
    fn test_large_deletion_never_goes_negative() {
        let mut set = flags(50, &[3, 30]);
        apply_line_change(&mut set, 1, 0);
        assert_eq!(set.lines(), &[0]);
    }

    #[test]
    fn test_unknown_previous_line_count_only_records() {
        let mut set = flags(0, &[2]);
        assert_eq!(apply_line_change(&mut set, 40, 0), ShiftOutcome::Unchanged);
        assert_eq!(set.lines(), &[2]);
        assert_eq!(set.line_count(), 40);
    }

    #[rstest]
    #[case(vec![4..5, 0..1], 4)]
    #[case(vec![], 0)]
    #[case(vec![7..7], 7)]
    fn test_edit_start_uses_first_change(#[case] changes: Vec<LineRange>, #[case] expected: usize) {
        let event = ChangeEvent::new(DocumentId::from("/w/app.py"), 3, changes);
        assert_eq!(event.edit_start_line(), expected);
    }

    #[test]
    fn test_change_event_wrapper() {
        let mut set = flags(12, &[2, 5, 9]);
        let event = ChangeEvent::new(set.document().clone(), 14, vec![4..6]);
        apply_change_event(&mut set, &event);
        assert_eq!(set.lines(), &[2, 7, 11]);
    }

    #[test]
    fn test_shift_preserves_ascending_order() {
        let mut set = flags(100, &[0, 10, 20, 30, 40, 50]);
        for (count, start) in [(103, 15), (90, 2), (91, 45), (60, 0), (61, 61)] {
            apply_line_change(&mut set, count, start);
            assert!(set.lines().windows(2).all(|w| w[0] < w[1]), "{:?}", set.lines());
        }
    }
}
