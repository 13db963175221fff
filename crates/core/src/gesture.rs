//! Pointer-driven gesture handling for the timeline: drag on empty space to
//! create a log, drag a bar to move it, drag a bar's edge to resize it.
//!
//! The machine owns no network and mutates no board state. While a drag is in
//! flight it maintains a snapped *preview* range; the authoritative record is
//! untouched until the pointer is released, at which point the machine emits
//! a single outcome for the caller to commit. Renderers draw
//! [`drag_preview`](GestureMachine::drag_preview) for the dragged bar and the
//! canonical record for everything else, which keeps the UI responsive while
//! a commit is awaiting server confirmation.

use chrono::{DateTime, Utc};

use crate::model::{min_span_end, LogId, MemberId, TaskId, TimeLog};
use crate::timeline::{snap_to_grid, DayWindow};

/// A drag shorter than this many pixels is reclassified as a click.
pub const CLICK_THRESHOLD_PX: f64 = 3.0;

/// Width of the resize handle at each end of a bar, in window percent.
pub const EDGE_ZONE_PERCENT: f64 = 2.0;

/// Pointer x-position, both as a percentage along the window (for time
/// conversion) and in raw pixels (for the click threshold).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub percent: f64,
    pub px: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeLeft,
    ResizeRight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    /// Sweeping out a new log on an empty row.
    Selecting {
        member_id: MemberId,
        anchor: DateTime<Utc>,
        cursor: DateTime<Utc>,
    },
    /// Moving or resizing an existing bar.
    Dragging {
        id: LogId,
        member_id: MemberId,
        kind: DragKind,
        origin_px: f64,
        moved: bool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        preview_start: DateTime<Utc>,
        preview_end: DateTime<Utc>,
    },
}

/// What a finished gesture asks the caller to do. Every emitted range has
/// `end > start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Commit a new log for this member.
    Create {
        member_id: MemberId,
        task_id: Option<TaskId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Commit a changed range for an existing log.
    Update {
        id: LogId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The pointer barely moved: open the edit affordance instead.
    Edit { id: LogId },
}

#[derive(Debug)]
pub struct GestureMachine {
    window: DayWindow,
    state: GestureState,
    /// Task to link the next created log to, when the operator picked an
    /// existing active task instead of typing a new title.
    pending_task: Option<TaskId>,
}

impl GestureMachine {
    pub fn new(window: DayWindow) -> Self {
        Self {
            window,
            state: GestureState::Idle,
            pending_task: None,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// The member a gesture is currently editing, if any. Callers use this to
    /// guard snapshot application for that member.
    pub fn editing_member(&self) -> Option<MemberId> {
        match &self.state {
            GestureState::Idle => None,
            GestureState::Selecting { member_id, .. }
            | GestureState::Dragging { member_id, .. } => Some(*member_id),
        }
    }

    /// Link the next created log to an existing task.
    pub fn link_task(&mut self, task: Option<TaskId>) {
        self.pending_task = task;
    }

    /// The normalized selection sweep, for drawing the preview rectangle.
    pub fn selection(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match &self.state {
            GestureState::Selecting { anchor, cursor, .. } => {
                Some((*anchor.min(cursor), *anchor.max(cursor)))
            }
            _ => None,
        }
    }

    /// The dragged bar's provisional range. Renderers draw this for the bar
    /// with the returned id and the canonical record for every other bar.
    pub fn drag_preview(&self) -> Option<(LogId, DateTime<Utc>, DateTime<Utc>)> {
        match &self.state {
            GestureState::Dragging {
                id,
                preview_start,
                preview_end,
                ..
            } => Some((*id, *preview_start, *preview_end)),
            _ => None,
        }
    }

    /// Primary-button press on an empty stretch of a member's row.
    pub fn press_empty(&mut self, member_id: MemberId, p: Pointer) {
        if self.state != GestureState::Idle {
            return;
        }
        let instant = self.snapped_instant(p);
        self.state = GestureState::Selecting {
            member_id,
            anchor: instant,
            cursor: instant,
        };
    }

    /// Primary-button press on an existing bar. `bar_left`/`bar_right` are the
    /// bar's rendered window percentages; a press within the edge zone at
    /// either end starts a resize, anywhere else a move.
    pub fn press_bar(&mut self, log: &TimeLog, bar_left: f64, bar_right: f64, p: Pointer) {
        if self.state != GestureState::Idle {
            return;
        }
        let kind = if p.percent <= bar_left + EDGE_ZONE_PERCENT {
            DragKind::ResizeLeft
        } else if p.percent >= bar_right - EDGE_ZONE_PERCENT {
            DragKind::ResizeRight
        } else {
            DragKind::Move
        };
        self.state = GestureState::Dragging {
            id: log.id,
            member_id: log.member_id,
            kind,
            origin_px: p.px,
            moved: false,
            start: log.start_at,
            end: log.end_at,
            preview_start: log.start_at,
            preview_end: log.end_at,
        };
    }

    pub fn pointer_move(&mut self, p: Pointer) {
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Selecting { cursor, .. } => {
                *cursor = snap_to_grid(self.window.instant_at(p.percent));
            }
            GestureState::Dragging {
                kind,
                origin_px,
                moved,
                start,
                end,
                preview_start,
                preview_end,
                ..
            } => {
                if (p.px - *origin_px).abs() >= CLICK_THRESHOLD_PX {
                    *moved = true;
                }
                let pointer_instant = snap_to_grid(self.window.instant_at(p.percent));
                let (s, e) = drag_range(*kind, *start, *end, pointer_instant);
                *preview_start = s;
                *preview_end = e;
            }
        }
    }

    /// Primary-button release. Returns the committed outcome, or `None` for a
    /// cancelled/empty gesture.
    pub fn release(&mut self, p: Pointer) -> Option<GestureOutcome> {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Idle => None,
            GestureState::Selecting {
                member_id, anchor, ..
            } => {
                let cursor = self.snapped_instant(p);
                let (start, end) = (anchor.min(cursor), anchor.max(cursor));
                if end > start {
                    Some(GestureOutcome::Create {
                        member_id,
                        task_id: self.pending_task.take(),
                        start,
                        end,
                    })
                } else {
                    None
                }
            }
            GestureState::Dragging {
                id,
                kind,
                origin_px,
                moved,
                start,
                end,
                ..
            } => {
                let moved = moved || (p.px - origin_px).abs() >= CLICK_THRESHOLD_PX;
                if !moved {
                    return Some(GestureOutcome::Edit { id });
                }
                let (new_start, new_end) = drag_range(kind, start, end, self.snapped_instant(p));
                Some(GestureOutcome::Update {
                    id,
                    start: new_start,
                    end: new_end,
                })
            }
        }
    }

    /// Abort whatever gesture is in progress.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    fn snapped_instant(&self, p: Pointer) -> DateTime<Utc> {
        snap_to_grid(self.window.instant_at(p.percent))
    }
}

/// Resolve a drag's provisional range from the snapped pointer instant.
///
/// A move keeps the original duration exactly rather than re-deriving it from
/// a second snapped edge, so repeated moves can never shrink a session. A
/// resize moves only the dragged edge; a collapsed result is floored to the
/// minimum span.
fn drag_range(
    kind: DragKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pointer: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match kind {
        DragKind::Move => (pointer, pointer + (end - start)),
        DragKind::ResizeLeft => (pointer, min_span_end(pointer, end)),
        DragKind::ResizeRight => (start, min_span_end(start, pointer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskMeta;
    use chrono::{Duration, NaiveDate};

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(), 9, 18).unwrap()
    }

    fn wall(h: u32, m: u32) -> DateTime<Utc> {
        crate::timeline::day_anchor(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap())
            + Duration::minutes(i64::from(h * 60 + m))
    }

    fn pointer_at(w: &DayWindow, h: u32, m: u32, px: f64) -> Pointer {
        Pointer {
            percent: w.percent_of(wall(h, m)),
            px,
        }
    }

    fn bar(id: LogId, member: MemberId, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeLog {
        TimeLog::new(id, member, 1, start, end, TaskMeta::default()).unwrap()
    }

    #[test]
    fn drag_create_snaps_both_edges() {
        let w = window();
        let mut m = GestureMachine::new(w);
        m.press_empty(3, pointer_at(&w, 9, 5, 0.0));
        m.pointer_move(pointer_at(&w, 9, 30, 40.0));
        let outcome = m.release(pointer_at(&w, 9, 47, 70.0));
        // 09:05 snaps down to 09:00, 09:47 snaps down to 09:45.
        assert_eq!(
            outcome,
            Some(GestureOutcome::Create {
                member_id: 3,
                task_id: None,
                start: wall(9, 0),
                end: wall(9, 45),
            })
        );
        assert!(m.is_idle());
    }

    #[test]
    fn selection_preview_is_normalized_when_sweeping_left() {
        let w = window();
        let mut m = GestureMachine::new(w);
        m.press_empty(1, pointer_at(&w, 14, 0, 100.0));
        m.pointer_move(pointer_at(&w, 12, 0, 60.0));
        assert_eq!(m.selection(), Some((wall(12, 0), wall(14, 0))));
        let outcome = m.release(pointer_at(&w, 12, 0, 60.0));
        assert_eq!(
            outcome,
            Some(GestureOutcome::Create {
                member_id: 1,
                task_id: None,
                start: wall(12, 0),
                end: wall(14, 0),
            })
        );
    }

    #[test]
    fn empty_selection_emits_nothing() {
        let w = window();
        let mut m = GestureMachine::new(w);
        m.press_empty(1, pointer_at(&w, 10, 2, 0.0));
        assert_eq!(m.release(pointer_at(&w, 10, 3, 1.0)), None);
        assert!(m.is_idle());
    }

    #[test]
    fn create_consumes_linked_task() {
        let w = window();
        let mut m = GestureMachine::new(w);
        m.link_task(Some(42));
        m.press_empty(1, pointer_at(&w, 10, 0, 0.0));
        let outcome = m.release(pointer_at(&w, 11, 0, 80.0));
        assert_eq!(
            outcome,
            Some(GestureOutcome::Create {
                member_id: 1,
                task_id: Some(42),
                start: wall(10, 0),
                end: wall(11, 0),
            })
        );
        // Consumed: the next create is unlinked.
        m.press_empty(1, pointer_at(&w, 12, 0, 0.0));
        match m.release(pointer_at(&w, 13, 0, 80.0)) {
            Some(GestureOutcome::Create { task_id, .. }) => assert_eq!(task_id, None),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn move_preserves_duration_exactly() {
        let w = window();
        let mut m = GestureMachine::new(w);
        let log = bar(9, 2, wall(10, 0), wall(11, 30));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        m.press_bar(&log, left, right, Pointer { percent: (left + right) / 2.0, px: 0.0 });
        // Drop where the pointer implies 14:10; snapped start 14:15, end +90min.
        let outcome = m.release(pointer_at(&w, 14, 10, 200.0));
        assert_eq!(
            outcome,
            Some(GestureOutcome::Update {
                id: 9,
                start: wall(14, 15),
                end: wall(15, 45),
            })
        );
    }

    #[test]
    fn edge_press_starts_resize() {
        let w = window();
        let log = bar(5, 1, wall(10, 0), wall(12, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);

        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: left + 0.5, px: 0.0 });
        assert!(matches!(
            m.state(),
            GestureState::Dragging { kind: DragKind::ResizeLeft, .. }
        ));

        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: right - 0.5, px: 0.0 });
        assert!(matches!(
            m.state(),
            GestureState::Dragging { kind: DragKind::ResizeRight, .. }
        ));

        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: (left + right) / 2.0, px: 0.0 });
        assert!(matches!(
            m.state(),
            GestureState::Dragging { kind: DragKind::Move, .. }
        ));
    }

    #[test]
    fn resize_right_moves_only_the_right_edge() {
        let w = window();
        let log = bar(5, 1, wall(10, 0), wall(11, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: right - 0.5, px: 0.0 });
        let outcome = m.release(pointer_at(&w, 12, 20, 90.0));
        assert_eq!(
            outcome,
            Some(GestureOutcome::Update {
                id: 5,
                start: wall(10, 0),
                end: wall(12, 15),
            })
        );
    }

    #[test]
    fn resize_left_past_right_edge_floors_to_min_span() {
        let w = window();
        let log = bar(5, 1, wall(10, 0), wall(11, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: left + 0.5, px: 0.0 });
        let outcome = m.release(pointer_at(&w, 11, 30, 120.0));
        assert_eq!(
            outcome,
            Some(GestureOutcome::Update {
                id: 5,
                start: wall(11, 30),
                end: wall(11, 45),
            })
        );
    }

    #[test]
    fn tiny_drag_is_a_click() {
        let w = window();
        let log = bar(7, 1, wall(10, 0), wall(11, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: (left + right) / 2.0, px: 100.0 });
        m.pointer_move(Pointer { percent: (left + right) / 2.0 + 0.01, px: 101.0 });
        assert_eq!(
            m.release(Pointer { percent: (left + right) / 2.0 + 0.01, px: 102.0 }),
            Some(GestureOutcome::Edit { id: 7 })
        );
    }

    #[test]
    fn preview_tracks_drag_without_touching_canonical_range() {
        let w = window();
        let log = bar(7, 1, wall(10, 0), wall(11, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        let mut m = GestureMachine::new(w);
        m.press_bar(&log, left, right, Pointer { percent: (left + right) / 2.0, px: 0.0 });
        m.pointer_move(pointer_at(&w, 13, 0, 50.0));
        assert_eq!(m.drag_preview(), Some((7, wall(13, 0), wall(14, 0))));
        // The log itself was never mutated.
        assert_eq!(log.start_at, wall(10, 0));
        assert_eq!(m.editing_member(), Some(1));
    }

    #[test]
    fn emitted_updates_always_have_positive_duration() {
        let w = window();
        let log = bar(5, 1, wall(10, 0), wall(11, 0));
        let left = w.percent_of(log.start_at);
        let right = w.percent_of(log.end_at);
        for &(h, m_) in &[(9u32, 0u32), (10, 55), (11, 0), (13, 40), (17, 59)] {
            let mut m = GestureMachine::new(w);
            m.press_bar(&log, left, right, Pointer { percent: left + 0.5, px: 0.0 });
            if let Some(GestureOutcome::Update { start, end, .. }) =
                m.release(pointer_at(&w, h, m_, 50.0))
            {
                assert!(end > start, "collapsed range at {h:02}:{m_:02}");
            }
        }
    }

    #[test]
    fn cancel_returns_to_idle() {
        let w = window();
        let mut m = GestureMachine::new(w);
        m.press_empty(1, pointer_at(&w, 10, 0, 0.0));
        m.cancel();
        assert!(m.is_idle());
        assert_eq!(m.release(pointer_at(&w, 11, 0, 10.0)), None);
    }
}
