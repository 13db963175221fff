//! The state container owning the visible day's board.
//!
//! Every writer (optimistic-commit responses, snapshot polls, push events)
//! funnels through this store, which delegates the actual merge to
//! `timegrid_core::reconcile` and adds the two pieces of shell-level policy:
//! records outside the visible day are dropped before they reach the board,
//! and members with an unconfirmed local edit are protected from wholesale
//! snapshot replacement.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::debug;

use timegrid_api::{DaySnapshot, PushEvent, TimeLogRecord};
use timegrid_core::timeline::canonical_date;
use timegrid_core::{DayBoard, LogId, MemberId, TaskId, TaskMeta, TimeLog};

pub struct TimelineStore {
    date: NaiveDate,
    board: DayBoard,
    editing: HashSet<MemberId>,
    version: u64,
}

/// Handle shared between the poll task, the push task, and the UI shell.
pub type SharedStore = Arc<Mutex<TimelineStore>>;

pub fn shared(store: TimelineStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

impl TimelineStore {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            board: DayBoard::new(),
            editing: HashSet::new(),
            version: 0,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn board(&self) -> &DayBoard {
        &self.board
    }

    /// Bumped on every visible change; renderers compare against their last
    /// seen value instead of diffing the board.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Switch the visible day, discarding the old board. The next poll tick
    /// repopulates it.
    pub fn set_date(&mut self, date: NaiveDate) {
        if self.date == date {
            return;
        }
        self.date = date;
        self.board = DayBoard::new();
        self.version += 1;
    }

    // ── Active-edit guard ─────────────────────────────────────────────────

    pub fn begin_edit(&mut self, member: MemberId) {
        self.editing.insert(member);
    }

    pub fn end_edit(&mut self, member: MemberId) {
        self.editing.remove(&member);
    }

    pub fn is_editing(&self, member: MemberId) -> bool {
        self.editing.contains(&member)
    }

    // ── Writers ───────────────────────────────────────────────────────────

    /// Merge one authoritative record. Returns false (and leaves the board
    /// untouched) when the record's canonical date is not the visible day.
    pub fn apply_record(&mut self, log: TimeLog) -> bool {
        if canonical_date(log.start_at) != self.date {
            debug!(id = log.id, "dropping record outside visible day");
            return false;
        }
        self.board = self.board.merge(log);
        self.version += 1;
        true
    }

    /// Remove one log wherever it lives. No-op if absent.
    pub fn remove(&mut self, id: LogId) {
        self.board = self.board.remove_by_id(id);
        self.version += 1;
    }

    /// Apply a push-channel event.
    ///
    /// Single-record merges always apply, even for a member mid-edit: the
    /// guard only protects against wholesale snapshot replacement, and the
    /// gesture's preview state lives outside the board entirely.
    pub fn apply_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::Created(record) | PushEvent::Updated(record) => {
                self.apply_record(record.into_log());
            }
            PushEvent::Deleted(deleted) => self.remove(deleted.id),
            PushEvent::TaskUpdated(task) => {
                self.board = self.board.update_task_meta(task.id, &task.meta());
                self.version += 1;
            }
            PushEvent::TaskDeleted(deleted) => {
                // Logs are facts about time already spent; deleting the task
                // only severs the status linkage so they stop counting as
                // active or overdue work.
                self.clear_task_meta(deleted.id);
            }
        }
    }

    fn clear_task_meta(&mut self, task_id: TaskId) {
        let affected: Vec<TimeLog> = self
            .board
            .members()
            .flat_map(|(_, seq)| seq.iter())
            .filter(|log| log.task_id == task_id)
            .cloned()
            .collect();
        if affected.is_empty() {
            return;
        }
        for mut log in affected {
            log.task = TaskMeta {
                title: log.task.title.take(),
                ..TaskMeta::default()
            };
            self.board = self.board.merge(log);
        }
        self.version += 1;
    }

    /// Replace the board from a full-day snapshot, member by member.
    ///
    /// Members with an active local edit keep their current sequence so an
    /// unconfirmed optimistic change is never clobbered. Members present
    /// locally but absent from the snapshot are cleared under the same guard.
    pub fn apply_snapshot(&mut self, snapshot: DaySnapshot) {
        let mut seen: HashSet<MemberId> = HashSet::new();
        let mut board = self.board.clone();
        for member in snapshot {
            seen.insert(member.id);
            if self.editing.contains(&member.id) {
                debug!(member = member.id, "skipping snapshot for member mid-edit");
                continue;
            }
            let logs: Vec<TimeLog> = member
                .time_logs
                .into_iter()
                .map(TimeLogRecord::into_log)
                .filter(|log| canonical_date(log.start_at) == self.date)
                .collect();
            board = board.replace_member(member.id, logs);
        }
        let stale: Vec<MemberId> = board
            .member_ids()
            .filter(|m| !seen.contains(m) && !self.editing.contains(m))
            .collect();
        for member in stale {
            board = board.remove_member(member);
        }
        self.board = board;
        self.version += 1;
    }
}
