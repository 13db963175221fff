//! The timeline reconciliation engine.
//!
//! Three independent writers feed the board: optimistic-commit responses,
//! snapshot polls, and push-channel events. None of them are ordered with
//! respect to each other, so the board converges through a single primitive:
//! an idempotent upsert-by-id that also handles ownership moving between
//! members. Applying the same eventual set of records in any order yields the
//! same board.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{LogId, MemberId, TaskId, TaskMeta, TimeLog};

/// Per-day board state: each member's time logs, ordered ascending by start
/// instant (id ascending breaks ties, so the order is a total one).
///
/// Sequences are held behind `Arc` and every operation returns a new board
/// that shares the sequences it did not touch. A renderer can therefore use
/// pointer equality per member to decide what to redraw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBoard {
    members: BTreeMap<MemberId, Arc<Vec<TimeLog>>>,
}

fn sort_logs(logs: &mut [TimeLog]) {
    logs.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
}

impl DayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from per-member sequences, sorting each.
    pub fn from_members(members: impl IntoIterator<Item = (MemberId, Vec<TimeLog>)>) -> Self {
        let members = members
            .into_iter()
            .map(|(id, mut logs)| {
                sort_logs(&mut logs);
                (id, Arc::new(logs))
            })
            .collect();
        Self { members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.values().all(|logs| logs.is_empty())
    }

    /// Total number of logs across all members.
    pub fn len(&self) -> usize {
        self.members.values().map(|logs| logs.len()).sum()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.members.keys().copied()
    }

    pub fn members(&self) -> impl Iterator<Item = (MemberId, &Arc<Vec<TimeLog>>)> {
        self.members.iter().map(|(id, logs)| (*id, logs))
    }

    pub fn member_logs(&self, member: MemberId) -> Option<&Arc<Vec<TimeLog>>> {
        self.members.get(&member)
    }

    pub fn find(&self, id: LogId) -> Option<&TimeLog> {
        self.members
            .values()
            .find_map(|logs| logs.iter().find(|log| log.id == id))
    }

    pub fn contains(&self, id: LogId) -> bool {
        self.find(id).is_some()
    }

    /// The member currently holding a log id, if any.
    pub fn owner_of(&self, id: LogId) -> Option<MemberId> {
        self.members
            .iter()
            .find(|(_, logs)| logs.iter().any(|log| log.id == id))
            .map(|(member, _)| *member)
    }

    /// Apply one incoming record.
    ///
    /// If the id already lives under a different member it is removed there
    /// first, so a record never exists under two members. Under the target
    /// owner the record replaces any existing entry with the same id,
    /// otherwise it is appended; the touched sequence is then re-sorted.
    /// Applying the same record twice returns a board equal to the first
    /// application, and an application that changes nothing shares every
    /// sequence with `self`.
    #[must_use]
    pub fn merge(&self, incoming: TimeLog) -> Self {
        let prev_owner = self.owner_of(incoming.id);
        if prev_owner == Some(incoming.member_id)
            && self.find(incoming.id) == Some(&incoming)
        {
            return self.clone();
        }

        let mut members = self.members.clone();

        if let Some(owner) = prev_owner {
            if owner != incoming.member_id {
                if let Some(seq) = members.get(&owner) {
                    let remaining: Vec<TimeLog> = seq
                        .iter()
                        .filter(|log| log.id != incoming.id)
                        .cloned()
                        .collect();
                    members.insert(owner, Arc::new(remaining));
                }
            }
        }

        let target = incoming.member_id;
        let mut seq: Vec<TimeLog> = members
            .get(&target)
            .map(|logs| logs.as_ref().clone())
            .unwrap_or_default();
        match seq.iter().position(|log| log.id == incoming.id) {
            Some(pos) => seq[pos] = incoming,
            None => seq.push(incoming),
        }
        sort_logs(&mut seq);
        members.insert(target, Arc::new(seq));

        Self { members }
    }

    /// Strip a log from whichever member holds it. No-op (sharing every
    /// sequence) when the id is absent.
    #[must_use]
    pub fn remove_by_id(&self, id: LogId) -> Self {
        let Some(owner) = self.owner_of(id) else {
            return self.clone();
        };
        let mut members = self.members.clone();
        if let Some(seq) = members.get(&owner) {
            // Removal preserves the sort order.
            let remaining: Vec<TimeLog> =
                seq.iter().filter(|log| log.id != id).cloned().collect();
            members.insert(owner, Arc::new(remaining));
        }
        Self { members }
    }

    /// Replace one member's whole sequence (snapshot application path).
    #[must_use]
    pub fn replace_member(&self, member: MemberId, mut logs: Vec<TimeLog>) -> Self {
        sort_logs(&mut logs);
        let mut members = self.members.clone();
        members.insert(member, Arc::new(logs));
        Self { members }
    }

    /// Drop a member's row entirely.
    #[must_use]
    pub fn remove_member(&self, member: MemberId) -> Self {
        if !self.members.contains_key(&member) {
            return self.clone();
        }
        let mut members = self.members.clone();
        members.remove(&member);
        Self { members }
    }

    /// Rewrite the denormalized task fields on every log referencing a task.
    /// Members without such a log keep their sequence untouched.
    #[must_use]
    pub fn update_task_meta(&self, task_id: TaskId, meta: &TaskMeta) -> Self {
        let mut members = self.members.clone();
        for (member, seq) in &self.members {
            if !seq.iter().any(|log| log.task_id == task_id && log.task != *meta) {
                continue;
            }
            let rewritten: Vec<TimeLog> = seq
                .iter()
                .cloned()
                .map(|mut log| {
                    if log.task_id == task_id {
                        log.task = meta.clone();
                    }
                    log
                })
                .collect();
            members.insert(*member, Arc::new(rewritten));
        }
        Self { members }
    }
}
