//! Shared wire types for the timegrid API.
//!
//! This crate is the single source of truth for the request/response shapes
//! exchanged with the persistence service and for the tagged events arriving
//! on the push channel. The in-memory domain model lives in `timegrid-core`;
//! everything here is about field names, timestamp formats, and the
//! legacy/current split of the denormalized task fields.

use serde::{Deserialize, Serialize};

use timegrid_core::min_span_end;

// Re-export core domain types for convenience
pub use timegrid_core::{LogId, MemberId, TaskId, TaskMeta, TaskStatus, TimeLog};

pub mod time;

// ─── Time logs ───────────────────────────────────────────────────────────────

/// Authoritative wire shape of a time log, as returned by mutations, the day
/// snapshot, and `created`/`updated` push events.
///
/// The denormalized task fields exist under two generations of names: the
/// current `task_*` set and the bare legacy set. [`into_log`](Self::into_log)
/// prefers the current name and falls back to the legacy one only when the
/// current is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeLogRecord {
    pub id: LogId,
    pub user_id: MemberId,
    pub task_id: TaskId,
    #[serde(with = "time")]
    pub start_at: chrono::DateTime<chrono::Utc>,
    #[serde(with = "time")]
    pub end_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_progress_rate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_rate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TimeLogRecord {
    /// Convert to the domain model, resolving field precedence and correcting
    /// an invalid range to the minimum viable span rather than dropping the
    /// record.
    pub fn into_log(self) -> TimeLog {
        let start_at = self.start_at;
        let end_at = min_span_end(start_at, self.end_at);
        let corrected = end_at != self.end_at;
        let duration_minutes = match self.duration_minutes {
            Some(minutes) if !corrected && minutes > 0 => minutes,
            _ => (end_at - start_at).num_minutes(),
        };
        TimeLog {
            id: self.id,
            member_id: self.user_id,
            task_id: self.task_id,
            start_at,
            end_at,
            duration_minutes,
            task: TaskMeta {
                title: self.task_title.or(self.title),
                status: self.task_status.or(self.status),
                progress_rate: self.task_progress_rate.or(self.progress_rate),
                tags: self.task_tags.or(self.tags),
            },
        }
    }
}

/// Body of `POST /time-logs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateTimeLogRequest {
    pub user_id: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(with = "time")]
    pub start_at: chrono::DateTime<chrono::Utc>,
    #[serde(with = "time")]
    pub end_at: chrono::DateTime<chrono::Utc>,
}

/// Body of `PATCH /time-logs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateTimeLogRequest {
    #[serde(with = "time")]
    pub start_at: chrono::DateTime<chrono::Utc>,
    #[serde(with = "time")]
    pub end_at: chrono::DateTime<chrono::Utc>,
}

// ─── Day snapshot ────────────────────────────────────────────────────────────

/// One member's row in the day snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberDay {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub time_logs: Vec<TimeLogRecord>,
}

/// Full-state response of `GET /users?date=...`: every member with their
/// time logs for one calendar date in the canonical timezone.
pub type DaySnapshot = Vec<MemberDay>;

// ─── Tasks ───────────────────────────────────────────────────────────────────

/// Task projection carried by task push events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub member_id: MemberId,
    pub title: String,
    pub status: TaskStatus,
    pub progress_rate: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskRecord {
    /// The denormalized fields this task projects onto its logs.
    pub fn meta(&self) -> TaskMeta {
        TaskMeta {
            title: Some(self.title.clone()),
            status: Some(self.status),
            progress_rate: Some(self.progress_rate),
            tags: self.tags.clone(),
        }
    }
}

// ─── Push channel ────────────────────────────────────────────────────────────

/// Payload of `deleted`/`task_deleted` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedRecord {
    pub id: i32,
}

/// Tagged event arriving on the push channel as `{"event": ..., "data": ...}`.
///
/// Frames that fail to parse (non-JSON, missing or unknown `event`) are
/// dropped by the subscriber as noise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    Created(TimeLogRecord),
    Updated(TimeLogRecord),
    Deleted(DeletedRecord),
    TaskUpdated(TaskRecord),
    TaskDeleted(DeletedRecord),
}
