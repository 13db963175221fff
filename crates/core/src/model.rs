use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server-assigned identifier of a member (row owner on the board).
pub type MemberId = i32;
/// Server-assigned identifier of a task.
pub type TaskId = i32;
/// Server-assigned identifier of a time log.
pub type LogId = i32;

/// Minimum viable duration of a time log, in minutes.
///
/// Invalid ranges are corrected to this span rather than dropped, both when a
/// resize gesture collapses a bar and when a server record arrives with
/// `end <= start`.
pub const MIN_LOG_MINUTES: i64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("time log must end after it starts: start {start}, end {end}")]
    EndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized task fields carried on a time log so the board renders
/// without a join. All optional: a log freshly linked to a task may arrive
/// before the task projection does.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskMeta {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub progress_rate: Option<i32>,
    pub tags: Option<Vec<String>>,
}

/// One contiguous interval of actual work by one member on one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeLog {
    pub id: LogId,
    pub member_id: MemberId,
    pub task_id: TaskId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Derived: `end_at - start_at`, always positive.
    pub duration_minutes: i64,
    #[serde(default)]
    pub task: TaskMeta,
}

impl TimeLog {
    /// Build a log, rejecting empty or negative ranges before they can reach
    /// the reconciliation engine.
    pub fn new(
        id: LogId,
        member_id: MemberId,
        task_id: TaskId,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        task: TaskMeta,
    ) -> Result<Self, RangeError> {
        if end_at <= start_at {
            return Err(RangeError::EndNotAfterStart {
                start: start_at,
                end: end_at,
            });
        }
        Ok(Self {
            id,
            member_id,
            task_id,
            start_at,
            end_at,
            duration_minutes: (end_at - start_at).num_minutes(),
            task,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }

    /// Active means the underlying task is not done. A log without a status
    /// projection counts as active.
    pub fn is_active(&self) -> bool {
        self.task.status != Some(TaskStatus::Done)
    }
}

/// Correct an end instant so the range keeps the minimum viable span.
///
/// Returns `end` unchanged when the range is already valid.
pub fn min_span_end(start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
    if end <= start {
        start + Duration::minutes(MIN_LOG_MINUTES)
    } else {
        end
    }
}
