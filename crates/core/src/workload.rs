//! Derived per-member state: overdue flags, overlap detection, and load
//! classification. Everything here is pure and recomputed on each render
//! pass; wall-clock time is an explicit argument refreshed by the caller on
//! its own timer, never read from the system clock.

use chrono::{DateTime, Utc};

use crate::model::TimeLog;

/// Ordered workload classification for one member's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadLevel {
    Low,
    Moderate,
    High,
    Overload,
}

impl LoadLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Overload => "overload",
        }
    }
}

impl std::fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberWorkload {
    pub active_count: usize,
    pub overlapping: bool,
    pub level: LoadLevel,
}

/// A log is overdue when its task is not done and its interval ended strictly
/// before `now`.
pub fn is_overdue(log: &TimeLog, now: DateTime<Utc>) -> bool {
    log.is_active() && log.end_at < now
}

/// Whether any two of one member's active logs intersect.
pub fn has_overlap(logs: &[TimeLog]) -> bool {
    let active: Vec<&TimeLog> = logs.iter().filter(|log| log.is_active()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            if a.start_at < b.end_at && b.start_at < a.end_at {
                return true;
            }
        }
    }
    false
}

fn level_for(active_count: usize, overlapping: bool) -> LoadLevel {
    if overlapping {
        return LoadLevel::Overload;
    }
    match active_count {
        0..=1 => LoadLevel::Low,
        2..=3 => LoadLevel::Moderate,
        4..=5 => LoadLevel::High,
        _ => LoadLevel::Overload,
    }
}

/// Classify one member's sequence. Overlap forces [`LoadLevel::Overload`]
/// regardless of count.
pub fn member_workload(logs: &[TimeLog]) -> MemberWorkload {
    let active_count = logs.iter().filter(|log| log.is_active()).count();
    let overlapping = has_overlap(logs);
    MemberWorkload {
        active_count,
        overlapping,
        level: level_for(active_count, overlapping),
    }
}
