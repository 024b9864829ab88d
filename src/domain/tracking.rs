//! Per-user tracking records and the progress derivation rules.
//!
//! Lesson-level records are the only ones read from storage. Module and
//! course progress are derived at read time from the rules below; the sole
//! exception is the persisted lesson counters on a course-level record,
//! which win over a fresh tree count when present.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::TrackingStatus;

/// A lesson is never reported complete from playback position alone; only an
/// explicit completion event may yield 100.
pub const MAX_POSITION_PROGRESS: u8 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonTrackRecord {
    pub lesson_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub status: TrackingStatus,
    /// Playback/read position in `[0, 1]`.
    pub current_position: f64,
    pub time_spent_secs: i64,
    pub score: Option<f64>,
    pub last_accessed: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseTrackRecord {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub status: TrackingStatus,
    /// Persisted counters, preferred over a fresh tree count when present:
    /// they can reflect business rules a naive count misses.
    pub completed_lessons: Option<u32>,
    pub no_of_lessons: Option<u32>,
    pub time_spent_secs: i64,
    pub last_accessed: Option<OffsetDateTime>,
}

/// Percent complete for a single lesson.
pub fn lesson_progress(status: TrackingStatus, current_position: f64) -> u8 {
    if status == TrackingStatus::Completed {
        return 100;
    }
    let clamped = current_position.clamp(0.0, 1.0);
    let rounded = (clamped * 100.0).round() as u8;
    rounded.min(MAX_POSITION_PROGRESS)
}

/// Derived completion for a sibling group of lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    pub progress: u8,
    pub status: TrackingStatus,
}

/// Roll a completed/total pair up into a percentage and status.
///
/// Zero lessons rolls up as `Started` at 0%, never "complete by default".
pub fn rollup(completed_lessons: u32, total_lessons: u32) -> Rollup {
    if total_lessons == 0 {
        return Rollup {
            progress: 0,
            status: TrackingStatus::Started,
        };
    }

    let ratio = f64::from(completed_lessons) / f64::from(total_lessons);
    let progress = ((ratio * 100.0).round() as u8).min(100);
    let status = if progress == 100 {
        TrackingStatus::Completed
    } else if progress > 0 {
        TrackingStatus::Incomplete
    } else {
        TrackingStatus::Started
    };

    Rollup { progress, status }
}

/// Most recent access among a set of optional timestamps.
pub fn latest_access<I>(timestamps: I) -> Option<OffsetDateTime>
where
    I: IntoIterator<Item = Option<OffsetDateTime>>,
{
    timestamps.into_iter().flatten().max()
}
