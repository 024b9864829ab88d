//! Domain entities mirrored from persistent storage.
//!
//! Records derive `Deserialize` as well as `Serialize` because cached copies
//! round-trip through the cache backend as JSON.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ContentStatus, LessonFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub organisation_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: ContentStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A module row. Top-level modules have `parent_id = None`; submodules point
/// at their parent. The hierarchy never nests deeper than those two levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: Uuid,
    pub course_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub ordering: i32,
    pub status: ContentStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub organisation_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub format: LessonFormat,
    pub ideal_time_minutes: Option<i32>,
    pub free: bool,
    pub status: ContentStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Course↔lesson association row, ordered by `sequence` within its module.
///
/// Carries a denormalized subset of the referenced lesson's display fields so
/// the hierarchy view never needs a second round trip per lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseLessonRecord {
    pub id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub lesson_id: Uuid,
    pub sequence: i32,
    pub status: ContentStatus,
    pub lesson_title: String,
    pub lesson_description: Option<String>,
    pub lesson_format: LessonFormat,
    pub lesson_ideal_time_minutes: Option<i32>,
    pub lesson_free: bool,
    pub created_at: OffsetDateTime,
}
