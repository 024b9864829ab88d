//! Assembled course hierarchy views.
//!
//! `CourseHierarchy` is the tenant-scoped tree of a course's modules,
//! submodules, and lesson slots, without user-specific state. The `Tracked*`
//! counterparts are the same tree overlaid with one user's progress. Both
//! shapes serialize to JSON for the cache.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{LessonFormat, TrackingStatus};

/// A lesson reference inside a module, with the denormalized display fields
/// carried over from the association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSlot {
    pub lesson_id: Uuid,
    pub sequence: i32,
    pub title: String,
    pub description: Option<String>,
    pub format: LessonFormat,
    pub ideal_time_minutes: Option<i32>,
    pub free: bool,
}

/// A module (or submodule) node. `children` is filled exactly one level deep:
/// top-level modules carry their submodules, submodules carry nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ordering: i32,
    pub lessons: Vec<LessonSlot>,
    pub children: Vec<ModuleNode>,
}

impl ModuleNode {
    /// Lessons attached to this node and all of its children.
    pub fn lesson_count(&self) -> u32 {
        let own = self.lessons.len() as u32;
        own + self
            .children
            .iter()
            .map(ModuleNode::lesson_count)
            .sum::<u32>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseHierarchy {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub organisation_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub modules: Vec<ModuleNode>,
}

impl CourseHierarchy {
    /// Flat lesson count over the whole tree.
    pub fn total_lessons(&self) -> u32 {
        self.modules.iter().map(ModuleNode::lesson_count).sum()
    }
}

// ============================================================================
// Tracked views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedLesson {
    pub lesson_id: Uuid,
    pub sequence: i32,
    pub title: String,
    pub description: Option<String>,
    pub format: LessonFormat,
    pub ideal_time_minutes: Option<i32>,
    pub free: bool,
    pub status: TrackingStatus,
    pub progress: u8,
    pub time_spent_secs: i64,
    pub score: Option<f64>,
    pub last_accessed: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedModule {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ordering: i32,
    pub status: TrackingStatus,
    pub progress: u8,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub last_accessed: Option<OffsetDateTime>,
    pub lessons: Vec<TrackedLesson>,
    pub children: Vec<TrackedModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedHierarchy {
    pub course_id: Uuid,
    pub title: String,
    pub status: TrackingStatus,
    pub progress: u8,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub time_spent_secs: i64,
    pub last_accessed: Option<OffsetDateTime>,
    pub modules: Vec<TrackedModule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(seq: i32) -> LessonSlot {
        LessonSlot {
            lesson_id: Uuid::new_v4(),
            sequence: seq,
            title: format!("Lesson {seq}"),
            description: None,
            format: LessonFormat::Video,
            ideal_time_minutes: Some(10),
            free: false,
        }
    }

    fn module(lessons: Vec<LessonSlot>, children: Vec<ModuleNode>) -> ModuleNode {
        ModuleNode {
            id: Uuid::new_v4(),
            title: "Module".to_string(),
            description: None,
            ordering: 0,
            lessons,
            children,
        }
    }

    #[test]
    fn total_lessons_counts_every_level() {
        let hierarchy = CourseHierarchy {
            id: Uuid::new_v4(),
            tenant_id: None,
            organisation_id: None,
            title: "Course".to_string(),
            description: None,
            modules: vec![
                module(vec![slot(1), slot(2)], vec![module(vec![slot(1)], vec![])]),
                module(vec![], vec![]),
            ],
        };

        assert_eq!(hierarchy.total_lessons(), 3);
    }

    #[test]
    fn empty_course_has_zero_lessons() {
        let hierarchy = CourseHierarchy {
            id: Uuid::new_v4(),
            tenant_id: None,
            organisation_id: None,
            title: "Course".to_string(),
            description: None,
            modules: vec![],
        };

        assert_eq!(hierarchy.total_lessons(), 0);
    }
}
