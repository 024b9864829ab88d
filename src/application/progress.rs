//! Per-user tracking overlay.
//!
//! Takes an assembled hierarchy and one user's tracking records and derives
//! status and percentage at every level. Lesson records are loaded once per
//! overlay and indexed by lesson id; module and course values are derived,
//! never read from storage, with the one exception of the persisted lesson
//! counters on a course-level record, which win over a fresh tree count.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::hierarchy::HierarchyService;
use crate::application::repos::{CourseTrackingRepo, LessonTrackingRepo, TenantScope};
use crate::cache::{self, CacheStore, EntityKind};
use crate::domain::hierarchy::{
    CourseHierarchy, LessonSlot, ModuleNode, TrackedHierarchy, TrackedLesson, TrackedModule,
};
use crate::domain::tracking::{LessonTrackRecord, latest_access, lesson_progress, rollup};
use crate::domain::types::TrackingStatus;

const SOURCE: &str = "application::progress::ProgressService";

#[derive(Clone)]
pub struct ProgressService {
    course_tracking: Arc<dyn CourseTrackingRepo>,
    lesson_tracking: Arc<dyn LessonTrackingRepo>,
    hierarchy: HierarchyService,
    cache: Arc<CacheStore>,
}

impl ProgressService {
    pub fn new(
        course_tracking: Arc<dyn CourseTrackingRepo>,
        lesson_tracking: Arc<dyn LessonTrackingRepo>,
        hierarchy: HierarchyService,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            course_tracking,
            lesson_tracking,
            hierarchy,
            cache,
        }
    }

    /// Cached tracked view for one user: assemble (through the hierarchy
    /// cache), overlay, write back under the user-suffixed key.
    pub async fn tracked_hierarchy(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        scope: &TenantScope,
    ) -> Result<TrackedHierarchy, AppError> {
        let key = cache::entity_key_with_suffix(
            EntityKind::CourseTracking,
            course_id,
            scope,
            &user_id.to_string(),
        );
        if let Some(cached) = self.cache.get_json::<TrackedHierarchy>(&key).await {
            return Ok(cached);
        }

        let hierarchy = self.hierarchy.assemble(course_id, scope).await?;
        let tracked = self.overlay(&hierarchy, user_id, scope).await?;

        let ttl = self.cache.config().ttl_for(EntityKind::CourseTracking);
        self.cache.put_json(&key, &tracked, ttl).await;

        Ok(tracked)
    }

    /// Overlay one user's tracking onto an assembled hierarchy.
    ///
    /// Without a course-level record the whole tree is `NotStarted` at 0%.
    /// With one, lesson records are fetched in a single call and indexed by
    /// lesson id before derivation.
    pub async fn overlay(
        &self,
        hierarchy: &CourseHierarchy,
        user_id: Uuid,
        scope: &TenantScope,
    ) -> Result<TrackedHierarchy, AppError> {
        let course_record = self
            .course_tracking
            .find_for_user(hierarchy.id, user_id, scope)
            .await?;

        let Some(course_record) = course_record else {
            return Ok(untracked_view(hierarchy));
        };

        if hierarchy.modules.is_empty() {
            return Err(AppError::invalid_state(
                "course has tracking but no hierarchy to aggregate onto",
            ));
        }

        let records = self
            .lesson_tracking
            .list_for_user_course(hierarchy.id, user_id, scope)
            .await?;
        let by_lesson: HashMap<Uuid, &LessonTrackRecord> =
            records.iter().map(|record| (record.lesson_id, record)).collect();

        let modules: Vec<TrackedModule> = hierarchy
            .modules
            .iter()
            .map(|module| tracked_module(module, &by_lesson))
            .collect();

        // Persisted counters win over fresh tree counts when present: they
        // can reflect business rules a naive count misses.
        let counted_completed: u32 = modules.iter().map(|module| module.completed_lessons).sum();
        let completed = course_record.completed_lessons.unwrap_or(counted_completed);
        let total = course_record
            .no_of_lessons
            .unwrap_or_else(|| hierarchy.total_lessons());

        let course_rollup = rollup(completed, total);
        let time_spent_secs: i64 = records.iter().map(|record| record.time_spent_secs).sum();
        let last_accessed = latest_access(modules.iter().map(|module| module.last_accessed));

        debug!(
            course_id = %hierarchy.id,
            user_id = %user_id,
            completed,
            total,
            progress = course_rollup.progress,
            target_module = SOURCE,
            "Overlaid tracking onto hierarchy"
        );

        Ok(TrackedHierarchy {
            course_id: hierarchy.id,
            title: hierarchy.title.clone(),
            status: course_rollup.status,
            progress: course_rollup.progress,
            completed_lessons: completed,
            total_lessons: total,
            time_spent_secs,
            last_accessed,
            modules,
        })
    }
}

/// One module node with derivation applied, children first.
fn tracked_module(
    node: &ModuleNode,
    by_lesson: &HashMap<Uuid, &LessonTrackRecord>,
) -> TrackedModule {
    let children: Vec<TrackedModule> = node
        .children
        .iter()
        .map(|child| tracked_module(child, by_lesson))
        .collect();

    let lessons: Vec<TrackedLesson> = node
        .lessons
        .iter()
        .map(|slot| tracked_lesson(slot, by_lesson.get(&slot.lesson_id).copied()))
        .collect();

    let own_completed = lessons
        .iter()
        .filter(|lesson| lesson.status == TrackingStatus::Completed)
        .count() as u32;
    let completed_lessons = own_completed
        + children
            .iter()
            .map(|child| child.completed_lessons)
            .sum::<u32>();
    let total_lessons = node.lesson_count();

    let module_rollup = rollup(completed_lessons, total_lessons);
    let last_accessed = latest_access(
        lessons
            .iter()
            .map(|lesson| lesson.last_accessed)
            .chain(children.iter().map(|child| child.last_accessed)),
    );

    TrackedModule {
        id: node.id,
        title: node.title.clone(),
        description: node.description.clone(),
        ordering: node.ordering,
        status: module_rollup.status,
        progress: module_rollup.progress,
        completed_lessons,
        total_lessons,
        last_accessed,
        lessons,
        children,
    }
}

fn tracked_lesson(slot: &LessonSlot, record: Option<&LessonTrackRecord>) -> TrackedLesson {
    let (status, progress, time_spent_secs, score, last_accessed) = match record {
        Some(record) => (
            record.status,
            lesson_progress(record.status, record.current_position),
            record.time_spent_secs,
            record.score,
            record.last_accessed,
        ),
        None => (TrackingStatus::NotStarted, 0, 0, None, None),
    };

    TrackedLesson {
        lesson_id: slot.lesson_id,
        sequence: slot.sequence,
        title: slot.title.clone(),
        description: slot.description.clone(),
        format: slot.format,
        ideal_time_minutes: slot.ideal_time_minutes,
        free: slot.free,
        status,
        progress,
        time_spent_secs,
        score,
        last_accessed,
    }
}

/// View for a user with no course-level record: everything `NotStarted`,
/// totals from a flat count over the tree.
fn untracked_view(hierarchy: &CourseHierarchy) -> TrackedHierarchy {
    fn untracked_node(node: &ModuleNode) -> TrackedModule {
        TrackedModule {
            id: node.id,
            title: node.title.clone(),
            description: node.description.clone(),
            ordering: node.ordering,
            status: TrackingStatus::NotStarted,
            progress: 0,
            completed_lessons: 0,
            total_lessons: node.lesson_count(),
            last_accessed: None,
            lessons: node
                .lessons
                .iter()
                .map(|slot| tracked_lesson(slot, None))
                .collect(),
            children: node.children.iter().map(untracked_node).collect(),
        }
    }

    TrackedHierarchy {
        course_id: hierarchy.id,
        title: hierarchy.title.clone(),
        status: TrackingStatus::NotStarted,
        progress: 0,
        completed_lessons: 0,
        total_lessons: hierarchy.total_lessons(),
        time_spent_secs: 0,
        last_accessed: None,
        modules: hierarchy.modules.iter().map(untracked_node).collect(),
    }
}
