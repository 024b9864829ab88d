//! Course hierarchy assembly.
//!
//! Builds the Course → Modules → Submodules → Lessons tree from flat,
//! tenant-scoped storage. Archived rows are excluded at every level, sibling
//! groups are ordered deterministically, and the assembled tree is cached
//! under the course-hierarchy key. Sibling branches are fetched in parallel;
//! only parent → child levels are sequential.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{CourseLessonsRepo, CoursesRepo, ModulesRepo, TenantScope};
use crate::cache::{self, CacheStore, EntityKind};
use crate::domain::entities::{CourseRecord, ModuleRecord};
use crate::domain::hierarchy::{CourseHierarchy, LessonSlot, ModuleNode};

const SOURCE: &str = "application::hierarchy::HierarchyService";

#[derive(Clone)]
pub struct HierarchyService {
    courses: Arc<dyn CoursesRepo>,
    modules: Arc<dyn ModulesRepo>,
    course_lessons: Arc<dyn CourseLessonsRepo>,
    cache: Arc<CacheStore>,
}

impl HierarchyService {
    pub fn new(
        courses: Arc<dyn CoursesRepo>,
        modules: Arc<dyn ModulesRepo>,
        course_lessons: Arc<dyn CourseLessonsRepo>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            courses,
            modules,
            course_lessons,
            cache,
        }
    }

    /// Assemble the tenant-scoped tree for one course.
    ///
    /// Fails with `NotFound` when the course row is absent, archived, or not
    /// visible under the supplied scope. There is no single-flight map here:
    /// two concurrent misses for the same key both recompute and both write
    /// back the same value.
    pub async fn assemble(
        &self,
        course_id: Uuid,
        scope: &TenantScope,
    ) -> Result<CourseHierarchy, AppError> {
        let hierarchy_key = cache::entity_key(EntityKind::CourseHierarchy, course_id, scope);
        if let Some(cached) = self.cache.get_json::<CourseHierarchy>(&hierarchy_key).await {
            return Ok(cached);
        }

        let course = self.load_course(course_id, scope).await?;
        let modules = self.assemble_modules(course_id, scope).await?;

        let hierarchy = CourseHierarchy {
            id: course.id,
            tenant_id: course.tenant_id,
            organisation_id: course.organisation_id,
            title: course.title,
            description: course.description,
            modules,
        };

        debug!(
            course_id = %course_id,
            modules = hierarchy.modules.len(),
            lessons = hierarchy.total_lessons(),
            target_module = SOURCE,
            "Assembled course hierarchy"
        );

        let ttl = self.cache.config().ttl_for(EntityKind::CourseHierarchy);
        self.cache.put_json(&hierarchy_key, &hierarchy, ttl).await;

        Ok(hierarchy)
    }

    /// Course scalar row, cache-first. The cached copy is re-checked against
    /// the scope and archived status: a hit must never widen visibility.
    async fn load_course(
        &self,
        course_id: Uuid,
        scope: &TenantScope,
    ) -> Result<CourseRecord, AppError> {
        let key = cache::entity_key(EntityKind::Course, course_id, scope);

        if let Some(cached) = self.cache.get_json::<CourseRecord>(&key).await {
            if course_visible(&cached, scope) {
                return Ok(cached);
            }
            return Err(AppError::NotFound);
        }

        let Some(course) = self.courses.find_by_id(course_id, scope).await? else {
            return Err(AppError::NotFound);
        };
        if !course_visible(&course, scope) {
            return Err(AppError::NotFound);
        }

        let ttl = self.cache.config().ttl_for(EntityKind::Course);
        self.cache.put_json(&key, &course, ttl).await;

        Ok(course)
    }

    /// Top-level modules with their submodules and lesson slots. All sibling
    /// branches fan out concurrently.
    async fn assemble_modules(
        &self,
        course_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<ModuleNode>, AppError> {
        let top_level = visible_modules(self.modules.list_top_level(course_id, scope).await?);

        try_join_all(top_level.into_iter().map(|module| async move {
            let (children, lessons) = futures::try_join!(
                self.assemble_children(module.id, scope),
                self.load_lessons(module.id, scope),
            )?;
            Ok::<_, AppError>(into_node(module, lessons, children))
        }))
        .await
    }

    /// One level of submodules; the hierarchy never nests deeper.
    async fn assemble_children(
        &self,
        parent_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<ModuleNode>, AppError> {
        let submodules = visible_modules(self.modules.list_children(parent_id, scope).await?);

        try_join_all(submodules.into_iter().map(|submodule| async move {
            let lessons = self.load_lessons(submodule.id, scope).await?;
            Ok::<_, AppError>(into_node(submodule, lessons, Vec::new()))
        }))
        .await
    }

    /// Lesson slots for one module, cache-first, ordered by their sequencing
    /// field. The association rows already carry the lesson display fields,
    /// so no per-lesson round trip happens here.
    async fn load_lessons(
        &self,
        module_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<LessonSlot>, AppError> {
        let key = cache::entity_key(EntityKind::ModuleLessons, module_id, scope);
        if let Some(cached) = self.cache.get_json::<Vec<LessonSlot>>(&key).await {
            return Ok(cached);
        }

        let rows = self.course_lessons.list_by_module(module_id, scope).await?;
        let mut slots: Vec<LessonSlot> = rows
            .into_iter()
            .filter(|row| !row.status.is_archived())
            .map(|row| LessonSlot {
                lesson_id: row.lesson_id,
                sequence: row.sequence,
                title: row.lesson_title,
                description: row.lesson_description,
                format: row.lesson_format,
                ideal_time_minutes: row.lesson_ideal_time_minutes,
                free: row.lesson_free,
            })
            .collect();
        slots.sort_by_key(|slot| (slot.sequence, slot.lesson_id));

        let ttl = self.cache.config().ttl_for(EntityKind::ModuleLessons);
        self.cache.put_json(&key, &slots, ttl).await;

        Ok(slots)
    }
}

/// Drop archived rows and order deterministically: by `ordering`, id as the
/// tie-break so equal orderings stay stable across assemblies.
fn visible_modules(mut records: Vec<ModuleRecord>) -> Vec<ModuleRecord> {
    records.retain(|module| !module.status.is_archived());
    records.sort_by_key(|module| (module.ordering, module.id));
    records
}

fn into_node(record: ModuleRecord, lessons: Vec<LessonSlot>, children: Vec<ModuleNode>) -> ModuleNode {
    ModuleNode {
        id: record.id,
        title: record.title,
        description: record.description,
        ordering: record.ordering,
        lessons,
        children,
    }
}

fn course_visible(course: &CourseRecord, scope: &TenantScope) -> bool {
    !course.status.is_archived()
        && scope.permits(
            course.tenant_id.as_deref(),
            course.organisation_id.as_deref(),
        )
}
