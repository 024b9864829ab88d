//! Progress aggregation: tracking overlay on assembled hierarchies.
//!
//! Covers the derivation rules end to end: the 99-cap on position-derived
//! progress, zero-lesson rollups, persisted-counter preference, and the
//! cached tracked view.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use corso::application::error::AppError;
use corso::application::hierarchy::HierarchyService;
use corso::application::pagination::{Page, PageRequest};
use corso::application::progress::ProgressService;
use corso::application::repos::{
    CourseLessonsRepo, CourseQueryFilter, CourseTrackingRepo, CoursesRepo, LessonTrackingRepo,
    ModulesRepo, RepoError, TenantScope,
};
use corso::cache::{CacheConfig, CacheStore, CacheTrigger, MemoryBackend};
use corso::domain::entities::{CourseLessonRecord, CourseRecord, ModuleRecord};
use corso::domain::hierarchy::{CourseHierarchy, LessonSlot, ModuleNode};
use corso::domain::tracking::{CourseTrackRecord, LessonTrackRecord};
use corso::domain::types::{ContentStatus, LessonFormat, TrackingStatus};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeCoursesRepo {
    courses: Mutex<Vec<CourseRecord>>,
}

#[async_trait]
impl CoursesRepo for FakeCoursesRepo {
    async fn find_by_id(
        &self,
        id: Uuid,
        scope: &TenantScope,
    ) -> Result<Option<CourseRecord>, RepoError> {
        Ok(self
            .courses
            .lock()
            .expect("courses lock")
            .iter()
            .find(|course| {
                course.id == id
                    && scope.permits(
                        course.tenant_id.as_deref(),
                        course.organisation_id.as_deref(),
                    )
            })
            .cloned())
    }

    async fn find_and_count(
        &self,
        _scope: &TenantScope,
        _filter: &CourseQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CourseRecord>, RepoError> {
        Ok(Page::new(Vec::new(), 0, page))
    }

    async fn save(&self, record: CourseRecord) -> Result<CourseRecord, RepoError> {
        self.courses.lock().expect("courses lock").push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeModulesRepo {
    modules: Mutex<Vec<ModuleRecord>>,
}

#[async_trait]
impl ModulesRepo for FakeModulesRepo {
    async fn list_top_level(
        &self,
        course_id: Uuid,
        _scope: &TenantScope,
    ) -> Result<Vec<ModuleRecord>, RepoError> {
        Ok(self
            .modules
            .lock()
            .expect("modules lock")
            .iter()
            .filter(|module| module.course_id == course_id && module.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn list_children(
        &self,
        parent_id: Uuid,
        _scope: &TenantScope,
    ) -> Result<Vec<ModuleRecord>, RepoError> {
        Ok(self
            .modules
            .lock()
            .expect("modules lock")
            .iter()
            .filter(|module| module.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn save(&self, record: ModuleRecord) -> Result<ModuleRecord, RepoError> {
        self.modules.lock().expect("modules lock").push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeCourseLessonsRepo {
    rows: Mutex<Vec<CourseLessonRecord>>,
}

#[async_trait]
impl CourseLessonsRepo for FakeCourseLessonsRepo {
    async fn list_by_module(
        &self,
        module_id: Uuid,
        _scope: &TenantScope,
    ) -> Result<Vec<CourseLessonRecord>, RepoError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .filter(|row| row.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn save(&self, record: CourseLessonRecord) -> Result<CourseLessonRecord, RepoError> {
        self.rows.lock().expect("rows lock").push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeCourseTrackingRepo {
    records: Mutex<Vec<CourseTrackRecord>>,
}

#[async_trait]
impl CourseTrackingRepo for FakeCourseTrackingRepo {
    async fn find_for_user(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        _scope: &TenantScope,
    ) -> Result<Option<CourseTrackRecord>, RepoError> {
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .iter()
            .find(|record| record.course_id == course_id && record.user_id == user_id)
            .cloned())
    }

    async fn save(&self, record: CourseTrackRecord) -> Result<CourseTrackRecord, RepoError> {
        self.records.lock().expect("records lock").push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct FakeLessonTrackingRepo {
    records: Mutex<Vec<LessonTrackRecord>>,
}

#[async_trait]
impl LessonTrackingRepo for FakeLessonTrackingRepo {
    async fn list_for_user_course(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        _scope: &TenantScope,
    ) -> Result<Vec<LessonTrackRecord>, RepoError> {
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .iter()
            .filter(|record| record.course_id == course_id && record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, record: LessonTrackRecord) -> Result<LessonTrackRecord, RepoError> {
        self.records.lock().expect("records lock").push(record.clone());
        Ok(record)
    }
}

// ============================================================================
// Builders and harness
// ============================================================================

fn now() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn slot(lesson_id: Uuid, sequence: i32) -> LessonSlot {
    LessonSlot {
        lesson_id,
        sequence,
        title: format!("Lesson {sequence}"),
        description: None,
        format: LessonFormat::Video,
        ideal_time_minutes: Some(10),
        free: false,
    }
}

fn node(ordering: i32, lessons: Vec<LessonSlot>, children: Vec<ModuleNode>) -> ModuleNode {
    ModuleNode {
        id: Uuid::new_v4(),
        title: format!("Module {ordering}"),
        description: None,
        ordering,
        lessons,
        children,
    }
}

fn hierarchy(course_id: Uuid, modules: Vec<ModuleNode>) -> CourseHierarchy {
    CourseHierarchy {
        id: course_id,
        tenant_id: Some("acme".to_string()),
        organisation_id: Some("org-1".to_string()),
        title: "Systems Programming".to_string(),
        description: None,
        modules,
    }
}

fn course_track(course_id: Uuid, user_id: Uuid) -> CourseTrackRecord {
    CourseTrackRecord {
        course_id,
        user_id,
        status: TrackingStatus::Started,
        completed_lessons: None,
        no_of_lessons: None,
        time_spent_secs: 0,
        last_accessed: None,
    }
}

fn lesson_track(
    course_id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    status: TrackingStatus,
    current_position: f64,
) -> LessonTrackRecord {
    LessonTrackRecord {
        lesson_id,
        course_id,
        user_id,
        status,
        current_position,
        time_spent_secs: 0,
        score: None,
        last_accessed: None,
    }
}

struct Harness {
    courses: Arc<FakeCoursesRepo>,
    modules: Arc<FakeModulesRepo>,
    lessons: Arc<FakeCourseLessonsRepo>,
    course_tracking: Arc<FakeCourseTrackingRepo>,
    lesson_tracking: Arc<FakeLessonTrackingRepo>,
    store: Arc<CacheStore>,
    service: ProgressService,
}

fn harness() -> Harness {
    let courses = Arc::new(FakeCoursesRepo::default());
    let modules = Arc::new(FakeModulesRepo::default());
    let lessons = Arc::new(FakeCourseLessonsRepo::default());
    let course_tracking = Arc::new(FakeCourseTrackingRepo::default());
    let lesson_tracking = Arc::new(FakeLessonTrackingRepo::default());
    let store = Arc::new(CacheStore::new(
        Arc::new(MemoryBackend::new()),
        CacheConfig::default(),
    ));
    let hierarchy_service = HierarchyService::new(
        courses.clone(),
        modules.clone(),
        lessons.clone(),
        store.clone(),
    );
    let service = ProgressService::new(
        course_tracking.clone(),
        lesson_tracking.clone(),
        hierarchy_service,
        store.clone(),
    );
    Harness {
        courses,
        modules,
        lessons,
        course_tracking,
        lesson_tracking,
        store,
        service,
    }
}

fn scope() -> TenantScope {
    TenantScope::new("acme".to_string(), "org-1".to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn no_course_record_yields_a_not_started_tree() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let tree = hierarchy(
        course_id,
        vec![
            node(1, vec![slot(Uuid::new_v4(), 1), slot(Uuid::new_v4(), 2)], vec![]),
            node(2, vec![], vec![node(1, vec![slot(Uuid::new_v4(), 1)], vec![])]),
        ],
    );

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    assert_eq!(tracked.status, TrackingStatus::NotStarted);
    assert_eq!(tracked.progress, 0);
    assert_eq!(tracked.completed_lessons, 0);
    assert_eq!(tracked.total_lessons, 3);
    assert_eq!(tracked.time_spent_secs, 0);

    for module in &tracked.modules {
        assert_eq!(module.status, TrackingStatus::NotStarted);
        assert_eq!(module.progress, 0);
        for lesson in &module.lessons {
            assert_eq!(lesson.status, TrackingStatus::NotStarted);
            assert_eq!(lesson.progress, 0);
        }
    }
}

#[tokio::test]
async fn half_completed_module_and_empty_module() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let done = Uuid::new_v4();
    let untouched = Uuid::new_v4();
    let tree = hierarchy(
        course_id,
        vec![
            node(1, vec![slot(done, 1), slot(untouched, 2)], vec![]),
            node(2, vec![], vec![]),
        ],
    );

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, done, TrackingStatus::Completed, 1.0))
        .await
        .expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    let m1 = &tracked.modules[0];
    assert_eq!(m1.completed_lessons, 1);
    assert_eq!(m1.total_lessons, 2);
    assert_eq!(m1.progress, 50);
    assert_eq!(m1.status, TrackingStatus::Incomplete);

    let m2 = &tracked.modules[1];
    assert_eq!(m2.total_lessons, 0);
    assert_eq!(m2.progress, 0);
    assert_eq!(m2.status, TrackingStatus::Started);

    assert_eq!(tracked.completed_lessons, 1);
    assert_eq!(tracked.total_lessons, 2);
    assert_eq!(tracked.progress, 50);
    assert_eq!(tracked.status, TrackingStatus::Incomplete);
}

#[tokio::test]
async fn position_never_reports_a_lesson_as_done() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let almost = Uuid::new_v4();
    let completed = Uuid::new_v4();
    let tree = hierarchy(
        course_id,
        vec![node(1, vec![slot(almost, 1), slot(completed, 2)], vec![])],
    );

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, almost, TrackingStatus::Started, 0.999))
        .await
        .expect("seed lesson track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, completed, TrackingStatus::Completed, 0.1))
        .await
        .expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    let lessons = &tracked.modules[0].lessons;
    assert_eq!(lessons[0].status, TrackingStatus::Started);
    assert_eq!(lessons[0].progress, 99);
    assert_eq!(lessons[1].status, TrackingStatus::Completed);
    assert_eq!(lessons[1].progress, 100);
}

#[tokio::test]
async fn freshly_started_lesson_reports_zero() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let lesson_id = Uuid::new_v4();
    let tree = hierarchy(course_id, vec![node(1, vec![slot(lesson_id, 1)], vec![])]);

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, lesson_id, TrackingStatus::Started, 0.0))
        .await
        .expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    assert_eq!(tracked.modules[0].lessons[0].progress, 0);
    assert_eq!(tracked.modules[0].lessons[0].status, TrackingStatus::Started);
}

#[tokio::test]
async fn persisted_course_counters_win_over_tree_counts() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let done = Uuid::new_v4();
    let tree = hierarchy(
        course_id,
        vec![node(1, vec![slot(done, 1), slot(Uuid::new_v4(), 2)], vec![])],
    );

    // The tree says 1/2; the persisted counters say 3/4 (e.g. some lessons
    // are excluded from passing by business rules the tree cannot see).
    let mut record = course_track(course_id, user_id);
    record.completed_lessons = Some(3);
    record.no_of_lessons = Some(4);
    h.course_tracking.save(record).await.expect("seed course track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, done, TrackingStatus::Completed, 1.0))
        .await
        .expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    assert_eq!(tracked.completed_lessons, 3);
    assert_eq!(tracked.total_lessons, 4);
    assert_eq!(tracked.progress, 75);
    assert_eq!(tracked.status, TrackingStatus::Incomplete);
}

#[tokio::test]
async fn time_spent_and_last_accessed_aggregate_upwards() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let earlier = datetime!(2026-02-01 09:00 UTC);
    let later = datetime!(2026-02-15 18:30 UTC);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let tree = hierarchy(course_id, vec![node(1, vec![slot(a, 1), slot(b, 2)], vec![])]);

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");

    let mut first = lesson_track(course_id, user_id, a, TrackingStatus::Completed, 1.0);
    first.time_spent_secs = 30;
    first.last_accessed = Some(earlier);
    let mut second = lesson_track(course_id, user_id, b, TrackingStatus::Started, 0.4);
    second.time_spent_secs = 45;
    second.last_accessed = Some(later);
    h.lesson_tracking.save(first).await.expect("seed lesson track");
    h.lesson_tracking.save(second).await.expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    assert_eq!(tracked.time_spent_secs, 75);
    assert_eq!(tracked.modules[0].last_accessed, Some(later));
    assert_eq!(tracked.last_accessed, Some(later));
}

#[tokio::test]
async fn submodule_completion_rolls_up_into_the_parent() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let done = Uuid::new_v4();
    let tree = hierarchy(
        course_id,
        vec![node(1, vec![], vec![node(1, vec![slot(done, 1)], vec![])])],
    );

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, done, TrackingStatus::Completed, 1.0))
        .await
        .expect("seed lesson track");

    let tracked = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect("overlay");

    let parent = &tracked.modules[0];
    assert_eq!(parent.completed_lessons, 1);
    assert_eq!(parent.total_lessons, 1);
    assert_eq!(parent.progress, 100);
    assert_eq!(parent.status, TrackingStatus::Completed);

    let child = &parent.children[0];
    assert_eq!(child.progress, 100);
    assert_eq!(child.status, TrackingStatus::Completed);
}

#[tokio::test]
async fn tracking_without_hierarchy_is_invalid_state() {
    let h = harness();
    let course_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let tree = hierarchy(course_id, vec![]);
    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");

    let err = h
        .service
        .overlay(&tree, user_id, &scope())
        .await
        .expect_err("empty hierarchy");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn tracked_view_is_cached_until_the_tracking_write_purges_it() {
    let h = harness();
    let user_id = Uuid::new_v4();
    let scope = scope();

    // Seed real content so the full read path runs.
    let course = CourseRecord {
        id: Uuid::new_v4(),
        tenant_id: Some("acme".to_string()),
        organisation_id: Some("org-1".to_string()),
        title: "Systems Programming".to_string(),
        description: None,
        status: ContentStatus::Published,
        created_at: now(),
        updated_at: now(),
    };
    let course_id = course.id;
    h.courses.save(course).await.expect("seed course");

    let module = ModuleRecord {
        id: Uuid::new_v4(),
        course_id,
        parent_id: None,
        title: "Module 1".to_string(),
        description: None,
        ordering: 1,
        status: ContentStatus::Published,
        created_at: now(),
        updated_at: now(),
    };
    let module_id = module.id;
    h.modules.save(module).await.expect("seed module");

    let lesson_id = Uuid::new_v4();
    h.lessons
        .save(CourseLessonRecord {
            id: Uuid::new_v4(),
            course_id,
            module_id,
            lesson_id,
            sequence: 1,
            status: ContentStatus::Published,
            lesson_title: "Lesson 1".to_string(),
            lesson_description: None,
            lesson_format: LessonFormat::Video,
            lesson_ideal_time_minutes: None,
            lesson_free: false,
            created_at: now(),
        })
        .await
        .expect("seed lesson row");

    h.course_tracking
        .save(course_track(course_id, user_id))
        .await
        .expect("seed course track");

    let first = h
        .service
        .tracked_hierarchy(course_id, user_id, &scope)
        .await
        .expect("first read");
    assert_eq!(first.progress, 0);

    // The user completes the lesson; the cached view is still served.
    h.lesson_tracking
        .save(lesson_track(course_id, user_id, lesson_id, TrackingStatus::Completed, 1.0))
        .await
        .expect("seed lesson track");

    let stale = h
        .service
        .tracked_hierarchy(course_id, user_id, &scope)
        .await
        .expect("stale read");
    assert_eq!(stale.progress, 0);

    // The tracking write's invalidation purges the user view; the next read
    // recomputes.
    let trigger = CacheTrigger::new(h.store.clone());
    trigger.tracking_upserted(course_id, user_id, &scope).await;

    let fresh = h
        .service
        .tracked_hierarchy(course_id, user_id, &scope)
        .await
        .expect("fresh read");
    assert_eq!(fresh.progress, 100);
    assert_eq!(fresh.status, TrackingStatus::Completed);
}
