//! Cache configuration.
//!
//! Controls the global enable switch and per-entity-kind TTLs via
//! `corso.toml`.

use serde::Deserialize;

use super::keys::EntityKind;

// Default TTLs in seconds
const DEFAULT_COURSE_TTL_SECS: u64 = 3600;
const DEFAULT_MODULE_TTL_SECS: u64 = 1800;
const DEFAULT_LESSON_TTL_SECS: u64 = 1800;
const DEFAULT_ENROLLMENT_TTL_SECS: u64 = 1800;
const DEFAULT_LIST_TTL_SECS: u64 = 600;
const DEFAULT_TRACKED_VIEW_TTL_SECS: u64 = 300;

/// Cache configuration from `corso.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Global enable switch; when false every cache operation is a no-op.
    pub enabled: bool,
    /// TTL for course rows and assembled hierarchies.
    pub course_ttl_secs: u64,
    /// TTL for module rows and per-module lesson lists.
    pub module_ttl_secs: u64,
    /// TTL for lesson rows.
    pub lesson_ttl_secs: u64,
    /// TTL for enrollment views.
    pub enrollment_ttl_secs: u64,
    /// TTL for paginated/filtered listing views.
    pub list_ttl_secs: u64,
    /// TTL for per-user tracked views; short, these go stale on every
    /// lesson interaction.
    pub tracked_view_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            course_ttl_secs: DEFAULT_COURSE_TTL_SECS,
            module_ttl_secs: DEFAULT_MODULE_TTL_SECS,
            lesson_ttl_secs: DEFAULT_LESSON_TTL_SECS,
            enrollment_ttl_secs: DEFAULT_ENROLLMENT_TTL_SECS,
            list_ttl_secs: DEFAULT_LIST_TTL_SECS,
            tracked_view_ttl_secs: DEFAULT_TRACKED_VIEW_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// TTL in seconds for one entity kind.
    pub fn ttl_for(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Course | EntityKind::CourseHierarchy => self.course_ttl_secs,
            EntityKind::Module | EntityKind::ModuleLessons => self.module_ttl_secs,
            EntityKind::Lesson => self.lesson_ttl_secs,
            EntityKind::Enrollment => self.enrollment_ttl_secs,
            EntityKind::CourseList | EntityKind::ModuleList => self.list_ttl_secs,
            EntityKind::CourseTracking => self.tracked_view_ttl_secs,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            course_ttl_secs: settings.course_ttl_secs,
            module_ttl_secs: settings.module_ttl_secs,
            lesson_ttl_secs: settings.lesson_ttl_secs,
            enrollment_ttl_secs: settings.enrollment_ttl_secs,
            list_ttl_secs: settings.list_ttl_secs,
            tracked_view_ttl_secs: settings.tracked_view_ttl_secs,
        }
    }
}
