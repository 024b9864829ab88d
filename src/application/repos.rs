//! Repository traits describing persistence adapters.
//!
//! The engine never issues raw queries; every read and write goes through
//! these ports, and every method is scoped by [`TenantScope`] so adapters can
//! enforce tenant/organisation predicates at the query layer.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{CourseLessonRecord, CourseRecord, ModuleRecord};
use crate::domain::tracking::{CourseTrackRecord, LessonTrackRecord};
use crate::domain::types::ContentStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Tenant/organisation isolation predicate attached to every repository call.
///
/// `None` means the caller is not scoped by that identifier; the cache key
/// builder substitutes a placeholder so unscoped and scoped callers never
/// share keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantScope {
    pub tenant_id: Option<String>,
    pub organisation_id: Option<String>,
}

impl TenantScope {
    pub fn new(
        tenant_id: impl Into<Option<String>>,
        organisation_id: impl Into<Option<String>>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            organisation_id: organisation_id.into(),
        }
    }

    /// Scope with neither identifier: platform-level callers.
    pub fn global() -> Self {
        Self::default()
    }

    /// Whether a row with the given identifiers is visible under this scope.
    /// A `None` on the scope side is "no filter", not "must be unset".
    pub fn permits(&self, tenant_id: Option<&str>, organisation_id: Option<&str>) -> bool {
        let tenant_ok = match self.tenant_id.as_deref() {
            Some(scoped) => tenant_id == Some(scoped),
            None => true,
        };
        let organisation_ok = match self.organisation_id.as_deref() {
            Some(scoped) => organisation_id == Some(scoped),
            None => true,
        };
        tenant_ok && organisation_ok
    }
}

/// Filter for course catalog listings. `as_pairs` exposes the present fields
/// as key/value pairs for canonical cache-key encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseQueryFilter {
    pub search: Option<String>,
    pub status: Option<ContentStatus>,
    pub free_only: Option<bool>,
}

impl CourseQueryFilter {
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(free_only) = self.free_only {
            pairs.push(("free_only", free_only.to_string()));
        }
        pairs
    }
}

#[async_trait]
pub trait CoursesRepo: Send + Sync {
    async fn find_by_id(
        &self,
        id: Uuid,
        scope: &TenantScope,
    ) -> Result<Option<CourseRecord>, RepoError>;

    async fn find_and_count(
        &self,
        scope: &TenantScope,
        filter: &CourseQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CourseRecord>, RepoError>;

    async fn save(&self, record: CourseRecord) -> Result<CourseRecord, RepoError>;
}

#[async_trait]
pub trait ModulesRepo: Send + Sync {
    /// Modules of a course with `parent_id = NULL`.
    async fn list_top_level(
        &self,
        course_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<ModuleRecord>, RepoError>;

    /// Direct children of a module. The hierarchy has exactly two module
    /// levels, so callers never recurse below this.
    async fn list_children(
        &self,
        parent_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<ModuleRecord>, RepoError>;

    async fn save(&self, record: ModuleRecord) -> Result<ModuleRecord, RepoError>;
}

#[async_trait]
pub trait CourseLessonsRepo: Send + Sync {
    /// Association rows for a module, denormalized lesson display fields
    /// included.
    async fn list_by_module(
        &self,
        module_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<CourseLessonRecord>, RepoError>;

    async fn save(&self, record: CourseLessonRecord) -> Result<CourseLessonRecord, RepoError>;
}

#[async_trait]
pub trait CourseTrackingRepo: Send + Sync {
    async fn find_for_user(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Option<CourseTrackRecord>, RepoError>;

    async fn save(&self, record: CourseTrackRecord) -> Result<CourseTrackRecord, RepoError>;
}

#[async_trait]
pub trait LessonTrackingRepo: Send + Sync {
    /// All lesson records for one user within one course, loaded in a single
    /// call so the aggregator can index them by lesson id.
    async fn list_for_user_course(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        scope: &TenantScope,
    ) -> Result<Vec<LessonTrackRecord>, RepoError>;

    async fn save(&self, record: LessonTrackRecord) -> Result<LessonTrackRecord, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_permits_everything() {
        let scope = TenantScope::global();
        assert!(scope.permits(None, None));
        assert!(scope.permits(Some("acme"), Some("org-1")));
    }

    #[test]
    fn scoped_requires_matching_tenant() {
        let scope = TenantScope::new("acme".to_string(), None);
        assert!(scope.permits(Some("acme"), None));
        assert!(scope.permits(Some("acme"), Some("org-1")));
        assert!(!scope.permits(Some("globex"), None));
        assert!(!scope.permits(None, None));
    }

    #[test]
    fn scoped_requires_matching_organisation() {
        let scope = TenantScope::new("acme".to_string(), "org-1".to_string());
        assert!(scope.permits(Some("acme"), Some("org-1")));
        assert!(!scope.permits(Some("acme"), Some("org-2")));
        assert!(!scope.permits(Some("acme"), None));
    }

    #[test]
    fn filter_pairs_skip_absent_fields() {
        let filter = CourseQueryFilter::default();
        assert!(filter.as_pairs().is_empty());

        let filter = CourseQueryFilter {
            search: Some("rust".to_string()),
            status: Some(ContentStatus::Published),
            free_only: None,
        };
        let pairs = filter.as_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("search", "rust".to_string())));
        assert!(pairs.contains(&("status", "published".to_string())));
    }
}
