//! Course catalog listings.
//!
//! The read path for filtered/paginated course search. Pages are cached
//! under the canonical list key (filter pairs sorted, page and limit
//! appended) so identical searches hit regardless of client key order. Any
//! course mutation purges every listing variant for the tenant/organisation
//! via the course-list pattern.

use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{CourseQueryFilter, CoursesRepo, TenantScope};
use crate::cache::{self, CacheStore, EntityKind};
use crate::domain::entities::CourseRecord;

#[derive(Clone)]
pub struct CatalogService {
    courses: Arc<dyn CoursesRepo>,
    cache: Arc<CacheStore>,
}

impl CatalogService {
    pub fn new(courses: Arc<dyn CoursesRepo>, cache: Arc<CacheStore>) -> Self {
        Self { courses, cache }
    }

    pub async fn list_courses(
        &self,
        scope: &TenantScope,
        filter: &CourseQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CourseRecord>, AppError> {
        let mut pairs = filter.as_pairs();
        pairs.push(("page", page.page.to_string()));
        pairs.push(("limit", page.limit.to_string()));
        let key = cache::list_key(EntityKind::CourseList, scope, &pairs);

        if let Some(cached) = self.cache.get_json::<Page<CourseRecord>>(&key).await {
            return Ok(cached);
        }

        let result = self.courses.find_and_count(scope, filter, page).await?;

        let ttl = self.cache.config().ttl_for(EntityKind::CourseList);
        self.cache.put_json(&key, &result, ttl).await;

        Ok(result)
    }
}
