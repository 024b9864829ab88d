//! Cache trigger service.
//!
//! The write-path entry point: after a mutation has committed to the
//! authoritative store, CRUD collaborators call one of these methods to purge
//! the affected cache entries. The store write always commits first; if a
//! purge fails the store swallows the error and the user-visible consequence
//! is staleness bounded by TTL, never a failed request. There is no
//! compensating action.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::repos::TenantScope;

use super::planner::{InvalidationPlan, Mutation};
use super::store::CacheStore;

const SOURCE: &str = "cache::trigger";

pub struct CacheTrigger {
    store: Arc<CacheStore>,
}

impl CacheTrigger {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Compute and apply the purge set for one committed mutation.
    pub async fn apply(&self, mutation: &Mutation, scope: &TenantScope) {
        let plan = InvalidationPlan::for_mutation(mutation, scope);

        for key in &plan.keys {
            self.store.delete(key).await;
        }
        let mut purged = plan.keys.len() as u64;
        for pattern in &plan.patterns {
            purged += self.store.delete_by_pattern(pattern).await;
        }

        debug!(
            mutation = ?mutation,
            plan = %plan,
            purged,
            target_module = SOURCE,
            "Applied invalidation plan"
        );
    }

    pub async fn course_saved(&self, course_id: Uuid, scope: &TenantScope) {
        self.apply(&Mutation::CourseSaved { course_id }, scope).await;
    }

    pub async fn course_archived(&self, course_id: Uuid, scope: &TenantScope) {
        self.apply(&Mutation::CourseArchived { course_id }, scope)
            .await;
    }

    pub async fn module_saved(&self, module_id: Uuid, course_id: Uuid, scope: &TenantScope) {
        self.apply(
            &Mutation::ModuleSaved {
                module_id,
                course_id,
            },
            scope,
        )
        .await;
    }

    pub async fn module_archived(&self, module_id: Uuid, course_id: Uuid, scope: &TenantScope) {
        self.apply(
            &Mutation::ModuleArchived {
                module_id,
                course_id,
            },
            scope,
        )
        .await;
    }

    pub async fn lesson_saved(
        &self,
        lesson_id: Uuid,
        module_id: Uuid,
        course_id: Uuid,
        scope: &TenantScope,
    ) {
        self.apply(
            &Mutation::LessonSaved {
                lesson_id,
                module_id,
                course_id,
            },
            scope,
        )
        .await;
    }

    pub async fn lesson_archived(
        &self,
        lesson_id: Uuid,
        module_id: Uuid,
        course_id: Uuid,
        scope: &TenantScope,
    ) {
        self.apply(
            &Mutation::LessonArchived {
                lesson_id,
                module_id,
                course_id,
            },
            scope,
        )
        .await;
    }

    pub async fn tracking_upserted(&self, course_id: Uuid, user_id: Uuid, scope: &TenantScope) {
        self.apply(&Mutation::TrackingUpserted { course_id, user_id }, scope)
            .await;
    }
}
