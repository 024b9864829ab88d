//! Invalidation plan generation.
//!
//! Maps one committed mutation to the exact keys and key patterns that must
//! be purged to keep cached views from diverging from the authoritative
//! store. Cascades run one level deep in the "contains" direction and
//! unconditionally in the "belongs to" direction: a lesson write always
//! walks up to its course's hierarchy view, a course write never walks down
//! to individual lessons. Listing views are purged per tenant/organisation,
//! not per filter combination: over-invalidation is the safe default here,
//! under-invalidation never is.

use std::fmt;

use uuid::Uuid;

use crate::application::repos::TenantScope;

use super::keys::{
    EntityKind, entity_key, entity_key_with_suffix, entity_pattern, list_pattern,
};

/// A committed write, described by the mutated entity's identity and its
/// known ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CourseSaved {
        course_id: Uuid,
    },
    CourseArchived {
        course_id: Uuid,
    },
    ModuleSaved {
        module_id: Uuid,
        course_id: Uuid,
    },
    ModuleArchived {
        module_id: Uuid,
        course_id: Uuid,
    },
    LessonSaved {
        lesson_id: Uuid,
        module_id: Uuid,
        course_id: Uuid,
    },
    LessonArchived {
        lesson_id: Uuid,
        module_id: Uuid,
        course_id: Uuid,
    },
    TrackingUpserted {
        course_id: Uuid,
        user_id: Uuid,
    },
}

/// Exact keys and wildcard patterns to purge for one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<String>,
    pub patterns: Vec<String>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, patterns: {} }}",
            self.keys.len(),
            self.patterns.len()
        )
    }
}

impl InvalidationPlan {
    /// Derive the purge set for a mutation. Deterministic: the same mutation
    /// under the same scope always yields the same plan, in the same order.
    pub fn for_mutation(mutation: &Mutation, scope: &TenantScope) -> Self {
        match mutation {
            Mutation::CourseSaved { course_id } | Mutation::CourseArchived { course_id } => Self {
                keys: vec![entity_key(EntityKind::Course, *course_id, scope)],
                patterns: vec![
                    entity_pattern(EntityKind::CourseHierarchy, *course_id),
                    list_pattern(EntityKind::CourseList, scope),
                ],
            },
            Mutation::ModuleSaved {
                module_id,
                course_id,
            }
            | Mutation::ModuleArchived {
                module_id,
                course_id,
            } => Self {
                keys: vec![entity_key(EntityKind::Module, *module_id, scope)],
                patterns: vec![
                    entity_pattern(EntityKind::CourseHierarchy, *course_id),
                    list_pattern(EntityKind::ModuleList, scope),
                ],
            },
            // The course scalar row is unaffected by a lesson write, so the
            // course's own entry stays; only its hierarchy view goes.
            Mutation::LessonSaved {
                lesson_id,
                module_id,
                course_id,
            }
            | Mutation::LessonArchived {
                lesson_id,
                module_id,
                course_id,
            } => Self {
                keys: vec![entity_key(EntityKind::Lesson, *lesson_id, scope)],
                patterns: vec![
                    entity_pattern(EntityKind::ModuleLessons, *module_id),
                    entity_pattern(EntityKind::CourseHierarchy, *course_id),
                ],
            },
            Mutation::TrackingUpserted { course_id, user_id } => Self {
                keys: vec![entity_key_with_suffix(
                    EntityKind::CourseTracking,
                    *course_id,
                    scope,
                    &user_id.to_string(),
                )],
                patterns: vec![],
            },
        }
    }

    /// Total number of purge entries (keys plus patterns).
    pub fn len(&self) -> usize {
        self.keys.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty()
    }
}
