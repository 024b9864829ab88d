//! Cache key construction.
//!
//! Every key starts with a fixed per-kind namespace token followed by
//! colon-separated segments in a fixed order: `token:id:tenant:organisation`
//! (`token:list:tenant:organisation:filter` for listing views). Absent
//! tenant/organisation identifiers are normalized to a placeholder segment so
//! scoped and unscoped callers can never collide on the same key. Pattern
//! keys reuse the same segment order and substitute a wildcard for the
//! variable tail.
//!
//! Everything here is a pure function: identical inputs always produce
//! identical keys.

use uuid::Uuid;

use crate::application::repos::TenantScope;

/// Segment substituted for an absent tenant/organisation identifier.
pub const SCOPE_PLACEHOLDER: &str = "global";

/// Wildcard tail for pattern keys.
pub const WILDCARD: &str = "*";

const LIST_SEGMENT: &str = "list";
const EMPTY_FILTER_SEGMENT: &str = "unfiltered";

/// Cacheable entity kinds, each owning a reserved namespace token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Course,
    /// Assembled course tree without tracking overlay.
    CourseHierarchy,
    /// Per-user tracked course view.
    CourseTracking,
    CourseList,
    Module,
    ModuleList,
    /// Lesson slots of one module.
    ModuleLessons,
    Lesson,
    Enrollment,
}

impl EntityKind {
    /// Namespace token. Tokens are distinct across kinds so two kinds can
    /// never produce the same key for the same id.
    pub fn token(self) -> &'static str {
        match self {
            EntityKind::Course => "course",
            EntityKind::CourseHierarchy => "course-hierarchy",
            EntityKind::CourseTracking => "course-tracking",
            EntityKind::CourseList => "course-list",
            EntityKind::Module => "module",
            EntityKind::ModuleList => "module-list",
            EntityKind::ModuleLessons => "module-lessons",
            EntityKind::Lesson => "lesson",
            EntityKind::Enrollment => "enrollment",
        }
    }
}

fn tenant_segment(scope: &TenantScope) -> &str {
    scope.tenant_id.as_deref().unwrap_or(SCOPE_PLACEHOLDER)
}

fn organisation_segment(scope: &TenantScope) -> &str {
    scope
        .organisation_id
        .as_deref()
        .unwrap_or(SCOPE_PLACEHOLDER)
}

/// Key for a single entity: `token:id:tenant:organisation`.
pub fn entity_key(kind: EntityKind, id: Uuid, scope: &TenantScope) -> String {
    format!(
        "{}:{}:{}:{}",
        kind.token(),
        id,
        tenant_segment(scope),
        organisation_segment(scope)
    )
}

/// Entity key with an extra trailing segment, used for per-user views.
pub fn entity_key_with_suffix(
    kind: EntityKind,
    id: Uuid,
    scope: &TenantScope,
    suffix: &str,
) -> String {
    format!("{}:{}", entity_key(kind, id, scope), suffix)
}

/// Pattern matching every scope/suffix variant of one entity's keys.
pub fn entity_pattern(kind: EntityKind, id: Uuid) -> String {
    format!("{}:{}:{}", kind.token(), id, WILDCARD)
}

/// Canonical encoding of a filter set.
///
/// Pairs are sorted lexicographically by key before concatenation, so
/// semantically identical filters map to the same cache key regardless of the
/// order the caller supplied them in. Without this, search endpoints would
/// never see a cache hit.
pub fn encode_filter(pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return EMPTY_FILTER_SEGMENT.to_string();
    }

    let mut sorted: Vec<&(&str, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Key for a paginated/filtered listing view:
/// `token:list:tenant:organisation:filter`.
pub fn list_key(kind: EntityKind, scope: &TenantScope, pairs: &[(&str, String)]) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        kind.token(),
        LIST_SEGMENT,
        tenant_segment(scope),
        organisation_segment(scope),
        encode_filter(pairs)
    )
}

/// Pattern matching every filter combination of a tenant/organisation's
/// listing views. Invalidation purges at this granularity rather than per
/// filter set.
pub fn list_pattern(kind: EntityKind, scope: &TenantScope) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        kind.token(),
        LIST_SEGMENT,
        tenant_segment(scope),
        organisation_segment(scope),
        WILDCARD
    )
}
