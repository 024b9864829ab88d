//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }

    /// Archived rows are invisible to every hierarchy and listing read.
    pub fn is_archived(self) -> bool {
        matches!(self, ContentStatus::Archived)
    }
}

/// Per-user tracking state. Collaborators only ever move a record forward
/// (towards `Completed`); the aggregator relies on that monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingStatus {
    NotStarted,
    Started,
    Incomplete,
    Completed,
}

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingStatus::NotStarted => "NOT_STARTED",
            TrackingStatus::Started => "STARTED",
            TrackingStatus::Incomplete => "INCOMPLETE",
            TrackingStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonFormat {
    Video,
    Audio,
    Article,
    Quiz,
    Assessment,
}

impl LessonFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LessonFormat::Video => "video",
            LessonFormat::Audio => "audio",
            LessonFormat::Article => "article",
            LessonFormat::Quiz => "quiz",
            LessonFormat::Assessment => "assessment",
        }
    }
}
