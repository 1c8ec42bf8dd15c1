//! Project and content records
//!
//! A project is one analysis run for one source URL; contents are the
//! individual ideas agents attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::HookError;

/// Lifecycle state of a project.
///
/// Moves `pending → done` once every agent has settled. `stalled` is only
/// reached when that final write could not be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Done,
    Stalled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Stalled => "stalled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "stalled" => Ok(Self::Stalled),
            other => Err(HookError::Storage(format!(
                "Unknown project status '{}'. Valid values: pending, done, stalled",
                other
            ))),
        }
    }
}

/// Stored project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub url: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// Stored content row, one generated idea attributed to one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub project_id: i64,
    pub agent_name: String,
    pub hook: String,
    pub idea: String,
    pub source: String,
}

/// One idea as returned by the model.
///
/// The model names the body `content`; it is persisted as `idea`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaItem {
    pub hook: String,
    pub content: String,
    pub source: String,
}

impl IdeaItem {
    pub fn new(
        hook: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            hook: hook.into(),
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Top-level document every agent must answer with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaBatch {
    pub ideas: Vec<IdeaItem>,
}
