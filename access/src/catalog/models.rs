//! Catalog row models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Position in the content hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "node_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Root grouping of content items.
    Collection,
    /// A course or program.
    Content,
    /// Ordered section within a content item.
    Module,
    /// Leaf item inside a module.
    Media,
}

/// Kind of leaf media. Carried for display purposes only; access
/// resolution does not distinguish media kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Text,
    AiTool,
    Pdf,
    Quiz,
}

/// One node of the catalog tree.
///
/// Collections have no parent; every other node is owned by exactly one
/// parent. Siblings sort ascending by `position` (values need not be
/// contiguous), ties broken by stable input order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: Uuid,
    pub kind: NodeKind,
    pub media_kind: Option<MediaKind>,
    pub title: String,
    pub position: i32,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentNode {
    /// Whether this node can carry children.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        !matches!(self.kind, NodeKind::Media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_is_not_a_branch() {
        let now = Utc::now();
        let node = ContentNode {
            id: Uuid::new_v4(),
            kind: NodeKind::Media,
            media_kind: Some(MediaKind::Video),
            title: "Intro".into(),
            position: 0,
            parent_id: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        };
        assert!(!node.is_branch());
    }

    #[test]
    fn test_branch_kinds() {
        let now = Utc::now();
        for kind in [NodeKind::Collection, NodeKind::Content, NodeKind::Module] {
            let node = ContentNode {
                id: Uuid::new_v4(),
                kind,
                media_kind: None,
                title: "n".into(),
                position: 0,
                parent_id: None,
                created_at: now,
                updated_at: now,
            };
            assert!(node.is_branch());
        }
    }
}
