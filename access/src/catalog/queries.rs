//! Database queries for the content catalog.

use sqlx::PgPool;
use uuid::Uuid;

use super::models::{ContentNode, MediaKind, NodeKind};

/// Fetch the subtree rooted at `root_id`, parents before children,
/// siblings in display order.
///
/// The first row is re-rooted (its `parent_id` is nulled) so the snapshot
/// is a valid single-rooted tree even when `root_id` sits mid-hierarchy.
pub async fn get_subtree_nodes(pool: &PgPool, root_id: Uuid) -> sqlx::Result<Vec<ContentNode>> {
    sqlx::query_as::<_, ContentNode>(
        r"
        WITH RECURSIVE subtree AS (
            SELECT id, kind, media_kind, title, position,
                   NULL::uuid AS parent_id,
                   created_at, updated_at, 0 AS depth
            FROM catalog_nodes
            WHERE id = $1
            UNION ALL
            SELECT n.id, n.kind, n.media_kind, n.title, n.position,
                   n.parent_id,
                   n.created_at, n.updated_at, s.depth + 1
            FROM catalog_nodes n
            INNER JOIN subtree s ON n.parent_id = s.id
        )
        SELECT id, kind, media_kind, title, position, parent_id, created_at, updated_at
        FROM subtree
        ORDER BY depth ASC, position ASC
        ",
    )
    .bind(root_id)
    .fetch_all(pool)
    .await
}

/// Get a single catalog node by ID.
pub async fn get_node(pool: &PgPool, node_id: Uuid) -> sqlx::Result<Option<ContentNode>> {
    sqlx::query_as::<_, ContentNode>(
        r"
        SELECT id, kind, media_kind, title, position, parent_id, created_at, updated_at
        FROM catalog_nodes
        WHERE id = $1
        ",
    )
    .bind(node_id)
    .fetch_optional(pool)
    .await
}

/// Create a new catalog node.
pub async fn create_node(
    pool: &PgPool,
    kind: NodeKind,
    media_kind: Option<MediaKind>,
    title: &str,
    position: i32,
    parent_id: Option<Uuid>,
) -> sqlx::Result<ContentNode> {
    sqlx::query_as::<_, ContentNode>(
        r"
        INSERT INTO catalog_nodes (kind, media_kind, title, position, parent_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, kind, media_kind, title, position, parent_id, created_at, updated_at
        ",
    )
    .bind(kind)
    .bind(media_kind)
    .bind(title)
    .bind(position)
    .bind(parent_id)
    .fetch_one(pool)
    .await
}

/// Update a catalog node's display fields.
///
/// Uses COALESCE to only update provided fields.
pub async fn update_node(
    pool: &PgPool,
    node_id: Uuid,
    title: Option<&str>,
    position: Option<i32>,
) -> sqlx::Result<Option<ContentNode>> {
    sqlx::query_as::<_, ContentNode>(
        r"
        UPDATE catalog_nodes
        SET title = COALESCE($2, title),
            position = COALESCE($3, position),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, kind, media_kind, title, position, parent_id, created_at, updated_at
        ",
    )
    .bind(node_id)
    .bind(title)
    .bind(position)
    .fetch_optional(pool)
    .await
}

/// Delete a catalog node. Descendants cascade in storage.
///
/// Returns `true` if a node was deleted, `false` if not found.
pub async fn delete_node(pool: &PgPool, node_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM catalog_nodes WHERE id = $1")
        .bind(node_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
