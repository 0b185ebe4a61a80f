//! Access helper functions for callers.
//!
//! Provides convenience functions to load one viewer's snapshot and
//! resolve it in a single operation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::models::{AccessState, EffectiveAccess};
use super::queries::{get_overrides_for_scopes, get_viewer_grants, load_scope_index};
use super::resolver::{resolve, ResolveError};
use crate::catalog::queries::get_subtree_nodes;
use crate::catalog::{ContentNode, ContentTree};

/// Failure in the load-and-resolve path.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The viewer has no open access to the node.
    #[error("node {node_id} is not accessible")]
    Forbidden { node_id: Uuid },

    /// The node is not part of the resolved tree.
    #[error("node {node_id} not found in resolved tree")]
    NodeNotFound { node_id: Uuid },

    /// Resolution rejected the snapshot.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Database error.
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Pre-computed access decisions for one viewer over one catalog tree.
///
/// Decisions are a point-in-time snapshot: `pending` nodes whose release
/// instant has since passed stay `pending` here until the context is
/// rebuilt.
#[derive(Debug, Clone)]
pub struct ViewerAccessContext {
    pub viewer_id: Uuid,
    pub root_id: Uuid,
    /// Instant the decisions were computed at.
    pub resolved_at: DateTime<Utc>,
    resolution: HashMap<Uuid, EffectiveAccess>,
}

impl ViewerAccessContext {
    /// Wrap an already-computed resolution.
    #[must_use]
    pub const fn from_resolution(
        viewer_id: Uuid,
        root_id: Uuid,
        resolved_at: DateTime<Utc>,
        resolution: HashMap<Uuid, EffectiveAccess>,
    ) -> Self {
        Self {
            viewer_id,
            root_id,
            resolved_at,
            resolution,
        }
    }

    /// The full decision for a node, if the node is in the tree.
    #[must_use]
    pub fn access(&self, node_id: Uuid) -> Option<&EffectiveAccess> {
        self.resolution.get(&node_id)
    }

    /// The resolved state for a node, if the node is in the tree.
    #[must_use]
    pub fn state_of(&self, node_id: Uuid) -> Option<AccessState> {
        self.resolution.get(&node_id).map(|a| a.state)
    }

    /// Whether the node is open for this viewer right now.
    #[must_use]
    pub fn has_access(&self, node_id: Uuid) -> bool {
        self.state_of(node_id) == Some(AccessState::Now)
    }

    /// Release instant of a pending node.
    #[must_use]
    pub fn available_at(&self, node_id: Uuid) -> Option<DateTime<Utc>> {
        self.resolution.get(&node_id).and_then(|a| a.available_at)
    }

    /// Require open access to a node.
    ///
    /// Pending nodes are not yet accessible and fail like closed ones.
    pub fn require_access(&self, node_id: Uuid) -> Result<(), AccessError> {
        match self.state_of(node_id) {
            Some(AccessState::Now) => Ok(()),
            Some(_) => Err(AccessError::Forbidden { node_id }),
            None => Err(AccessError::NodeNotFound { node_id }),
        }
    }

    /// Ids of every node open right now. Unordered; pair with the catalog
    /// snapshot for display ordering.
    #[must_use]
    pub fn accessible_node_ids(&self) -> Vec<Uuid> {
        self.resolution
            .values()
            .filter(|a| a.is_accessible())
            .map(|a| a.node_id)
            .collect()
    }
}

/// Load one viewer's access context for the tree under `root_id`.
///
/// Fetches the catalog subtree, the viewer's grants, the overrides under
/// those grants' scopes and the bundle/variation membership, then resolves
/// at the current instant. The caller is responsible for snapshot
/// consistency (one context per request).
#[tracing::instrument(skip(pool))]
pub async fn get_viewer_access_context(
    pool: &PgPool,
    viewer_id: Uuid,
    root_id: Uuid,
) -> Result<ViewerAccessContext, AccessError> {
    let rows = get_subtree_nodes(pool, root_id).await?;
    let tree = ContentTree::build(rows).map_err(ResolveError::from)?;

    let grants = get_viewer_grants(pool, viewer_id).await?;
    let scope_ids: Vec<Uuid> = grants.iter().map(|g| g.scope_id).collect();
    let overrides = get_overrides_for_scopes(pool, &scope_ids).await?;
    let scopes = load_scope_index(pool, &grants).await?;

    let now = Utc::now();
    let resolution = resolve(&tree, &grants, &overrides, &scopes, now)?;
    debug!(
        nodes = resolution.len(),
        grants = grants.len(),
        overrides = overrides.len(),
        "resolved viewer access"
    );

    Ok(ViewerAccessContext::from_resolution(
        viewer_id, root_id, now, resolution,
    ))
}

/// Keep the nodes a viewer may see in a display list.
///
/// Open and pending nodes stay (consumers render release dates for
/// pending ones); closed nodes and nodes outside the resolution drop.
/// Input order is preserved.
#[must_use]
pub fn filter_accessible_nodes<'a>(
    nodes: &'a [ContentNode],
    resolution: &HashMap<Uuid, EffectiveAccess>,
) -> Vec<&'a ContentNode> {
    nodes
        .iter()
        .filter(|node| {
            resolution
                .get(&node.id)
                .is_some_and(|a| a.state != AccessState::None)
        })
        .collect()
}
