//! Access resolution logic.
//!
//! Computes the effective access decision for every node of a catalog
//! tree, for one viewer's grant/override snapshot, at one instant.
//!
//! Resolution order, per grant:
//! 1. A node directly covered by the grant gets the grant's baseline:
//!    open, or pending until `granted_at + delay`.
//! 2. Every other node inherits its parent's resolved state.
//! 3. An override keyed to the grant's scope wins locally over both:
//!    `locked` closes the subtree, `pending` re-times it, `unlocked`
//!    re-opens it.
//!
//! Grants then merge most-permissively per node: open beats pending beats
//! closed; among pendings the earliest release instant wins. Pending
//! states whose release instant has already passed are normalized to open
//! before the result is returned.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    AccessOverride, EffectiveAccess, Grant, OverrideStatus, ScopeIndex, ScopeType,
};
use crate::catalog::{ContentNode, ContentTree, TreeError};

/// Resolution failure. No partial result is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The catalog snapshot is structurally broken.
    #[error(transparent)]
    MalformedTree(#[from] TreeError),

    /// A grant row carries a scope type the resolver does not recognize.
    #[error("unrecognized grant scope type \"{value}\"")]
    UnknownScope { value: String },
}

/// Per-node state while a single grant's walk is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    None,
    Pending(DateTime<Utc>),
    Now,
}

impl NodeState {
    /// Most-permissive merge: open > pending > closed, earliest release
    /// instant among pendings.
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Now, _) | (_, Self::Now) => Self::Now,
            (Self::Pending(a), Self::Pending(b)) => Self::Pending(a.min(b)),
            (Self::Pending(at), Self::None) | (Self::None, Self::Pending(at)) => Self::Pending(at),
            (Self::None, Self::None) => Self::None,
        }
    }
}

/// Pending only while the release instant is still ahead; an elapsed
/// instant reads as open (stale-pending self-healing).
fn timed(available_at: DateTime<Utc>, now: DateTime<Utc>) -> NodeState {
    if available_at > now {
        NodeState::Pending(available_at)
    } else {
        NodeState::Now
    }
}

fn apply_override(
    ovr: &AccessOverride,
    granted_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> NodeState {
    match ovr.status {
        OverrideStatus::Locked => NodeState::None,
        OverrideStatus::Unlocked => NodeState::Now,
        OverrideStatus::Pending => {
            // The override's delay anchors to the grant's baseline, not to
            // any timestamp of its own.
            let available_at = ovr
                .delay()
                .map_or(granted_at, |delay| delay.available_at(granted_at));
            timed(available_at, now)
        }
    }
}

/// Whether a grant's scope covers this node directly.
fn covers(scope: ScopeType, scope_id: Uuid, node: &ContentNode, scopes: &ScopeIndex) -> bool {
    match scope {
        ScopeType::Content => node.id == scope_id,
        ScopeType::Bundle => scopes.bundle_contains(scope_id, node.id),
        ScopeType::Variation => scopes.variation_contains(scope_id, node.id),
    }
}

/// Resolve effective access for every node of `tree`.
///
/// Pure and synchronous: inputs are immutable snapshots, `now` is passed
/// in, and repeated calls with identical inputs return identical output.
/// Overrides under scopes the viewer holds no grant for are ignored as
/// stale data. Returns exactly one entry per tree node.
pub fn resolve(
    tree: &ContentTree,
    grants: &[Grant],
    overrides: &[AccessOverride],
    scopes: &ScopeIndex,
    now: DateTime<Utc>,
) -> Result<HashMap<Uuid, EffectiveAccess>, ResolveError> {
    // Parse every scope type up front; one unrecognized row fails the
    // whole call, covering or not.
    let parsed = grants
        .iter()
        .map(|grant| {
            ScopeType::parse(&grant.scope_type)
                .map(|scope| (scope, grant))
                .ok_or_else(|| ResolveError::UnknownScope {
                    value: grant.scope_type.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Overrides are unique per (scope, node) in storage; if a stale
    // snapshot carries duplicates, the first row wins deterministically.
    let mut override_index: HashMap<(Uuid, Uuid), &AccessOverride> = HashMap::new();
    for ovr in overrides {
        override_index.entry((ovr.scope_id, ovr.node_id)).or_insert(ovr);
    }

    let order = tree.walk_ids();
    let mut resolved: HashMap<Uuid, NodeState> =
        order.iter().map(|id| (*id, NodeState::None)).collect();

    for (scope, grant) in parsed {
        let baseline = grant.delay().map_or(NodeState::Now, |delay| {
            timed(delay.available_at(grant.granted_at), now)
        });

        let mut states: HashMap<Uuid, NodeState> = HashMap::with_capacity(order.len());
        for id in &order {
            let Some(node) = tree.get(*id) else { continue };
            let inherited = node
                .parent_id
                .and_then(|parent| states.get(&parent).copied())
                .unwrap_or(NodeState::None);

            let state = if let Some(ovr) = override_index.get(&(grant.scope_id, *id)) {
                apply_override(ovr, grant.granted_at, now)
            } else if covers(scope, grant.scope_id, node, scopes) {
                inherited.merge(baseline)
            } else {
                inherited
            };
            states.insert(*id, state);
        }

        for (id, state) in states {
            if let Some(entry) = resolved.get_mut(&id) {
                *entry = entry.merge(state);
            }
        }
    }

    Ok(resolved
        .into_iter()
        .map(|(id, state)| {
            let access = match state {
                NodeState::None => EffectiveAccess::none(id),
                NodeState::Now => EffectiveAccess::now(id),
                // `timed` keeps elapsed instants out of Pending, so the
                // entry is consistent by construction.
                NodeState::Pending(at) => EffectiveAccess::pending(id, at),
            };
            (id, access)
        })
        .collect())
}

/// Build the tree from a flat row snapshot, then resolve.
///
/// Structural defects in the snapshot surface as
/// [`ResolveError::MalformedTree`] from this one call.
pub fn resolve_nodes(
    nodes: &[ContentNode],
    grants: &[Grant],
    overrides: &[AccessOverride],
    scopes: &ScopeIndex,
    now: DateTime<Utc>,
) -> Result<HashMap<Uuid, EffectiveAccess>, ResolveError> {
    let tree = ContentTree::build(nodes.to_vec())?;
    resolve(&tree, grants, overrides, scopes, now)
}
