//! Access row models and resolution output types.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::drip::{AccessDelay, DelayUnit};

/// Scope a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// A single content item.
    Content,
    /// A fixed bundle of content items sold together.
    Bundle,
    /// A variation (tier) of a bundle with its own content set.
    Variation,
}

impl ScopeType {
    /// Parse the row-level string. Returns `None` for values the resolver
    /// does not recognize.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "content" => Some(Self::Content),
            "bundle" => Some(Self::Bundle),
            "variation" => Some(Self::Variation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Bundle => "bundle",
            Self::Variation => "variation",
        }
    }
}

/// Evidence that a viewer may access a scope.
///
/// Grants are independent and additive: any one satisfied grant covering a
/// node, directly or via ancestry, yields access.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Grant {
    pub id: Uuid,
    pub viewer_id: Uuid,
    /// One of `content`, `bundle`, `variation`. Free-form on the row (the
    /// admin tooling writes it); the resolver rejects unknown values.
    pub scope_type: String,
    pub scope_id: Uuid,
    /// Baseline for drip-delay computation.
    pub granted_at: DateTime<Utc>,
    pub delay_value: Option<i32>,
    pub delay_unit: Option<DelayUnit>,
}

impl Grant {
    /// Drip delay, if the row carries a complete one.
    ///
    /// A missing unit, missing value, or negative value reads as "no
    /// delay" — the lenient interpretation never locks a viewer out of
    /// something they paid for.
    #[must_use]
    pub fn delay(&self) -> Option<AccessDelay> {
        delay_from_columns(self.delay_value, self.delay_unit)
    }
}

/// Status of a per-node override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "override_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OverrideStatus {
    /// Node (and its subtree) is closed regardless of the grant.
    Locked,
    /// Node opens after the override's own delay, anchored to the grant.
    Pending,
    /// Node is open even where the grant alone would not open it.
    Unlocked,
}

/// Per-node exception layered on top of a grant's scope, keyed by
/// `(scope_id, node_id)`. Applies to the node and its descendants unless a
/// more specific override further down says otherwise.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessOverride {
    pub id: Uuid,
    pub scope_id: Uuid,
    pub node_id: Uuid,
    pub status: OverrideStatus,
    pub delay_value: Option<i32>,
    pub delay_unit: Option<DelayUnit>,
}

impl AccessOverride {
    /// Drip delay for `pending` overrides. Same lenient reading as
    /// [`Grant::delay`].
    #[must_use]
    pub fn delay(&self) -> Option<AccessDelay> {
        delay_from_columns(self.delay_value, self.delay_unit)
    }
}

fn delay_from_columns(value: Option<i32>, unit: Option<DelayUnit>) -> Option<AccessDelay> {
    match (value, unit) {
        (Some(v), Some(unit)) if v >= 0 => Some(AccessDelay {
            value: v.unsigned_abs(),
            unit,
        }),
        _ => None,
    }
}

/// Materialized bundle/variation membership for the scopes a viewer holds.
///
/// This is the join the resolver consults to decide whether a
/// bundle/variation grant covers a content node; it is loaded per
/// resolution pass, scoped to the viewer's grants.
#[derive(Debug, Clone, Default)]
pub struct ScopeIndex {
    bundles: HashMap<Uuid, HashSet<Uuid>>,
    variations: HashMap<Uuid, HashSet<Uuid>>,
}

impl ScopeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bundle_member(&mut self, bundle_id: Uuid, content_id: Uuid) {
        self.bundles.entry(bundle_id).or_default().insert(content_id);
    }

    pub fn add_variation_member(&mut self, variation_id: Uuid, content_id: Uuid) {
        self.variations
            .entry(variation_id)
            .or_default()
            .insert(content_id);
    }

    #[must_use]
    pub fn bundle_contains(&self, bundle_id: Uuid, content_id: Uuid) -> bool {
        self.bundles
            .get(&bundle_id)
            .is_some_and(|members| members.contains(&content_id))
    }

    #[must_use]
    pub fn variation_contains(&self, variation_id: Uuid, content_id: Uuid) -> bool {
        self.variations
            .get(&variation_id)
            .is_some_and(|members| members.contains(&content_id))
    }
}

/// Resolved access state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    /// Accessible right now.
    Now,
    /// Accessible later; the decision carries the release instant.
    Pending,
    /// Not accessible.
    None,
}

/// The resolver's output for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveAccess {
    pub node_id: Uuid,
    pub state: AccessState,
    /// Release instant; present exactly when `state` is `Pending`.
    pub available_at: Option<DateTime<Utc>>,
}

impl EffectiveAccess {
    #[must_use]
    pub const fn none(node_id: Uuid) -> Self {
        Self {
            node_id,
            state: AccessState::None,
            available_at: None,
        }
    }

    #[must_use]
    pub const fn now(node_id: Uuid) -> Self {
        Self {
            node_id,
            state: AccessState::Now,
            available_at: None,
        }
    }

    #[must_use]
    pub const fn pending(node_id: Uuid, available_at: DateTime<Utc>) -> Self {
        Self {
            node_id,
            state: AccessState::Pending,
            available_at: Some(available_at),
        }
    }

    /// Whether the node is open at resolution time.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.state == AccessState::Now
    }
}
