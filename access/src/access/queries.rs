//! Database queries for the access system.
//!
//! Provides async functions for:
//! - Grant snapshots and back-office grant management
//! - Per-node override snapshots and management
//! - Bundle/variation membership (the scope index)

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::drip::AccessDelay;
use super::models::{AccessOverride, Grant, OverrideStatus, ScopeIndex, ScopeType};

// ============================================================================
// Grant Queries
// ============================================================================

/// Get all grants held by a viewer, oldest first.
pub async fn get_viewer_grants(pool: &PgPool, viewer_id: Uuid) -> sqlx::Result<Vec<Grant>> {
    sqlx::query_as::<_, Grant>(
        r"
        SELECT id, viewer_id, scope_type, scope_id, granted_at, delay_value, delay_unit
        FROM access_grants
        WHERE viewer_id = $1
        ORDER BY granted_at ASC
        ",
    )
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}

/// Create or refresh a grant.
///
/// Re-granting an existing `(viewer, scope)` pair refreshes the baseline
/// timestamp and delay, so a repeat purchase restarts its drip schedule.
pub async fn create_grant(
    pool: &PgPool,
    viewer_id: Uuid,
    scope: ScopeType,
    scope_id: Uuid,
    granted_at: DateTime<Utc>,
    delay: Option<AccessDelay>,
) -> sqlx::Result<Grant> {
    let delay_value = delay.map(|d| i32::try_from(d.value).unwrap_or(i32::MAX));
    let delay_unit = delay.map(|d| d.unit);

    sqlx::query_as::<_, Grant>(
        r"
        INSERT INTO access_grants (viewer_id, scope_type, scope_id, granted_at, delay_value, delay_unit)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (viewer_id, scope_type, scope_id) DO UPDATE
        SET granted_at = EXCLUDED.granted_at,
            delay_value = EXCLUDED.delay_value,
            delay_unit = EXCLUDED.delay_unit
        RETURNING id, viewer_id, scope_type, scope_id, granted_at, delay_value, delay_unit
        ",
    )
    .bind(viewer_id)
    .bind(scope.as_str())
    .bind(scope_id)
    .bind(granted_at)
    .bind(delay_value)
    .bind(delay_unit)
    .fetch_one(pool)
    .await
}

/// Revoke a grant.
///
/// Returns `true` if a grant was revoked, `false` if the viewer did not
/// hold it.
pub async fn revoke_grant(
    pool: &PgPool,
    viewer_id: Uuid,
    scope: ScopeType,
    scope_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        DELETE FROM access_grants
        WHERE viewer_id = $1
          AND scope_type = $2
          AND scope_id = $3
        ",
    )
    .bind(viewer_id)
    .bind(scope.as_str())
    .bind(scope_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Override Queries
// ============================================================================

/// Get all overrides keyed to any of the given grant scopes.
pub async fn get_overrides_for_scopes(
    pool: &PgPool,
    scope_ids: &[Uuid],
) -> sqlx::Result<Vec<AccessOverride>> {
    sqlx::query_as::<_, AccessOverride>(
        r"
        SELECT id, scope_id, node_id, status, delay_value, delay_unit
        FROM access_overrides
        WHERE scope_id = ANY($1)
        ",
    )
    .bind(scope_ids)
    .fetch_all(pool)
    .await
}

/// Set or update a per-node override.
///
/// Uses ON CONFLICT UPDATE to upsert the override.
pub async fn set_override(
    pool: &PgPool,
    scope_id: Uuid,
    node_id: Uuid,
    status: OverrideStatus,
    delay: Option<AccessDelay>,
) -> sqlx::Result<AccessOverride> {
    let delay_value = delay.map(|d| i32::try_from(d.value).unwrap_or(i32::MAX));
    let delay_unit = delay.map(|d| d.unit);

    sqlx::query_as::<_, AccessOverride>(
        r"
        INSERT INTO access_overrides (scope_id, node_id, status, delay_value, delay_unit)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (scope_id, node_id) DO UPDATE
        SET status = EXCLUDED.status,
            delay_value = EXCLUDED.delay_value,
            delay_unit = EXCLUDED.delay_unit
        RETURNING id, scope_id, node_id, status, delay_value, delay_unit
        ",
    )
    .bind(scope_id)
    .bind(node_id)
    .bind(status)
    .bind(delay_value)
    .bind(delay_unit)
    .fetch_one(pool)
    .await
}

/// Remove a per-node override.
///
/// Returns `true` if an override was removed, `false` if none existed.
pub async fn clear_override(pool: &PgPool, scope_id: Uuid, node_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        DELETE FROM access_overrides
        WHERE scope_id = $1
          AND node_id = $2
        ",
    )
    .bind(scope_id)
    .bind(node_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Scope Membership Queries
// ============================================================================

/// Content ids of the scopes of one type among a viewer's grants.
fn scope_ids_of(grants: &[Grant], scope: ScopeType) -> Vec<Uuid> {
    grants
        .iter()
        .filter(|g| ScopeType::parse(&g.scope_type) == Some(scope))
        .map(|g| g.scope_id)
        .collect()
}

/// Load bundle/variation membership for the scopes a viewer holds.
///
/// Only the grants' own scopes are materialized; the resolver never needs
/// membership of scopes the viewer has no grant for.
pub async fn load_scope_index(pool: &PgPool, grants: &[Grant]) -> sqlx::Result<ScopeIndex> {
    let mut index = ScopeIndex::new();

    let bundle_ids = scope_ids_of(grants, ScopeType::Bundle);
    if !bundle_ids.is_empty() {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r"
            SELECT bundle_id, content_id
            FROM bundle_members
            WHERE bundle_id = ANY($1)
            ",
        )
        .bind(&bundle_ids)
        .fetch_all(pool)
        .await?;
        for (bundle_id, content_id) in rows {
            index.add_bundle_member(bundle_id, content_id);
        }
    }

    let variation_ids = scope_ids_of(grants, ScopeType::Variation);
    if !variation_ids.is_empty() {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r"
            SELECT variation_id, content_id
            FROM variation_members
            WHERE variation_id = ANY($1)
            ",
        )
        .bind(&variation_ids)
        .fetch_all(pool)
        .await?;
        for (variation_id, content_id) in rows {
            index.add_variation_member(variation_id, content_id);
        }
    }

    Ok(index)
}

/// Add a content item to a bundle.
///
/// Uses ON CONFLICT DO NOTHING to silently ignore duplicate memberships.
pub async fn add_bundle_member(
    pool: &PgPool,
    bundle_id: Uuid,
    content_id: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO bundle_members (bundle_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (bundle_id, content_id) DO NOTHING
        ",
    )
    .bind(bundle_id)
    .bind(content_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a content item from a bundle.
///
/// Returns `true` if a membership was removed.
pub async fn remove_bundle_member(
    pool: &PgPool,
    bundle_id: Uuid,
    content_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        DELETE FROM bundle_members
        WHERE bundle_id = $1
          AND content_id = $2
        ",
    )
    .bind(bundle_id)
    .bind(content_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Add a content item to a variation.
///
/// Uses ON CONFLICT DO NOTHING to silently ignore duplicate memberships.
pub async fn add_variation_member(
    pool: &PgPool,
    variation_id: Uuid,
    content_id: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO variation_members (variation_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (variation_id, content_id) DO NOTHING
        ",
    )
    .bind(variation_id)
    .bind(content_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a content item from a variation.
///
/// Returns `true` if a membership was removed.
pub async fn remove_variation_member(
    pool: &PgPool,
    variation_id: Uuid,
    content_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        DELETE FROM variation_members
        WHERE variation_id = $1
          AND content_id = $2
        ",
    )
    .bind(variation_id)
    .bind(content_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
