//! End-to-end tests for the catalog-to-decision pipeline.
//!
//! The pipeline under test is pure (row snapshots in, decisions out), so
//! no database is required; database-backed loaders are exercised against
//! a live pool by the deployment's own smoke tests.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use academy_access::access::{
    filter_accessible_nodes, resolve_nodes, AccessDelay, AccessOverride, AccessState, DelayUnit,
    EffectiveAccess, Grant, OverrideStatus, ResolveError, ScopeIndex, ViewerAccessContext,
};
use academy_access::catalog::{ContentNode, MediaKind, NodeKind, TreeError};

fn node(
    id: Uuid,
    kind: NodeKind,
    parent: Option<Uuid>,
    position: i32,
    title: &str,
) -> ContentNode {
    let now = Utc::now();
    ContentNode {
        id,
        kind,
        media_kind: matches!(kind, NodeKind::Media).then_some(MediaKind::Video),
        title: title.into(),
        position,
        parent_id: parent,
        created_at: now,
        updated_at: now,
    }
}

/// A small academy catalog:
///
/// ```text
/// Collection "Foundations"
/// └── Content "Persuasion 101"
///     ├── Module "Week 1"
///     │   ├── Media "Welcome"
///     │   └── Media "Framing"
///     └── Module "Week 2"
///         └── Media "Objections"
/// ```
struct Catalog {
    collection: Uuid,
    content: Uuid,
    week1: Uuid,
    week2: Uuid,
    welcome: Uuid,
    framing: Uuid,
    objections: Uuid,
    nodes: Vec<ContentNode>,
}

fn catalog() -> Catalog {
    let collection = Uuid::new_v4();
    let content = Uuid::new_v4();
    let week1 = Uuid::new_v4();
    let week2 = Uuid::new_v4();
    let welcome = Uuid::new_v4();
    let framing = Uuid::new_v4();
    let objections = Uuid::new_v4();

    let nodes = vec![
        node(collection, NodeKind::Collection, None, 0, "Foundations"),
        node(content, NodeKind::Content, Some(collection), 0, "Persuasion 101"),
        node(week1, NodeKind::Module, Some(content), 10, "Week 1"),
        node(week2, NodeKind::Module, Some(content), 20, "Week 2"),
        node(welcome, NodeKind::Media, Some(week1), 0, "Welcome"),
        node(framing, NodeKind::Media, Some(week1), 1, "Framing"),
        node(objections, NodeKind::Media, Some(week2), 0, "Objections"),
    ];

    Catalog {
        collection,
        content,
        week1,
        week2,
        welcome,
        framing,
        objections,
        nodes,
    }
}

fn content_grant(viewer_id: Uuid, content_id: Uuid, granted_at: DateTime<Utc>) -> Grant {
    Grant {
        id: Uuid::new_v4(),
        viewer_id,
        scope_type: "content".into(),
        scope_id: content_id,
        granted_at,
        delay_value: None,
        delay_unit: None,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

#[test]
fn test_no_grants_closes_the_whole_catalog() {
    let cat = catalog();
    let result = resolve_nodes(&cat.nodes, &[], &[], &ScopeIndex::new(), t0()).unwrap();

    assert_eq!(result.len(), cat.nodes.len());
    for decision in result.values() {
        assert_eq!(decision.state, AccessState::None);
        assert_eq!(decision.available_at, None);
    }
}

#[test]
fn test_content_grant_opens_the_course_but_not_the_collection() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let grant = content_grant(viewer, cat.content, t0());

    let result = resolve_nodes(&cat.nodes, &[grant], &[], &ScopeIndex::new(), t0()).unwrap();

    assert_eq!(result[&cat.collection].state, AccessState::None);
    for id in [cat.content, cat.week1, cat.week2, cat.welcome, cat.framing, cat.objections] {
        assert_eq!(result[&id].state, AccessState::Now);
    }
}

#[test]
fn test_dripped_grant_opens_after_the_delay_elapses() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let mut grant = content_grant(viewer, cat.content, t0());
    grant.delay_value = Some(2);
    grant.delay_unit = Some(DelayUnit::Weeks);
    let release = t0() + Duration::days(14);

    let before = resolve_nodes(&cat.nodes, &[grant.clone()], &[], &ScopeIndex::new(), t0()).unwrap();
    assert_eq!(before[&cat.week1].state, AccessState::Pending);
    assert_eq!(before[&cat.week1].available_at, Some(release));
    assert_eq!(before[&cat.collection].state, AccessState::None);

    let after = resolve_nodes(
        &cat.nodes,
        &[grant],
        &[],
        &ScopeIndex::new(),
        t0() + Duration::days(15),
    )
    .unwrap();
    assert_eq!(after[&cat.week1].state, AccessState::Now);
    assert_eq!(after[&cat.welcome].state, AccessState::Now);
}

#[test]
fn test_module_drip_schedule_via_pending_overrides() {
    // Week 1 opens with the purchase; week 2 drips in a week later.
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let grant = content_grant(viewer, cat.content, t0());
    let drip = AccessOverride {
        id: Uuid::new_v4(),
        scope_id: cat.content,
        node_id: cat.week2,
        status: OverrideStatus::Pending,
        delay_value: Some(1),
        delay_unit: Some(DelayUnit::Weeks),
    };

    let result = resolve_nodes(&cat.nodes, &[grant], &[drip], &ScopeIndex::new(), t0()).unwrap();

    assert_eq!(result[&cat.week1].state, AccessState::Now);
    assert_eq!(result[&cat.framing].state, AccessState::Now);
    assert_eq!(result[&cat.week2].state, AccessState::Pending);
    assert_eq!(result[&cat.week2].available_at, Some(t0() + Duration::days(7)));
    assert_eq!(result[&cat.objections].state, AccessState::Pending);
}

#[test]
fn test_locked_override_closes_a_module_inside_an_open_course() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let grant = content_grant(viewer, cat.content, t0());
    let lock = AccessOverride {
        id: Uuid::new_v4(),
        scope_id: cat.content,
        node_id: cat.week2,
        status: OverrideStatus::Locked,
        delay_value: None,
        delay_unit: None,
    };

    let result = resolve_nodes(&cat.nodes, &[grant], &[lock], &ScopeIndex::new(), t0()).unwrap();

    assert_eq!(result[&cat.content].state, AccessState::Now);
    assert_eq!(result[&cat.week1].state, AccessState::Now);
    assert_eq!(result[&cat.week2].state, AccessState::None);
    assert_eq!(result[&cat.objections].state, AccessState::None);
}

#[test]
fn test_bundle_grant_reaches_member_courses() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let bundle = Uuid::new_v4();
    let mut scopes = ScopeIndex::new();
    scopes.add_bundle_member(bundle, cat.content);

    let grant = Grant {
        id: Uuid::new_v4(),
        viewer_id: viewer,
        scope_type: "bundle".into(),
        scope_id: bundle,
        granted_at: t0(),
        delay_value: None,
        delay_unit: None,
    };

    let result = resolve_nodes(&cat.nodes, &[grant], &[], &scopes, t0()).unwrap();

    assert_eq!(result[&cat.collection].state, AccessState::None);
    assert_eq!(result[&cat.content].state, AccessState::Now);
    assert_eq!(result[&cat.objections].state, AccessState::Now);
}

#[test]
fn test_variation_and_content_grants_merge_most_permissively() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let variation = Uuid::new_v4();
    let mut scopes = ScopeIndex::new();
    scopes.add_variation_member(variation, cat.content);

    // The variation drips for a month; the direct grant is open now.
    let dripped = Grant {
        id: Uuid::new_v4(),
        viewer_id: viewer,
        scope_type: "variation".into(),
        scope_id: variation,
        granted_at: t0(),
        delay_value: Some(1),
        delay_unit: Some(DelayUnit::Months),
    };
    let direct = content_grant(viewer, cat.content, t0());

    let result = resolve_nodes(&cat.nodes, &[dripped, direct], &[], &scopes, t0()).unwrap();
    assert_eq!(result[&cat.content].state, AccessState::Now);
    assert_eq!(result[&cat.welcome].state, AccessState::Now);
}

#[test]
fn test_malformed_snapshot_yields_no_partial_result() {
    let cat = catalog();
    let stray = Uuid::new_v4();
    let missing = Uuid::new_v4();
    let mut nodes = cat.nodes;
    nodes.push(node(stray, NodeKind::Media, Some(missing), 0, "stray"));

    let err = resolve_nodes(&nodes, &[], &[], &ScopeIndex::new(), t0()).unwrap_err();
    assert_eq!(
        err,
        ResolveError::MalformedTree(TreeError::DanglingParent {
            id: stray,
            parent_id: missing,
        })
    );
}

#[test]
fn test_viewer_context_gates_playback() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let grant = content_grant(viewer, cat.content, t0());
    let lock = AccessOverride {
        id: Uuid::new_v4(),
        scope_id: cat.content,
        node_id: cat.week2,
        status: OverrideStatus::Locked,
        delay_value: None,
        delay_unit: None,
    };

    let resolution =
        resolve_nodes(&cat.nodes, &[grant], &[lock], &ScopeIndex::new(), t0()).unwrap();
    let ctx = ViewerAccessContext::from_resolution(viewer, cat.collection, t0(), resolution);

    assert!(ctx.require_access(cat.welcome).is_ok());
    assert!(ctx.require_access(cat.objections).is_err());
    assert!(ctx.require_access(Uuid::new_v4()).is_err());
    assert!(ctx.has_access(cat.content));
    assert!(!ctx.has_access(cat.collection));
}

#[test]
fn test_filtered_display_list_keeps_order_and_pending_rows() {
    let cat = catalog();
    let viewer = Uuid::new_v4();
    let grant = content_grant(viewer, cat.content, t0());
    let drip = AccessOverride {
        id: Uuid::new_v4(),
        scope_id: cat.content,
        node_id: cat.week2,
        status: OverrideStatus::Pending,
        delay_value: Some(10),
        delay_unit: Some(DelayUnit::Days),
    };

    let resolution: HashMap<Uuid, EffectiveAccess> =
        resolve_nodes(&cat.nodes, &[grant], &[drip], &ScopeIndex::new(), t0()).unwrap();

    let visible = filter_accessible_nodes(&cat.nodes, &resolution);
    let ids: Vec<Uuid> = visible.iter().map(|n| n.id).collect();

    // The collection drops; everything under the course stays, week 2
    // still listed (pending) so its release date can be shown.
    assert_eq!(
        ids,
        vec![cat.content, cat.week1, cat.week2, cat.welcome, cat.framing, cat.objections]
    );
}

#[test]
fn test_access_delay_month_arithmetic_clamps() {
    let delay = AccessDelay {
        value: 1,
        unit: DelayUnit::Months,
    };
    let granted_at = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
    assert_eq!(
        delay.available_at(granted_at),
        Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
    );
}
