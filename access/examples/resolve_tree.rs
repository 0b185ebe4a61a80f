//! Resolve a small in-memory catalog and print each node's decision.
//!
//! Run with: `cargo run --example resolve_tree`

use chrono::{Duration, Utc};
use uuid::Uuid;

use academy_access::access::{resolve_nodes, AccessOverride, Grant, OverrideStatus, ScopeIndex};
use academy_access::catalog::{ContentNode, MediaKind, NodeKind};

fn node(id: Uuid, kind: NodeKind, parent: Option<Uuid>, position: i32, title: &str) -> ContentNode {
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

fn main() {
    let course = Uuid::new_v4();
    let week1 = Uuid::new_v4();
    let week2 = Uuid::new_v4();
    let intro = Uuid::new_v4();

    let nodes = vec![
        node(course, NodeKind::Content, None, 0, "Persuasion 101"),
        node(week1, NodeKind::Module, Some(course), 10, "Week 1"),
        node(week2, NodeKind::Module, Some(course), 20, "Week 2"),
        node(intro, NodeKind::Media, Some(week1), 0, "Welcome"),
    ];

    let viewer = Uuid::new_v4();
    let grant = Grant {
        id: Uuid::new_v4(),
        viewer_id: viewer,
        scope_type: "content".into(),
        scope_id: course,
        granted_at: Utc::now() - Duration::days(3),
        delay_value: None,
        delay_unit: None,
    };

    // Week 2 drips in one week after purchase.
    let drip = AccessOverride {
        id: Uuid::new_v4(),
        scope_id: course,
        node_id: week2,
        status: OverrideStatus::Pending,
        delay_value: Some(1),
        delay_unit: Some(academy_access::access::DelayUnit::Weeks),
    };

    let result = resolve_nodes(&nodes, &[grant], &[drip], &ScopeIndex::new(), Utc::now())
        .expect("valid snapshot");

    for n in &nodes {
        let decision = &result[&n.id];
        match decision.available_at {
            Some(at) => println!("{:<16} {:?} (opens {at})", n.title, decision.state),
            None => println!("{:<16} {:?}", n.title, decision.state),
        }
    }
}
