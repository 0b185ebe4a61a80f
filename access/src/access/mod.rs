//! Viewer access system.
//!
//! Three-layer model:
//! - Grants: evidence a viewer may access a scope (one content item, a
//!   bundle, or a variation), optionally drip-delayed
//! - Overrides: per-node exceptions layered on a grant's scope
//! - Resolution: the pure pass that merges both over a catalog tree into
//!   one effective decision per node

pub mod drip;
pub mod helpers;
pub mod models;
pub mod queries;
pub mod resolver;

pub use drip::{AccessDelay, DelayUnit};
pub use helpers::{
    filter_accessible_nodes, get_viewer_access_context, AccessError, ViewerAccessContext,
};
pub use models::*;
pub use queries::*;
pub use resolver::{resolve, resolve_nodes, ResolveError};
