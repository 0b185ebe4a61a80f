//! Content catalog.
//!
//! The catalog is the four-level content hierarchy the platform serves:
//! collections group content, content is split into ordered modules, and
//! modules hold leaf media items. This module owns the row models, the
//! validated in-memory tree built from them, and the database queries that
//! load and maintain catalog rows.

pub mod models;
pub mod queries;
pub mod tree;

pub use models::{ContentNode, MediaKind, NodeKind};
pub use queries::*;
pub use tree::{ContentTree, TreeError};
