//! Academy Access
//!
//! Catalog tree and viewer access resolution for the Academy learning
//! platform. Decides, for every node of a collection/content/module/media
//! hierarchy, whether a viewer's grants and per-node overrides open it
//! now, later (drip release), or not at all.

pub mod access;
pub mod catalog;
pub mod config;
pub mod db;
