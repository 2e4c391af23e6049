// src/dag/mod.rs

//! Dependency graph and task outcomes.
//!
//! - [`graph`] holds the mutable dependency graph and computes free nodes.
//! - [`result`] defines the value a worker reports back for one node.

pub mod graph;
pub mod result;

pub use graph::{DependencyGraph, NodeId};
pub use result::TaskResult;
