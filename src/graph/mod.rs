//! Graph assembler.
//!
//! Builds project-scoped views from the entity store's raw collections. It
//! holds no state of its own; every call joins the current collections by
//! `project_id` and rebuilds commit ancestry from `parent_ids`.
//!
//! ```text
//! StoreState ──► project commits ──► CommitDag (petgraph)
//!                                        │
//!                          topological order / ancestors
//!                                        │
//!                ProjectGraph · ProjectStats · ContributionData
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Aggregates (ProjectGraph, ProjectStats, ContributionData) and CommitDag
//! - [`algorithms`]: Edge derivation, topological order, ancestor search
//! - [`assembler`]: Joins over `StoreState`

pub mod algorithms;
pub mod assembler;
pub mod models;

pub use algorithms::{ancestors, derive_edges, topological_order};
pub use assembler::sort_branches;
pub use models::{
    CommitDag, CommitNode, ContributionData, ContributionDay, ProjectGraph, ProjectStats,
};
