//! Repository Tree Model
//!
//! Mutable, hierarchical mirror of one remote branch's directory tree,
//! built incrementally from per-directory listings and queried with
//! normalized relative-path semantics.

pub mod node;
pub mod path;

pub use node::{ContentRecord, TreeNode};
