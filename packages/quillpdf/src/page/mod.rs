//! Page tree, inherited attributes and page sizes

pub mod attrs;
pub mod sizes;
pub mod tree;

pub use tree::{PageTree, DEFAULT_BRANCHING};
