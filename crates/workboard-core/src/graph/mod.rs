//! Graph-level queries over a board's parent/child links.
//!
//! ## Submodules
//!
//! - [`hierarchy`]: subtrees, ancestor chains, cycle checks, and progress
//!   roll-up.

pub mod hierarchy;
