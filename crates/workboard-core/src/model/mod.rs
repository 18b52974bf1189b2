//! Work items and the board that owns them.

pub mod board;
pub mod item;
