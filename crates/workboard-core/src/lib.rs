//! workboard-core library.
//!
//! A board owns a set of work items (tasks, stories, features, epics) and
//! keeps every parent/child link symmetric across create, update, link,
//! unlink and delete.
//!
//! # Conventions
//!
//! - **Errors**: [`BoardError`] for board and item operations;
//!   `anyhow::Result` for config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod verify;

pub use config::{BoardConfig, CyclePolicy};
pub use error::{BoardError, ErrorCode, ErrorKind, ValidationError};
pub use model::board::{BoardId, WorkBoard, WorkItemUpdate};
pub use model::item::{ItemId, ItemType, NewWorkItem, Status, WorkItem};
