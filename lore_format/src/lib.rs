//! # Lore Format
//!
//! The data model crate for lore activation graphs. It holds every shape that
//! crosses a boundary: the verbose authoring graph, the string table, the
//! compact Behavior/Data documents and the runtime conversation context.
//! This crate does not evaluate anything.
//!
//! ## Core Components
//!
//! - **strings**: Deduplicating string table shared by the compact documents
//! - **graph**: Verbose authoring graph, lore entries and node type registry
//! - **compact**: Compact values, ordered property lists and the two documents
//! - **context**: The mutable per-turn record supplied by the host

pub mod compact;
pub mod context;
pub mod error;
pub mod graph;
pub mod strings;

pub use compact::*;
pub use context::*;
pub use error::*;
pub use graph::*;
pub use strings::*;
