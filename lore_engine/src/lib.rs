//! # Lore Engine
//!
//! Compiles authored lore activation graphs into compact documents and
//! evaluates them, once per conversation turn, against a live context to
//! decide which lore entries reach the character description.
//!
//! ## Core Components
//!
//! - **compiler**: Lowers the verbose graph and entries into Behavior/Data documents
//! - **interpreter**: Lazy, memoized, cycle-safe evaluation of a behavior graph
//! - **operators**: The node kinds the interpreter dispatches to
//! - **config**: Run settings loaded from TOML
//!
//! ## Design Philosophy
//!
//! - **Fail-Soft**: A bad node or edge is skipped at compile time; a bad input is a neutral value at run time
//! - **Pull-Based**: Only nodes reachable from a root are ever evaluated
//! - **Run-Scoped State**: Memo cache, recursion guard and recorders live and die with one run

pub mod compiler;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod operators;

pub use compiler::*;
pub use config::*;
pub use error::*;
pub use interpreter::*;
pub use operators::{OperatorKind, Outputs};
