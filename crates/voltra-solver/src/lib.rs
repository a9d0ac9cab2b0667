//! Transient simulation engines for Voltra circuits.
//!
//! Takes a preprocessed circuit and runs either the implicit MNA/BDF2
//! engine (with MCP/LCP resolution for ideal diodes) or the explicit
//! state-space engine. [`strategy::select_strategy`] picks between them.

pub mod error;
pub mod linear;
pub mod mcp;
pub mod preprocessor;
pub mod state_space;
pub mod strategy;
pub mod transient;

pub use error::{Error, Result};
pub use mcp::{McpBranch, McpSolution};
pub use preprocessor::{preprocess, PreprocessedCircuit, StateVarEntry};
pub use state_space::{run_explicit, StateSpaceParams};
pub use strategy::{select_strategy, Strategy};
pub use transient::{run_transient, RunStatistics, TimePoint, TransientParams, TransientResult};
