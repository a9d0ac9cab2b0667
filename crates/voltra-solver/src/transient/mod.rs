//! The implicit MNA/BDF2 transient engine.
//!
//! - [`types`] - run parameters and accumulated statistics
//! - [`result`] - the time series result type and its accessors
//! - [`solver`] - the predict/stamp/solve/damp/accept step loop

pub mod result;
pub mod solver;
pub mod types;

pub use result::{TimePoint, TransientResult};
pub use solver::run_transient;
pub use types::{RunStatistics, TransientParams};
