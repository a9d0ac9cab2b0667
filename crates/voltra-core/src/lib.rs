//! Core circuit representation: node indexing, the MNA buffer, the element
//! contract, and the circuit container shared by `voltra-devices` and
//! `voltra-solver`.

pub mod circuit;
pub mod element;
pub mod error;
pub mod mna;
pub mod node;

pub use circuit::Circuit;
pub use element::{CouplingDecl, Element, Expansion, StateVarKind, StateVarSpec};
pub use error::{CoreError, Result};
pub use mna::MnaSystem;
pub use node::{NodeIndex, NodeKey};
