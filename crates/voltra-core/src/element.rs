//! The element contract every device in `voltra-devices` implements.

use nalgebra::DVector;

use crate::error::CoreError;
use crate::mna::MnaSystem;
use crate::node::{NodeIndex, NodeKey};

/// What kind of reduced state variable, if any, an element contributes to
/// the explicit state-space engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateVarKind {
    /// Capacitor voltage.
    CapacitorVoltage,
    /// Inductor current.
    InductorCurrent,
}

/// Declares that an element owns one entry of the explicit engine's reduced
/// state vector.
#[derive(Debug, Clone, Copy)]
pub struct StateVarSpec {
    pub kind: StateVarKind,
}

/// Two inductors newly produced by expanding a meta-element (e.g. a
/// multi-winding transformer) plus the coupling declarations between them.
pub struct Expansion {
    pub elements: Vec<Box<dyn Element>>,
    pub couplings: Vec<CouplingDecl>,
}

/// A declared mutual-inductance coupling between two named inductors.
#[derive(Debug, Clone)]
pub struct CouplingDecl {
    pub a: String,
    pub b: String,
    pub k: f64,
}

/// The behavior every circuit element implements.
///
/// Elements are stamped once per solver iteration within a step; the solver
/// owns the outer predict/solve/damp/accept loop and never inspects an
/// element's internals beyond this contract.
pub trait Element: std::fmt::Debug {
    /// Downcast hook so side structures (the mutual-inductance coupling
    /// manager) can recover a concrete element type by index without the
    /// `Element` trait itself knowing about device-crate types.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable counterpart of [`Element::as_any`], used by the preprocessor
    /// to resolve a CCCS/CCVS's named controlling branch after current
    /// variables have been assigned.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Unique element name (used for coupling declarations and error
    /// messages).
    fn name(&self) -> &str;

    /// The node keys this element is connected to, in declaration order.
    fn terminals(&self) -> &[NodeKey];

    /// Whether this element requires its own auxiliary branch-current
    /// variable (voltage sources, inductors, VCVS/CCVS, and switches in
    /// their closed state).
    fn needs_current_variable(&self) -> bool {
        false
    }

    /// Cache resolved row indices once preprocessing has assigned them.
    /// `current_index` is `Some` iff `needs_current_variable()` is true.
    fn bind(&mut self, nodes: &NodeIndex, current_index: Option<usize>) -> crate::error::Result<()>;

    /// Reset any internal history (companion-model state, step counters)
    /// before the first step of a transient run.
    fn init_transient(&mut self, initial_state: &DVector<f64>);

    /// Recompute this element's companion model (G_eq/I_eq or equivalent)
    /// for the step of size `h` about to be attempted. Pure function of the
    /// element's parameters, `h`, and its own bounded history.
    fn update_companion(&mut self, h: f64) -> Result<(), CoreError>;

    /// Add this element's contribution to the assembled MNA system at time
    /// `t` (end-of-step time for the attempt in progress).
    fn stamp(&self, mna: &mut MnaSystem, t: f64);

    /// Commit the just-accepted solution: shift history, advance the step
    /// counter, and record `h` as the new `h_prev`.
    fn update_history(&mut self, solution: &DVector<f64>, h: f64);

    /// Declares this element's slot in the explicit state-space engine's
    /// reduced state vector, if any.
    fn state_var(&self) -> Option<StateVarSpec> {
        None
    }

    /// Expand a meta-element (transformer) into primitive elements plus
    /// coupling declarations. Called once during preprocessing; the
    /// meta-element itself is then discarded. Primitive elements return
    /// `None`.
    fn expand(&self) -> Option<Expansion> {
        None
    }

    /// Whether this element participates in the MCP/LCP complementarity
    /// system (ideal diode, ideal switch). Drives strategy selection.
    fn is_mcp(&self) -> bool {
        false
    }
}
