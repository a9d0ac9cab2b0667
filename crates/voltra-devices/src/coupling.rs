//! Mutual-inductance coupling manager.
//!
//! Two inductors cannot hold references to each other (that would be an
//! ownership cycle through `Circuit`'s `Vec<Box<dyn Element>>`), so the
//! manager instead keeps an index-keyed adjacency list — `(element index,
//! element index, coupling coefficient M)` — and reaches into the circuit's
//! element slice by index at stamp time, downcasting each side to
//! `Inductor` through `Element::as_any`.

use voltra_core::{Circuit, CoreError, MnaSystem};

use crate::passive::Inductor;

/// Resolved mutual-inductance edges, built once during preprocessing from a
/// circuit's declared couplings.
#[derive(Debug, Default)]
pub struct CouplingManager {
    /// `(element index of inductor a, element index of inductor b, M)`.
    edges: Vec<(usize, usize, f64)>,
}

impl CouplingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every `Circuit::couplings()` declaration against the
    /// circuit's current element list (after meta-element expansion) and
    /// precompute `M = k * sqrt(La * Lb)` for each.
    pub fn build(circuit: &Circuit) -> voltra_core::Result<Self> {
        let mut edges = Vec::with_capacity(circuit.couplings().len());
        for decl in circuit.couplings() {
            let a_idx = circuit.find_index(&decl.a).ok_or_else(|| {
                CoreError::bad_netlist(format!("coupling refers to unknown inductor: {}", decl.a))
            })?;
            let b_idx = circuit.find_index(&decl.b).ok_or_else(|| {
                CoreError::bad_netlist(format!("coupling refers to unknown inductor: {}", decl.b))
            })?;
            let la = as_inductor(circuit, a_idx, &decl.a)?.coupling_state().inductance;
            let lb = as_inductor(circuit, b_idx, &decl.b)?.coupling_state().inductance;
            let m = decl.k * (la * lb).sqrt();
            edges.push((a_idx, b_idx, m));
        }
        Ok(Self { edges })
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Stamp every coupling's cross term. Called once per step, after every
    /// element's own `stamp` has run.
    pub fn stamp(&self, circuit: &Circuit, mna: &mut MnaSystem) -> voltra_core::Result<()> {
        for &(a_idx, b_idx, m) in &self.edges {
            let a = as_inductor(circuit, a_idx, "coupling endpoint")?.coupling_state();
            let b = as_inductor(circuit, b_idx, "coupling endpoint")?.coupling_state();
            mna.stamp(a.branch_row, b.branch_row, -m * a.alpha);
            mna.add_rhs(a.branch_row, m * b.history_term);
            mna.stamp(b.branch_row, a.branch_row, -m * b.alpha);
            mna.add_rhs(b.branch_row, m * a.history_term);
        }
        Ok(())
    }
}

fn as_inductor<'a>(circuit: &'a Circuit, idx: usize, name: &str) -> voltra_core::Result<&'a Inductor> {
    circuit.elements()[idx]
        .as_any()
        .downcast_ref::<Inductor>()
        .ok_or_else(|| CoreError::bad_netlist(format!("coupling endpoint {} is not an inductor", name)))
}
