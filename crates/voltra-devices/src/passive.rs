//! Resistor, capacitor, and inductor companion models.
//!
//! The capacitor and inductor stamp a time-invariant conductance plus a
//! history-dependent source each step (the standard companion-model split);
//! only the coefficients, recomputed in `update_companion`, depend on the
//! step size.

use nalgebra::DVector;
use voltra_core::{CoreError, Element, MnaSystem, NodeIndex, NodeKey, StateVarKind, StateVarSpec};

use crate::bdf2::bdf2_coefficients;

/// Companion-model state a mutual-inductance coupling needs to read from an
/// inductor without holding a reference to it (see `coupling::CouplingManager`).
#[derive(Debug, Clone, Copy)]
pub struct InductorState {
    pub branch_row: usize,
    pub inductance: f64,
    pub alpha: f64,
    pub history_term: f64,
}

// ────────────────────────── Resistor ──────────────────────────

/// Linear resistor. No internal history; its conductance is stamped fresh
/// every call.
#[derive(Debug, Clone)]
pub struct Resistor {
    name: String,
    n1: NodeKey,
    n2: NodeKey,
    resistance: f64,
    terminals: Vec<NodeKey>,
    idx1: Option<usize>,
    idx2: Option<usize>,
}

impl Resistor {
    pub fn new(name: impl Into<String>, n1: impl Into<NodeKey>, n2: impl Into<NodeKey>, resistance: f64) -> Self {
        let n1 = n1.into();
        let n2 = n2.into();
        let terminals = vec![n1.clone(), n2.clone()];
        Self {
            name: name.into(),
            n1,
            n2,
            resistance,
            terminals,
            idx1: None,
            idx2: None,
        }
    }
}

impl Element for Resistor {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn terminals(&self) -> &[NodeKey] {
        &self.terminals
    }

    fn bind(&mut self, nodes: &NodeIndex, _current_index: Option<usize>) -> voltra_core::Result<()> {
        self.idx1 = nodes.get(&self.n1);
        self.idx2 = nodes.get(&self.n2);
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        if self.resistance <= 0.0 {
            return Err(CoreError::bad_netlist(format!(
                "{}: resistance must be positive, got {}",
                self.name, self.resistance
            )));
        }
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        mna.stamp_conductance(self.idx1, self.idx2, 1.0 / self.resistance);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

// ────────────────────────── Capacitor ──────────────────────────

/// Capacitor with a variable-step BDF2 companion model: a conductance
/// `G_eq = C*alpha` in parallel with a history current source, falling back
/// to backward Euler for the first two accepted steps of a run.
#[derive(Debug, Clone)]
pub struct Capacitor {
    name: String,
    n1: NodeKey,
    n2: NodeKey,
    capacitance: f64,
    initial_voltage: f64,
    terminals: Vec<NodeKey>,
    idx1: Option<usize>,
    idx2: Option<usize>,
    alpha: f64,
    beta: f64,
    gamma: f64,
    v_prev: f64,
    v_prev2: f64,
    h_prev: Option<f64>,
    step_count: usize,
}

impl Capacitor {
    /// `initial_voltage` is the element's IC parameter (spec §3.1/§4.2 rule
    /// 4): the voltage the capacitor starts a transient run at, default 0.
    pub fn new(name: impl Into<String>, n1: impl Into<NodeKey>, n2: impl Into<NodeKey>, capacitance: f64, initial_voltage: f64) -> Self {
        let n1 = n1.into();
        let n2 = n2.into();
        let terminals = vec![n1.clone(), n2.clone()];
        Self {
            name: name.into(),
            n1,
            n2,
            capacitance,
            initial_voltage,
            terminals,
            idx1: None,
            idx2: None,
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            v_prev: 0.0,
            v_prev2: 0.0,
            h_prev: None,
            step_count: 0,
        }
    }

    fn terminal_voltage(&self, solution: &DVector<f64>) -> f64 {
        let v1 = self.idx1.map(|i| solution[i]).unwrap_or(0.0);
        let v2 = self.idx2.map(|i| solution[i]).unwrap_or(0.0);
        v1 - v2
    }

    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    pub fn initial_voltage(&self) -> f64 {
        self.initial_voltage
    }
}

impl Element for Capacitor {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn terminals(&self) -> &[NodeKey] {
        &self.terminals
    }

    fn bind(&mut self, nodes: &NodeIndex, _current_index: Option<usize>) -> voltra_core::Result<()> {
        self.idx1 = nodes.get(&self.n1);
        self.idx2 = nodes.get(&self.n2);
        Ok(())
    }

    fn init_transient(&mut self, initial_state: &DVector<f64>) {
        let v0 = self.terminal_voltage(initial_state);
        self.v_prev = v0;
        self.v_prev2 = v0;
        self.h_prev = None;
        self.step_count = 0;
    }

    fn update_companion(&mut self, h: f64) -> Result<(), CoreError> {
        if self.capacitance <= 0.0 {
            return Err(CoreError::bad_netlist(format!(
                "{}: capacitance must be positive, got {}",
                self.name, self.capacitance
            )));
        }
        let h_prev = if self.step_count >= 2 { self.h_prev } else { None };
        let (a, b, g) = bdf2_coefficients(h, h_prev);
        self.alpha = a;
        self.beta = b;
        self.gamma = g;
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        let g_eq = self.capacitance * self.alpha;
        let i_hist = self.capacitance * (self.beta * self.v_prev + self.gamma * self.v_prev2);
        mna.stamp_conductance(self.idx1, self.idx2, g_eq);
        mna.stamp_current_source(self.idx1, self.idx2, i_hist);
    }

    fn update_history(&mut self, solution: &DVector<f64>, h: f64) {
        let v_new = self.terminal_voltage(solution);
        self.v_prev2 = self.v_prev;
        self.v_prev = v_new;
        self.h_prev = Some(h);
        self.step_count += 1;
    }

    fn state_var(&self) -> Option<StateVarSpec> {
        Some(StateVarSpec {
            kind: StateVarKind::CapacitorVoltage,
        })
    }
}

// ────────────────────────── Inductor ──────────────────────────

/// Inductor stamped in KVL/auxiliary-current-row form: the branch current
/// is a first-class unknown, and the companion model appears as a diagonal
/// term on that branch's own row rather than as a Norton-equivalent
/// conductance between the two terminal nodes.
#[derive(Debug, Clone)]
pub struct Inductor {
    name: String,
    n1: NodeKey,
    n2: NodeKey,
    inductance: f64,
    initial_current: f64,
    terminals: Vec<NodeKey>,
    idx1: Option<usize>,
    idx2: Option<usize>,
    current_index: usize,
    num_nodes: usize,
    alpha: f64,
    beta: f64,
    gamma: f64,
    i_prev: f64,
    i_prev2: f64,
    h_prev: Option<f64>,
    step_count: usize,
}

impl Inductor {
    /// `initial_current` is the element's IC parameter (spec §3.1/§4.2 rule
    /// 4): the branch current the inductor starts a transient run at,
    /// default 0.
    pub fn new(name: impl Into<String>, n1: impl Into<NodeKey>, n2: impl Into<NodeKey>, inductance: f64, initial_current: f64) -> Self {
        let n1 = n1.into();
        let n2 = n2.into();
        let terminals = vec![n1.clone(), n2.clone()];
        Self {
            name: name.into(),
            n1,
            n2,
            inductance,
            initial_current,
            terminals,
            idx1: None,
            idx2: None,
            current_index: 0,
            num_nodes: 0,
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            i_prev: 0.0,
            i_prev2: 0.0,
            h_prev: None,
            step_count: 0,
        }
    }

    fn branch_row(&self) -> usize {
        self.num_nodes + self.current_index
    }

    pub fn inductance(&self) -> f64 {
        self.inductance
    }

    pub fn initial_current(&self) -> f64 {
        self.initial_current
    }
}

impl Element for Inductor {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn terminals(&self) -> &[NodeKey] {
        &self.terminals
    }

    fn needs_current_variable(&self) -> bool {
        true
    }

    fn bind(&mut self, nodes: &NodeIndex, current_index: Option<usize>) -> voltra_core::Result<()> {
        self.idx1 = nodes.get(&self.n1);
        self.idx2 = nodes.get(&self.n2);
        self.num_nodes = nodes.len();
        self.current_index = current_index.ok_or_else(|| {
            CoreError::bad_netlist(format!("{} needs a branch current variable", self.name))
        })?;
        Ok(())
    }

    fn init_transient(&mut self, initial_state: &DVector<f64>) {
        let i0 = initial_state[self.branch_row()];
        self.i_prev = i0;
        self.i_prev2 = i0;
        self.h_prev = None;
        self.step_count = 0;
    }

    fn update_companion(&mut self, h: f64) -> Result<(), CoreError> {
        if self.inductance <= 0.0 {
            return Err(CoreError::bad_netlist(format!(
                "{}: inductance must be positive, got {}",
                self.name, self.inductance
            )));
        }
        let h_prev = if self.step_count >= 2 { self.h_prev } else { None };
        let (a, b, g) = bdf2_coefficients(h, h_prev);
        self.alpha = a;
        self.beta = b;
        self.gamma = g;
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        let br = mna.num_nodes + self.current_index;
        if let Some(i) = self.idx1 {
            mna.stamp(i, br, 1.0);
            mna.stamp(br, i, 1.0);
        }
        if let Some(j) = self.idx2 {
            mna.stamp(j, br, -1.0);
            mna.stamp(br, j, -1.0);
        }
        mna.stamp(br, br, -self.inductance * self.alpha);
        mna.add_rhs(br, self.inductance * (self.beta * self.i_prev + self.gamma * self.i_prev2));
    }

    fn update_history(&mut self, solution: &DVector<f64>, h: f64) {
        let i_new = solution[self.branch_row()];
        self.i_prev2 = self.i_prev;
        self.i_prev = i_new;
        self.h_prev = Some(h);
        self.step_count += 1;
    }

    fn state_var(&self) -> Option<StateVarSpec> {
        Some(StateVarSpec {
            kind: StateVarKind::InductorCurrent,
        })
    }
}

impl Inductor {
    /// Snapshot of the companion-model state a coupling needs, without
    /// handing out a reference another inductor could hold across a borrow.
    pub fn coupling_state(&self) -> InductorState {
        InductorState {
            branch_row: self.branch_row(),
            inductance: self.inductance,
            alpha: self.alpha,
            history_term: self.beta * self.i_prev + self.gamma * self.i_prev2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::NodeIndex;

    fn idx(keys: &[&str]) -> NodeIndex {
        let mut idx = NodeIndex::new();
        for k in keys {
            idx.resolve(&NodeKey::new(*k));
        }
        idx
    }

    #[test]
    fn resistor_stamps_symmetric_conductance() {
        let nodes = idx(&["a", "b"]);
        let mut r = Resistor::new("R1", "a", "b", 1000.0);
        r.bind(&nodes, None).unwrap();
        r.update_companion(1e-6).unwrap();
        let mut mna = MnaSystem::new(2, 0);
        r.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert!((m[(0, 0)] - 1e-3).abs() < 1e-12);
        assert!((m[(0, 1)] - (-1e-3)).abs() < 1e-12);
    }

    #[test]
    fn resistor_rejects_nonpositive_resistance() {
        let nodes = idx(&["a", "b"]);
        let mut r = Resistor::new("R1", "a", "b", -1.0);
        r.bind(&nodes, None).unwrap();
        assert!(r.update_companion(1e-6).is_err());
    }

    #[test]
    fn capacitor_first_step_matches_backward_euler() {
        let nodes = idx(&["a", "0"]);
        let mut c = Capacitor::new("C1", "a", "0", 1e-6, 0.0);
        c.bind(&nodes, None).unwrap();
        c.init_transient(&DVector::from_vec(vec![0.0]));
        c.update_companion(1e-6).unwrap();
        let mut mna = MnaSystem::new(1, 0);
        c.stamp(&mut mna, 0.0);
        // G_eq = C/h = 1.0
        assert!((mna.to_dense_matrix()[(0, 0)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inductor_branch_row_is_self_coupled() {
        let nodes = idx(&["a", "0"]);
        let mut l = Inductor::new("L1", "a", "0", 1e-3, 0.0);
        l.bind(&nodes, Some(0)).unwrap();
        l.init_transient(&DVector::from_vec(vec![0.0, 0.0]));
        l.update_companion(1e-6).unwrap();
        let mut mna = MnaSystem::new(1, 1);
        l.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 1)], 1.0);
        assert_eq!(m[(1, 0)], 1.0);
        assert!(m[(1, 1)] < 0.0); // -L*alpha
    }
}
