//! Controlled source device models: VCVS (E), VCCS (G), CCCS (F), CCVS (H).

use nalgebra::DVector;
use voltra_core::{CoreError, Element, MnaSystem, NodeIndex, NodeKey};

// ────────────────────── VCVS (E element) ──────────────────────

/// Voltage-controlled voltage source.
///
/// `V(out+, out-) = gain * V(ctrl+, ctrl-)`. Requires one branch current
/// variable, like an independent voltage source.
#[derive(Debug, Clone)]
pub struct Vcvs {
    name: String,
    out_pos: NodeKey,
    out_neg: NodeKey,
    ctrl_pos: NodeKey,
    ctrl_neg: NodeKey,
    gain: f64,
    terminals: Vec<NodeKey>,
    op: Option<usize>,
    on: Option<usize>,
    cp: Option<usize>,
    cn: Option<usize>,
    current_index: usize,
}

impl Vcvs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<NodeKey>,
        out_neg: impl Into<NodeKey>,
        ctrl_pos: impl Into<NodeKey>,
        ctrl_neg: impl Into<NodeKey>,
        gain: f64,
    ) -> Self {
        let out_pos = out_pos.into();
        let out_neg = out_neg.into();
        let ctrl_pos = ctrl_pos.into();
        let ctrl_neg = ctrl_neg.into();
        let terminals = vec![
            out_pos.clone(),
            out_neg.clone(),
            ctrl_pos.clone(),
            ctrl_neg.clone(),
        ];
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            gain,
            terminals,
            op: None,
            on: None,
            cp: None,
            cn: None,
            current_index: 0,
        }
    }
}

impl Element for Vcvs {
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
        self.op = nodes.get(&self.out_pos);
        self.on = nodes.get(&self.out_neg);
        self.cp = nodes.get(&self.ctrl_pos);
        self.cn = nodes.get(&self.ctrl_neg);
        self.current_index = current_index.ok_or_else(|| {
            CoreError::bad_netlist(format!("{} needs a branch current variable", self.name))
        })?;
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        let br = mna.num_nodes + self.current_index;

        // Branch current couples to output nodes like a voltage source.
        if let Some(i) = self.op {
            mna.stamp(i, br, 1.0);
            mna.stamp(br, i, 1.0);
        }
        if let Some(i) = self.on {
            mna.stamp(i, br, -1.0);
            mna.stamp(br, i, -1.0);
        }
        // Branch equation: V(out+) - V(out-) - gain*(V(ctrl+) - V(ctrl-)) = 0
        if let Some(i) = self.cp {
            mna.stamp(br, i, -self.gain);
        }
        if let Some(i) = self.cn {
            mna.stamp(br, i, self.gain);
        }
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

// ────────────────────── VCCS (G element) ──────────────────────

/// Voltage-controlled current source.
///
/// `I(out+ -> out-) = gm * V(ctrl+, ctrl-)`. No branch current variable.
#[derive(Debug, Clone)]
pub struct Vccs {
    name: String,
    out_pos: NodeKey,
    out_neg: NodeKey,
    ctrl_pos: NodeKey,
    ctrl_neg: NodeKey,
    gm: f64,
    terminals: Vec<NodeKey>,
    op: Option<usize>,
    on: Option<usize>,
    cp: Option<usize>,
    cn: Option<usize>,
}

impl Vccs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<NodeKey>,
        out_neg: impl Into<NodeKey>,
        ctrl_pos: impl Into<NodeKey>,
        ctrl_neg: impl Into<NodeKey>,
        gm: f64,
    ) -> Self {
        let out_pos = out_pos.into();
        let out_neg = out_neg.into();
        let ctrl_pos = ctrl_pos.into();
        let ctrl_neg = ctrl_neg.into();
        let terminals = vec![
            out_pos.clone(),
            out_neg.clone(),
            ctrl_pos.clone(),
            ctrl_neg.clone(),
        ];
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            gm,
            terminals,
            op: None,
            on: None,
            cp: None,
            cn: None,
        }
    }
}

impl Element for Vccs {
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
        self.op = nodes.get(&self.out_pos);
        self.on = nodes.get(&self.out_neg);
        self.cp = nodes.get(&self.ctrl_pos);
        self.cn = nodes.get(&self.ctrl_neg);
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        // Current gm*V(ctrl) enters out_pos, leaves out_neg.
        if let Some(i) = self.op {
            if let Some(j) = self.cp {
                mna.stamp(i, j, -self.gm);
            }
            if let Some(j) = self.cn {
                mna.stamp(i, j, self.gm);
            }
        }
        if let Some(i) = self.on {
            if let Some(j) = self.cp {
                mna.stamp(i, j, self.gm);
            }
            if let Some(j) = self.cn {
                mna.stamp(i, j, -self.gm);
            }
        }
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

// ────────────────────── CCCS (F element) ──────────────────────

/// Current-controlled current source.
///
/// `I(out+ -> out-) = gain * I(vsource)`. References another element's
/// branch current variable; contributes no variable of its own.
#[derive(Debug, Clone)]
pub struct Cccs {
    name: String,
    out_pos: NodeKey,
    out_neg: NodeKey,
    controlling_branch: String,
    gain: f64,
    terminals: Vec<NodeKey>,
    op: Option<usize>,
    on: Option<usize>,
    ctrl_branch_abs: usize,
}

impl Cccs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<NodeKey>,
        out_neg: impl Into<NodeKey>,
        controlling_branch: impl Into<String>,
        gain: f64,
    ) -> Self {
        let out_pos = out_pos.into();
        let out_neg = out_neg.into();
        let terminals = vec![out_pos.clone(), out_neg.clone()];
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            controlling_branch: controlling_branch.into(),
            gain,
            terminals,
            op: None,
            on: None,
            ctrl_branch_abs: 0,
        }
    }

    /// Name of the element whose branch current controls this source.
    pub fn controlling_branch(&self) -> &str {
        &self.controlling_branch
    }

    /// The preprocessor resolves the controlling element's branch row (an
    /// absolute MNA row, `num_nodes + its current_index`) once current
    /// variables are assigned and calls this before `stamp`.
    pub fn set_controlling_branch_row(&mut self, row: usize) {
        self.ctrl_branch_abs = row;
    }
}

impl Element for Cccs {
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
        self.op = nodes.get(&self.out_pos);
        self.on = nodes.get(&self.out_neg);
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        if let Some(i) = self.op {
            mna.stamp(i, self.ctrl_branch_abs, self.gain);
        }
        if let Some(i) = self.on {
            mna.stamp(i, self.ctrl_branch_abs, -self.gain);
        }
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

// ────────────────────── CCVS (H element) ──────────────────────

/// Current-controlled voltage source.
///
/// `V(out+, out-) = gain * I(vsource)`. Requires its own branch current
/// variable, like an independent voltage source.
#[derive(Debug, Clone)]
pub struct Ccvs {
    name: String,
    out_pos: NodeKey,
    out_neg: NodeKey,
    controlling_branch: String,
    gain: f64,
    terminals: Vec<NodeKey>,
    op: Option<usize>,
    on: Option<usize>,
    current_index: usize,
    ctrl_branch_abs: usize,
}

impl Ccvs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<NodeKey>,
        out_neg: impl Into<NodeKey>,
        controlling_branch: impl Into<String>,
        gain: f64,
    ) -> Self {
        let out_pos = out_pos.into();
        let out_neg = out_neg.into();
        let terminals = vec![out_pos.clone(), out_neg.clone()];
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            controlling_branch: controlling_branch.into(),
            gain,
            terminals,
            op: None,
            on: None,
            current_index: 0,
            ctrl_branch_abs: 0,
        }
    }

    pub fn controlling_branch(&self) -> &str {
        &self.controlling_branch
    }

    pub fn set_controlling_branch_row(&mut self, row: usize) {
        self.ctrl_branch_abs = row;
    }
}

impl Element for Ccvs {
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
        self.op = nodes.get(&self.out_pos);
        self.on = nodes.get(&self.out_neg);
        self.current_index = current_index.ok_or_else(|| {
            CoreError::bad_netlist(format!("{} needs a branch current variable", self.name))
        })?;
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        let br = mna.num_nodes + self.current_index;
        if let Some(i) = self.op {
            mna.stamp(i, br, 1.0);
            mna.stamp(br, i, 1.0);
        }
        if let Some(i) = self.on {
            mna.stamp(i, br, -1.0);
            mna.stamp(br, i, -1.0);
        }
        mna.stamp(br, self.ctrl_branch_abs, -self.gain);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::NodeIndex;

    fn bind_two_node(keys: &[&str]) -> (NodeIndex, Vec<Option<usize>>) {
        let mut idx = NodeIndex::new();
        let resolved = keys
            .iter()
            .map(|k| idx.resolve(&NodeKey::new(*k)))
            .collect();
        (idx, resolved)
    }

    #[test]
    fn vcvs_stamp() {
        let (idx, _) = bind_two_node(&["out", "ctrl"]);
        let mut e = Vcvs::new("E1", "out", "0", "ctrl", "0", 2.0);
        e.bind(&idx, Some(0)).unwrap();
        let mut mna = MnaSystem::new(2, 1);
        e.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 2)], 1.0);
        assert_eq!(m[(2, 0)], 1.0);
        assert_eq!(m[(2, 1)], -2.0);
    }

    #[test]
    fn vccs_stamp() {
        let (idx, _) = bind_two_node(&["out", "ctrl"]);
        let mut g = Vccs::new("G1", "out", "0", "ctrl", "0", 0.001);
        g.bind(&idx, None).unwrap();
        let mut mna = MnaSystem::new(2, 0);
        g.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert!((m[(0, 1)] - (-0.001)).abs() < 1e-15);
    }

    #[test]
    fn cccs_stamp() {
        let (idx, _) = bind_two_node(&["out"]);
        let mut f = Cccs::new("F1", "out", "0", "V1", 3.0);
        f.bind(&idx, None).unwrap();
        f.set_controlling_branch_row(2);
        let mut mna = MnaSystem::new(2, 1);
        f.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 2)], 3.0);
    }

    #[test]
    fn ccvs_stamp() {
        let (idx, _) = bind_two_node(&["out"]);
        let mut h = Ccvs::new("H1", "out", "0", "V1", 100.0);
        h.bind(&idx, Some(1)).unwrap();
        h.set_controlling_branch_row(2);
        let mut mna = MnaSystem::new(2, 2);
        h.stamp(&mut mna, 0.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(3, 0)], 1.0);
        assert_eq!(m[(3, 2)], -100.0);
    }
}
