//! Ideal diode: a complementarity element resolved by the MCP/LCP layer
//! rather than by Newton iteration on an exponential I-V curve.
//!
//! Structurally this stamps exactly like a voltage source on its branch
//! (`V(anode) - V(cathode) - v_d = 0`, branch current `i_d` coupled into
//! both terminal KCL rows), except the forced value `v_d` is not fixed at
//! construction: the solver's MCP pass sets it once per step via
//! `set_forced_voltage`, having solved the complementarity condition `0 <=
//! i_d  _|_  -v_d >= 0` (off: `v_d <= 0, i_d = 0`; on: `v_d = 0, i_d >= 0`).
//!
//! `vf`/`ron` (forward-voltage drop, on-resistance: `v = Va - Vb - Vf -
//! Ron*i`) are folded into the complementarity system by
//! `voltra_solver::mcp`, not stamped into this element's own branch row;
//! `set_forced_voltage` is handed the full resolved `v_d` (already
//! including the `Vf`/`Ron` term) each step.

use nalgebra::DVector;
use voltra_core::{CoreError, Element, MnaSystem, NodeIndex, NodeKey};

#[derive(Debug, Clone)]
pub struct Diode {
    name: String,
    anode: NodeKey,
    cathode: NodeKey,
    vf: f64,
    ron: f64,
    terminals: Vec<NodeKey>,
    idx_anode: Option<usize>,
    idx_cathode: Option<usize>,
    current_index: usize,
    forced_voltage: f64,
}

impl Diode {
    /// `vf` (forward-voltage drop, Vf >= 0) and `ron` (on-resistance, Ron >=
    /// 0) parameterize the element table's ideal-diode row; an ideal diode
    /// with no forward drop or series resistance is `vf = 0.0, ron = 0.0`.
    pub fn new(name: impl Into<String>, anode: impl Into<NodeKey>, cathode: impl Into<NodeKey>, vf: f64, ron: f64) -> Self {
        let anode = anode.into();
        let cathode = cathode.into();
        let terminals = vec![anode.clone(), cathode.clone()];
        Self {
            name: name.into(),
            anode,
            cathode,
            vf,
            ron,
            terminals,
            idx_anode: None,
            idx_cathode: None,
            current_index: 0,
            forced_voltage: 0.0,
        }
    }

    /// Row of this diode's branch current in the assembled MNA system.
    pub fn branch_row(&self, num_nodes: usize) -> usize {
        num_nodes + self.current_index
    }

    /// Terminal node rows, for the MCP layer's Schur-complement setup.
    pub fn terminal_rows(&self) -> (Option<usize>, Option<usize>) {
        (self.idx_anode, self.idx_cathode)
    }

    pub fn vf(&self) -> f64 {
        self.vf
    }

    pub fn ron(&self) -> f64 {
        self.ron
    }

    /// Set the branch voltage the MCP solver has resolved for the step
    /// about to be stamped (`Vf` while conducting, at or below `Vf` while
    /// blocking).
    pub fn set_forced_voltage(&mut self, v: f64) {
        self.forced_voltage = v;
    }
}

impl Element for Diode {
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
        self.idx_anode = nodes.get(&self.anode);
        self.idx_cathode = nodes.get(&self.cathode);
        self.current_index = current_index.ok_or_else(|| {
            CoreError::bad_netlist(format!("{} needs a branch current variable", self.name))
        })?;
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {
        self.forced_voltage = 0.0;
    }

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, _t: f64) {
        mna.stamp_voltage_source(self.idx_anode, self.idx_cathode, self.current_index, self.forced_voltage);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}

    fn is_mcp(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::NodeIndex;

    #[test]
    fn diode_stamps_as_zero_volt_source_when_on() {
        let mut nodes = NodeIndex::new();
        nodes.resolve(&NodeKey::new("a"));
        nodes.resolve(&NodeKey::new("k"));
        let mut d = Diode::new("D1", "a", "k", 0.0, 0.0);
        d.bind(&nodes, Some(0)).unwrap();
        d.set_forced_voltage(0.0);
        let mut mna = MnaSystem::new(2, 1);
        d.stamp(&mut mna, 0.0);
        assert_eq!(mna.rhs()[2], 0.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 2)], 1.0);
        assert_eq!(m[(1, 2)], -1.0);
    }

    #[test]
    fn vf_and_ron_are_exposed_for_the_mcp_layer() {
        let d = Diode::new("D1", "a", "k", 0.6, 10.0);
        assert_eq!(d.vf(), 0.6);
        assert_eq!(d.ron(), 10.0);
    }
}
