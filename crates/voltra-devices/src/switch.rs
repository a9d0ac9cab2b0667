//! Ideal, gate-driven switch: a resistor whose value toggles between a
//! closed-state `r_on` and an open-state `r_off` according to an external
//! gate function of time. Unlike the diode, its state is a deterministic
//! function of `t`, not a complementarity unknown, so it stamps a plain
//! conductance and never participates in the MCP/LCP system.

use std::sync::Arc;

use nalgebra::DVector;
use voltra_core::{CoreError, Element, MnaSystem, NodeIndex, NodeKey};

/// Returns `true` while the switch should be closed.
pub type GateFn = Arc<dyn Fn(f64) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Switch {
    name: String,
    n1: NodeKey,
    n2: NodeKey,
    r_on: f64,
    r_off: f64,
    gate: GateFn,
    terminals: Vec<NodeKey>,
    idx1: Option<usize>,
    idx2: Option<usize>,
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("name", &self.name)
            .field("n1", &self.n1)
            .field("n2", &self.n2)
            .field("r_on", &self.r_on)
            .field("r_off", &self.r_off)
            .finish_non_exhaustive()
    }
}

impl Switch {
    pub fn new(
        name: impl Into<String>,
        n1: impl Into<NodeKey>,
        n2: impl Into<NodeKey>,
        r_on: f64,
        r_off: f64,
        gate: GateFn,
    ) -> Self {
        let n1 = n1.into();
        let n2 = n2.into();
        let terminals = vec![n1.clone(), n2.clone()];
        Self {
            name: name.into(),
            n1,
            n2,
            r_on,
            r_off,
            gate,
            terminals,
            idx1: None,
            idx2: None,
        }
    }
}

impl Element for Switch {
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
        if self.r_on <= 0.0 || self.r_off <= 0.0 {
            return Err(CoreError::bad_netlist(format!(
                "{}: r_on and r_off must be positive",
                self.name
            )));
        }
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, t: f64) {
        let r = if (self.gate)(t) { self.r_on } else { self.r_off };
        mna.stamp_conductance(self.idx1, self.idx2, 1.0 / r);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::NodeIndex;

    #[test]
    fn switch_toggles_conductance_with_gate() {
        let mut nodes = NodeIndex::new();
        nodes.resolve(&NodeKey::new("a"));
        let mut s = Switch::new("S1", "a", "0", 1e-3, 1e9, Arc::new(|t| t >= 1.0));
        s.bind(&nodes, None).unwrap();

        let mut mna_open = MnaSystem::new(1, 0);
        s.stamp(&mut mna_open, 0.5);
        assert!(mna_open.to_dense_matrix()[(0, 0)] < 1e-6);

        let mut mna_closed = MnaSystem::new(1, 0);
        s.stamp(&mut mna_closed, 2.0);
        assert!((mna_closed.to_dense_matrix()[(0, 0)] - 1000.0).abs() < 1e-6);
    }
}
