//! Turns a freshly-built `Circuit` into node/current-variable indices and
//! binds every element against them.
//!
//! Runs once, before the first transient step: expand transformer
//! meta-elements, assign node rows in first-seen order, assign one
//! auxiliary current-variable slot per element that needs one, bind every
//! element, resolve CCCS/CCVS controlling-branch references, and build the
//! mutual-inductance coupling manager.

use std::collections::HashMap;

use nalgebra::DVector;
use voltra_core::{Circuit, CoreError, NodeIndex, StateVarKind};
use voltra_devices::controlled::{Cccs, Ccvs};
use voltra_devices::{Capacitor, CouplingManager, Inductor};

use crate::error::Result;

/// One entry of the state-variable table (spec §3.1): which reduced state
/// an element contributes, and where to read its value from a full MNA
/// solution vector.
#[derive(Debug, Clone)]
pub struct StateVarEntry {
    pub name: String,
    pub kind: StateVarKind,
    /// Capacitance or inductance, whichever this element owns; the explicit
    /// state-space engine's derivative formulas need it directly.
    pub parameter: f64,
    /// The element's IC parameter (spec §3.1/§4.2 rule 4): initial
    /// capacitor voltage or inductor current, default 0.
    pub initial_value: f64,
    pub(crate) idx1: Option<usize>,
    pub(crate) idx2: Option<usize>,
    pub(crate) branch_row: Option<usize>,
}

impl StateVarEntry {
    /// Read this element's state value out of a full `(node, branch)`
    /// solution vector.
    pub fn sample(&self, solution: &DVector<f64>) -> f64 {
        match self.kind {
            StateVarKind::CapacitorVoltage => {
                let v1 = self.idx1.map(|i| solution[i]).unwrap_or(0.0);
                let v2 = self.idx2.map(|i| solution[i]).unwrap_or(0.0);
                v1 - v2
            }
            StateVarKind::InductorCurrent => self.branch_row.map(|r| solution[r]).unwrap_or(0.0),
        }
    }
}

/// The circuit after preprocessing, ready to be stepped by the transient
/// engine.
pub struct PreprocessedCircuit {
    pub circuit: Circuit,
    pub nodes: NodeIndex,
    pub num_vsources: usize,
    pub coupling: CouplingManager,
    /// Element name -> absolute MNA row, for every element with an
    /// auxiliary current variable.
    pub current_rows: HashMap<String, usize>,
    /// State-variable table, in element registration order.
    pub state_vars: Vec<StateVarEntry>,
}

impl PreprocessedCircuit {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn size(&self) -> usize {
        self.num_nodes() + self.num_vsources
    }

    /// Build the initial MNA solution vector a transient/state-space run
    /// should start from, seeded from each reactive element's IC parameter
    /// (spec §4.2 rule 4) instead of an all-zero guess.
    ///
    /// An inductor's branch current is an unambiguous dedicated unknown, so
    /// `initial_current` is written straight into its branch row. A
    /// capacitor's IC is a voltage *difference*; with its negative terminal
    /// grounded this is exact, but if both terminals float and are shared
    /// with other charged elements, seeding only the positive terminal's
    /// row cannot in general satisfy every element's IC simultaneously —
    /// the first element to claim a floating node wins. This matches how
    /// most transient engines treat simultaneous ICs on a shared node.
    pub fn initial_state(&self) -> DVector<f64> {
        let mut v = DVector::zeros(self.size());
        for entry in &self.state_vars {
            match entry.kind {
                StateVarKind::CapacitorVoltage => {
                    if let Some(idx1) = entry.idx1 {
                        let v2 = entry.idx2.map(|i| v[i]).unwrap_or(0.0);
                        v[idx1] = entry.initial_value + v2;
                    }
                }
                StateVarKind::InductorCurrent => {
                    if let Some(row) = entry.branch_row {
                        v[row] = entry.initial_value;
                    }
                }
            }
        }
        v
    }
}

/// Build a [`PreprocessedCircuit`] from a raw `Circuit`.
pub fn preprocess(mut circuit: Circuit) -> Result<PreprocessedCircuit> {
    circuit.expand_meta_elements()?;

    let mut nodes = NodeIndex::new();
    for element in circuit.elements() {
        for terminal in element.terminals() {
            nodes.resolve(terminal);
        }
    }

    let mut current_index_of: HashMap<String, usize> = HashMap::new();
    let mut next_current_index = 0usize;
    for element in circuit.elements() {
        if element.needs_current_variable() {
            current_index_of.insert(element.name().to_string(), next_current_index);
            next_current_index += 1;
        }
    }
    let num_vsources = next_current_index;

    for element in circuit.elements_mut() {
        let current_index = current_index_of.get(element.name()).copied();
        element.bind(&nodes, current_index)?;
    }

    // Resolve CCCS/CCVS controlling-branch references now that every
    // element's own current-variable index is assigned.
    let num_nodes = nodes.len();
    for i in 0..circuit.elements().len() {
        let controlling_name = {
            let element = &circuit.elements()[i];
            if let Some(cccs) = element.as_any().downcast_ref::<Cccs>() {
                Some(cccs.controlling_branch().to_string())
            } else if let Some(ccvs) = element.as_any().downcast_ref::<Ccvs>() {
                Some(ccvs.controlling_branch().to_string())
            } else {
                None
            }
        };
        let Some(controlling_name) = controlling_name else {
            continue;
        };
        let controlling_index = *current_index_of.get(&controlling_name).ok_or_else(|| {
            CoreError::bad_netlist(format!(
                "{} controls on unknown or currentless branch: {}",
                circuit.elements()[i].name(),
                controlling_name
            ))
        })?;
        let row = num_nodes + controlling_index;
        let element = &mut circuit.elements_mut()[i];
        if let Some(cccs) = element.as_any_mut().downcast_mut::<Cccs>() {
            cccs.set_controlling_branch_row(row);
        } else if let Some(ccvs) = element.as_any_mut().downcast_mut::<Ccvs>() {
            ccvs.set_controlling_branch_row(row);
        }
    }

    let coupling = CouplingManager::build(&circuit)?;

    let current_rows: HashMap<String, usize> = current_index_of
        .iter()
        .map(|(name, &i)| (name.clone(), num_nodes + i))
        .collect();

    let mut state_vars = Vec::new();
    for element in circuit.elements() {
        let Some(spec) = element.state_var() else {
            continue;
        };
        let terminals = element.terminals();
        let idx1 = terminals.first().and_then(|t| nodes.get(t));
        let idx2 = terminals.get(1).and_then(|t| nodes.get(t));
        let branch_row = current_rows.get(element.name()).copied();
        let (parameter, initial_value) = match spec.kind {
            StateVarKind::CapacitorVoltage => {
                let c = element.as_any().downcast_ref::<Capacitor>();
                (c.map(|c| c.capacitance()).unwrap_or(0.0), c.map(|c| c.initial_voltage()).unwrap_or(0.0))
            }
            StateVarKind::InductorCurrent => {
                let l = element.as_any().downcast_ref::<Inductor>();
                (l.map(|l| l.inductance()).unwrap_or(0.0), l.map(|l| l.initial_current()).unwrap_or(0.0))
            }
        };
        state_vars.push(StateVarEntry {
            name: element.name().to_string(),
            kind: spec.kind,
            parameter,
            initial_value,
            idx1,
            idx2,
            branch_row,
        });
    }

    Ok(PreprocessedCircuit {
        circuit,
        nodes,
        num_vsources,
        coupling,
        current_rows,
        state_vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_devices::{Resistor, VoltageSource};

    #[test]
    fn preprocess_assigns_dense_node_rows_and_one_branch() {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R2", "out", "0", 2000.0))).unwrap();

        let pre = preprocess(circuit).unwrap();
        assert_eq!(pre.num_nodes(), 2);
        assert_eq!(pre.num_vsources, 1);
        assert_eq!(pre.size(), 3);
    }

    #[test]
    fn initial_state_seeds_capacitor_voltage_and_inductor_current() {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Capacitor::new("C1", "out", "0", 1e-6, 2.5))).unwrap();
        circuit.add_element(Box::new(Inductor::new("L1", "out", "0", 1e-3, 0.1))).unwrap();

        let pre = preprocess(circuit).unwrap();
        let v = pre.initial_state();

        let cap_idx1 = pre.state_vars.iter().find(|e| e.name == "C1").unwrap().idx1.unwrap();
        assert!((v[cap_idx1] - 2.5).abs() < 1e-12);

        let ind_row = pre.state_vars.iter().find(|e| e.name == "L1").unwrap().branch_row.unwrap();
        assert!((v[ind_row] - 0.1).abs() < 1e-12);
    }
}
