//! Multi-winding transformer meta-element.
//!
//! A transformer never stamps anything itself: `Circuit::expand_meta_elements`
//! replaces it, once, with one `Inductor` per winding plus one coupling
//! declaration per winding pair, before node/current-variable indices are
//! assigned. After expansion the transformer behaves exactly like a netlist
//! that declared those inductors and couplings directly.

use nalgebra::DVector;
use voltra_core::{CoreError, CouplingDecl, Element, Expansion, MnaSystem, NodeIndex, NodeKey};

use crate::passive::Inductor;

/// One winding: its two terminal nodes and self-inductance.
#[derive(Debug, Clone)]
pub struct Winding {
    pub n1: NodeKey,
    pub n2: NodeKey,
    pub inductance: f64,
}

impl Winding {
    pub fn new(n1: impl Into<NodeKey>, n2: impl Into<NodeKey>, inductance: f64) -> Self {
        Self {
            n1: n1.into(),
            n2: n2.into(),
            inductance,
        }
    }
}

/// A multi-winding transformer, coupled pairwise at a uniform coefficient
/// `k` (`0.0..=1.0`).
#[derive(Debug, Clone)]
pub struct Transformer {
    name: String,
    windings: Vec<Winding>,
    k: f64,
    terminals: Vec<NodeKey>,
}

impl Transformer {
    pub fn new(name: impl Into<String>, windings: Vec<Winding>, k: f64) -> Self {
        let terminals = windings.iter().flat_map(|w| [w.n1.clone(), w.n2.clone()]).collect();
        Self {
            name: name.into(),
            windings,
            k,
            terminals,
        }
    }

    fn winding_name(&self, i: usize) -> String {
        format!("{}_L{}", self.name, i + 1)
    }
}

impl Element for Transformer {
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

    fn bind(&mut self, _nodes: &NodeIndex, _current_index: Option<usize>) -> voltra_core::Result<()> {
        Err(CoreError::bad_netlist(format!(
            "{}: transformer meta-element was never expanded before preprocessing",
            self.name
        )))
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, _mna: &mut MnaSystem, _t: f64) {}

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}

    fn expand(&self) -> Option<Expansion> {
        let mut elements: Vec<Box<dyn Element>> = Vec::with_capacity(self.windings.len());
        for (i, w) in self.windings.iter().enumerate() {
            elements.push(Box::new(Inductor::new(
                self.winding_name(i),
                w.n1.clone(),
                w.n2.clone(),
                w.inductance,
                0.0,
            )));
        }

        let mut couplings = Vec::new();
        for i in 0..self.windings.len() {
            for j in (i + 1)..self.windings.len() {
                couplings.push(CouplingDecl {
                    a: self.winding_name(i),
                    b: self.winding_name(j),
                    k: self.k,
                });
            }
        }

        Some(Expansion { elements, couplings })
    }
}
