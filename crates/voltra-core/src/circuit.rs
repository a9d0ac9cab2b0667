//! The circuit container: an ordered element list plus coupling declarations.

use std::collections::HashSet;

use crate::element::{CouplingDecl, Element};
use crate::error::{CoreError, Result};

/// An ordered, immutable-once-built list of elements plus the mutual
/// inductance couplings declared between them.
///
/// Construction is append-only; preprocessing (in `voltra-solver`) consumes
/// a `Circuit` to build node/current-variable indices and never mutates
/// element ordering afterward, so downstream row assignments stay stable.
#[derive(Debug, Default)]
pub struct Circuit {
    elements: Vec<Box<dyn Element>>,
    couplings: Vec<CouplingDecl>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element. Rejects a duplicate element name.
    pub fn add_element(&mut self, element: Box<dyn Element>) -> Result<()> {
        if self.find_index(element.name()).is_some() {
            return Err(CoreError::bad_netlist(format!(
                "duplicate element name: {}",
                element.name()
            )));
        }
        self.elements.push(element);
        Ok(())
    }

    /// Declare a mutual-inductance coupling between two named inductors.
    /// Validated against element names once `expand_meta_elements` has run.
    pub fn add_coupling(&mut self, a: impl Into<String>, b: impl Into<String>, k: f64) {
        self.couplings.push(CouplingDecl {
            a: a.into(),
            b: b.into(),
            k,
        });
    }

    pub fn elements(&self) -> &[Box<dyn Element>] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut Vec<Box<dyn Element>> {
        &mut self.elements
    }

    pub fn couplings(&self) -> &[CouplingDecl] {
        &self.couplings
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name() == name)
    }

    /// Replace every meta-element (an element whose `expand()` returns
    /// `Some`) with its expansion's primitive elements and coupling
    /// declarations. Idempotent: primitive elements are untouched, and a
    /// second call sees no further meta-elements to expand.
    ///
    /// Runs once during preprocessing, before node/current-variable
    /// indices are assigned, so expanded inductors get ordinary rows like
    /// any netlist-declared inductor.
    pub fn expand_meta_elements(&mut self) -> Result<()> {
        let mut expanded = Vec::with_capacity(self.elements.len());
        let mut new_couplings = Vec::new();
        for element in self.elements.drain(..) {
            match element.expand() {
                Some(expansion) => {
                    expanded.extend(expansion.elements);
                    new_couplings.extend(expansion.couplings);
                }
                None => expanded.push(element),
            }
        }
        self.elements = expanded;
        self.couplings.extend(new_couplings);

        let names: HashSet<&str> = self.elements.iter().map(|e| e.name()).collect();
        for decl in &self.couplings {
            if !names.contains(decl.a.as_str()) {
                return Err(CoreError::bad_netlist(format!(
                    "coupling refers to unknown inductor: {}",
                    decl.a
                )));
            }
            if !names.contains(decl.b.as_str()) {
                return Err(CoreError::bad_netlist(format!(
                    "coupling refers to unknown inductor: {}",
                    decl.b
                )));
            }
        }
        Ok(())
    }

    /// Whether any element participates in the MCP/LCP complementarity
    /// system.
    pub fn has_mcp_elements(&self) -> bool {
        self.elements.iter().any(|e| e.is_mcp())
    }
}
