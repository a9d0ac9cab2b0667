//! The Modified Nodal Analysis matrix and RHS buffer.
//!
//! `MnaSystem` is the per-step scratch buffer elements stamp into. It is
//! zeroed and rebuilt once per accepted (or attempted) step; see
//! `voltra_solver::transient` for the step loop that owns its lifecycle.

use nalgebra::{DMatrix, DVector};

/// Dense matrix + RHS for one assembled MNA system, plus a parallel sparse
/// triplet list for the `faer`-backed sparse solve path.
///
/// Every mutation goes through [`MnaSystem::stamp`] or
/// [`MnaSystem::add_rhs`] so the dense and sparse representations never
/// diverge — there is deliberately no `matrix_mut()` escape hatch.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    /// Number of non-ground nodes (rows `0..num_nodes`).
    pub num_nodes: usize,
    /// Number of auxiliary branch-current variables (rows
    /// `num_nodes..num_nodes+num_vsources`).
    pub num_vsources: usize,
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    /// `(row, col, value)` entries mirroring every call to `stamp`. Passed
    /// to the sparse solver; duplicate `(row, col)` entries are summed.
    pub triplets: Vec<(usize, usize, f64)>,
}

impl MnaSystem {
    /// Allocate a zeroed system of size `num_nodes + num_vsources`.
    pub fn new(num_nodes: usize, num_vsources: usize) -> Self {
        let size = num_nodes + num_vsources;
        Self {
            num_nodes,
            num_vsources,
            matrix: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
            triplets: Vec::new(),
        }
    }

    /// Total system size (`num_nodes + num_vsources`).
    pub fn size(&self) -> usize {
        self.num_nodes + self.num_vsources
    }

    /// Add `value` to `matrix[row][col]`, tracked in both the dense buffer
    /// and the sparse triplet list.
    pub fn stamp(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[(row, col)] += value;
        self.triplets.push((row, col, value));
    }

    /// Add `value` to `rhs[row]`.
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    /// Stamp a conductance `g` between two (possibly-ground) node rows.
    ///
    /// `G[n1,n1] += g; G[n2,n2] += g; G[n1,n2] -= g; G[n2,n1] -= g`, skipping
    /// any ground terminal (invariant: the ground row/column is never
    /// assembled).
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.stamp(i, i, g);
        }
        if let Some(j) = n2 {
            self.stamp(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.stamp(i, j, -g);
            self.stamp(j, i, -g);
        }
    }

    /// Stamp a voltage source of value `voltage` pinning `V[n_pos] -
    /// V[n_neg] = voltage`, with its branch current in auxiliary slot
    /// `branch` (0-based, relative to `num_nodes`).
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        branch: usize,
        voltage: f64,
    ) {
        let br = self.num_nodes + branch;
        if let Some(i) = n_pos {
            self.stamp(br, i, 1.0);
            self.stamp(i, br, 1.0);
        }
        if let Some(j) = n_neg {
            self.stamp(br, j, -1.0);
            self.stamp(j, br, -1.0);
        }
        self.add_rhs(br, voltage);
    }

    /// Inject `current` flowing from `n_pos` through the source to `n_neg`
    /// (current leaves `n_pos`, enters `n_neg`).
    pub fn stamp_current_source(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: f64) {
        if let Some(i) = n_pos {
            self.add_rhs(i, -current);
        }
        if let Some(j) = n_neg {
            self.add_rhs(j, current);
        }
    }

    /// Snapshot the dense matrix as assembled so far.
    pub fn to_dense_matrix(&self) -> DMatrix<f64> {
        self.matrix.clone()
    }

    /// Current RHS vector.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Mutable access to the RHS (for companion models that only touch the
    /// vector, e.g. a source waveform).
    pub fn rhs_mut(&mut self) -> &mut DVector<f64> {
        &mut self.rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_conductance_both_terminals() {
        let mut mna = MnaSystem::new(2, 0);
        mna.stamp_conductance(Some(0), Some(1), 2.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 2.0);
        assert_eq!(m[(0, 1)], -2.0);
        assert_eq!(m[(1, 0)], -2.0);
    }

    #[test]
    fn stamp_conductance_to_ground_only_diagonal() {
        let mut mna = MnaSystem::new(1, 0);
        mna.stamp_conductance(Some(0), None, 5.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 0)], 5.0);
    }

    #[test]
    fn stamp_voltage_source_kvl_row() {
        let mut mna = MnaSystem::new(1, 1);
        mna.stamp_voltage_source(Some(0), None, 0, 5.0);
        let m = mna.to_dense_matrix();
        assert_eq!(m[(0, 1)], 1.0); // node row couples to branch current
        assert_eq!(m[(1, 0)], 1.0); // KVL row
        assert_eq!(mna.rhs()[1], 5.0);
    }

    #[test]
    fn stamp_current_source_direction() {
        let mut mna = MnaSystem::new(2, 0);
        mna.stamp_current_source(Some(0), Some(1), 1.5);
        assert_eq!(mna.rhs()[0], -1.5);
        assert_eq!(mna.rhs()[1], 1.5);
    }

    #[test]
    fn triplets_mirror_dense_stamps() {
        let mut mna = MnaSystem::new(2, 0);
        mna.stamp_conductance(Some(0), Some(1), 1.0);
        let sum: f64 = mna
            .triplets
            .iter()
            .filter(|&&(r, c, _)| r == 0 && c == 0)
            .map(|&(_, _, v)| v)
            .sum();
        assert_eq!(sum, mna.to_dense_matrix()[(0, 0)]);
    }
}
