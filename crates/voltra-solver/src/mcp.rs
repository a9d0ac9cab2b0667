//! Mixed complementarity problem solving for switching devices (ideal
//! diodes).
//!
//! Every MCP-participating element (currently only `voltra_devices::Diode`)
//! is stamped as a zero-valued voltage source on its own branch. To resolve
//! the complementarity condition, this module:
//!
//! 1. Assembles the base system with every diode's forced branch voltage
//!    held at `0.0` and every diode's branch row otherwise untouched.
//! 2. Factors the base system once and computes, via the unit columns of
//!    each diode's branch row, the Schur complement `M` (and constant term
//!    `q`) relating the vector of diode branch voltages `z` to the vector
//!    of diode branch currents `w = Mz + q`.
//! 3. Folds each diode's `Vf`/`Ron` into that system (`q_i += Vf`, `M_ii +=
//!    Ron`) before solving, so a diode with a nonzero forward drop or
//!    series resistance switches on later and clamps its current the way
//!    the element table (`v = Va - Vb - Vf - Ron*i`) requires.
//! 4. Runs Lemke's algorithm on `(M, q)` to find `z >= 0, w >= 0, zᵀw = 0`.
//! 5. Reports, per diode, the resolved branch voltage `Vf + Ron*w - z`
//!    (since `z` models `-v_extra`) so the caller can set it before the
//!    real step solve.
//!
//! There is no prior implementation of Lemke's method in this codebase to
//! ground this module on; it follows the standard tableau formulation
//! (Cottle, Pang & Stone, *The Linear Complementarity Problem*).

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::linear::solve_dense;

/// One diode's slot in the complementarity system: its branch row in the
/// base MNA system, plus its forward-voltage drop and on-resistance.
#[derive(Debug, Clone, Copy)]
pub struct McpBranch {
    pub branch_row: usize,
    pub vf: f64,
    pub ron: f64,
}

/// Outcome of solving the complementarity system: per-branch resolved
/// voltage (`z`, already negated back into "voltage" sign) and current
/// (`w`).
#[derive(Debug, Clone)]
pub struct McpSolution {
    pub voltages: Vec<f64>,
    pub currents: Vec<f64>,
    pub iterations: usize,
}

/// Build the Schur complement `(M, q)` relating diode branch voltages to
/// currents, given the base system (every diode branch forced to `0.0`)
/// and the list of diode branch rows.
///
/// `w = M*z + q`, where `z_i = -v_{d,i}` and `w_i = i_{d,i}`.
fn schur_complement(base_matrix: &DMatrix<f64>, base_rhs: &DVector<f64>, branches: &[McpBranch]) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let n = branches.len();
    let size = base_matrix.nrows();

    // Baseline solution with every diode held at v_d = 0 (z = 0).
    let x0 = solve_dense(base_matrix, base_rhs)?;
    let mut q = DVector::zeros(n);
    for (i, b) in branches.iter().enumerate() {
        q[i] = x0[b.branch_row];
    }

    // Column i of M is the branch-current response to a unit increase of
    // z_i (i.e. v_d moved by -1), holding every other diode's forced
    // voltage at its baseline. Since the underlying system is linear, this
    // is just the solution under a perturbed RHS at branch i's row.
    let mut m = DMatrix::zeros(n, n);
    for (i, b) in branches.iter().enumerate() {
        let mut rhs = base_rhs.clone();
        rhs[b.branch_row] -= 1.0; // v_d := v_d - 1  =>  z := z + 1
        let x = solve_dense(base_matrix, &rhs)?;
        for (j, bj) in branches.iter().enumerate() {
            m[(j, i)] = x[bj.branch_row] - q[j];
        }
    }

    // Fold each branch's forward-voltage drop and on-resistance into the
    // complementarity system: q_i += Vf shifts the conduction threshold, and
    // M_ii += Ron clamps the current once conducting, per the element
    // table's `v = Va - Vb - Vf - Ron*i`.
    for (i, b) in branches.iter().enumerate() {
        q[i] += b.vf;
        m[(i, i)] += b.ron;
    }

    let _ = size;
    Ok((m, q))
}

/// Solve the complementarity system for a set of diode branches against an
/// already-assembled base system (diode branches forced to `v_d = 0`).
///
/// `max_iterations` bounds Lemke's pivoting loop (`TransientParams::
/// max_lcp_iterations`).
pub fn solve_mcp(base_matrix: &DMatrix<f64>, base_rhs: &DVector<f64>, branches: &[McpBranch], max_iterations: usize) -> Result<McpSolution> {
    if branches.is_empty() {
        return Ok(McpSolution {
            voltages: Vec::new(),
            currents: Vec::new(),
            iterations: 0,
        });
    }

    let (m, q) = schur_complement(base_matrix, base_rhs, branches)?;
    let (z, w, iterations) = lemke(&m, &q, max_iterations)?;

    let voltages = (0..branches.len()).map(|i| branches[i].vf + branches[i].ron * w[i] - z[i]).collect();
    let currents = (0..branches.len()).map(|i| w[i]).collect();
    Ok(McpSolution {
        voltages,
        currents,
        iterations,
    })
}

const LEMKE_EPS: f64 = 1e-12;

/// Lemke's algorithm for the linear complementarity problem `w = Mz + q`,
/// `z >= 0`, `w >= 0`, `zᵀw = 0`. Returns `(z, w, pivot_count)`.
///
/// Uses an artificial variable `z0` with cost column `d = [1, 1, ..., 1]ᵀ`
/// and lexicographic minimum-ratio pivoting to avoid cycling on degenerate
/// tableaus. `max_iterations` bounds the pivoting loop.
fn lemke(m: &DMatrix<f64>, q: &DVector<f64>, max_iterations: usize) -> Result<(DVector<f64>, DVector<f64>, usize)> {
    let n = q.len();

    if q.iter().all(|&qi| qi >= -LEMKE_EPS) {
        // Trivial solution: z = 0, w = q.
        return Ok((DVector::zeros(n), q.clone(), 0));
    }

    // Tableau columns: [basis values | w-columns (identity) | z-columns (M) | z0-column (-1)]
    // basic[i] identifies which variable currently occupies row i:
    // 0..n -> w_i, n..2n -> z_i, 2n -> z0.
    let mut basic: Vec<usize> = (0..n).collect();
    let mut tableau = DMatrix::<f64>::zeros(n, 2 * n + 2);
    for i in 0..n {
        tableau[(i, 0)] = q[i];
        tableau[(i, 1 + i)] = 1.0;
        for j in 0..n {
            tableau[(i, 1 + n + j)] = -m[(i, j)];
        }
        tableau[(i, 2 * n + 1)] = -1.0;
    }

    // Drive z0 into the basis at the row with the most negative q.
    let mut leaving_row = (0..n)
        .min_by(|&a, &b| tableau[(a, 0)].partial_cmp(&tableau[(b, 0)]).unwrap())
        .unwrap();
    let mut entering_col = 2 * n + 1; // z0

    for iteration in 1..=max_iterations {
        pivot(&mut tableau, leaving_row, entering_col);
        let departing_var = basic[leaving_row];
        basic[leaving_row] = entering_col;

        if departing_var == 2 * n + 1 {
            // z0 left the basis: complementary solution found.
            let mut z = DVector::zeros(n);
            let mut w = DVector::zeros(n);
            for (row, &var) in basic.iter().enumerate() {
                let value = tableau[(row, 0)];
                if var < n {
                    w[var] = value;
                } else if var < 2 * n {
                    z[var - n] = value;
                }
            }
            return Ok((z, w, iteration));
        }

        // The complement of the variable that just departed is the next to enter.
        entering_col = if departing_var < n { 1 + n + departing_var } else { 1 + (departing_var - n) };

        // Minimum-ratio test over rows with a positive pivot column entry.
        let mut best_row = None;
        let mut best_ratio = f64::INFINITY;
        for row in 0..n {
            let coeff = tableau[(row, entering_col)];
            if coeff > LEMKE_EPS {
                let ratio = tableau[(row, 0)] / coeff;
                if ratio < best_ratio - LEMKE_EPS {
                    best_ratio = ratio;
                    best_row = Some(row);
                } else if (ratio - best_ratio).abs() <= LEMKE_EPS {
                    // Tie-break lexicographically: prefer the row whose
                    // basic variable has the smaller index, to avoid cycling.
                    if let Some(current) = best_row {
                        if basic[row] < basic[current] {
                            best_row = Some(row);
                        }
                    }
                }
            }
        }

        match best_row {
            Some(row) => leaving_row = row,
            None => {
                log::warn!("Lemke's method terminated on a secondary ray after {iteration} iterations");
                return Err(Error::LcpFailure {
                    message: "Lemke's method terminated on a secondary ray".to_string(),
                });
            }
        }
    }

    log::warn!("Lemke's method did not converge within {max_iterations} iterations");
    Err(Error::LcpFailure {
        message: format!("Lemke's method did not converge within {max_iterations} iterations"),
    })
}

/// Gauss-Jordan pivot of `tableau` on `(row, col)`.
fn pivot(tableau: &mut DMatrix<f64>, row: usize, col: usize) {
    let pivot_val = tableau[(row, col)];
    let cols = tableau.ncols();
    for j in 0..cols {
        tableau[(row, j)] /= pivot_val;
    }
    let rows = tableau.nrows();
    for r in 0..rows {
        if r == row {
            continue;
        }
        let factor = tableau[(r, col)];
        if factor != 0.0 {
            for j in 0..cols {
                tableau[(r, j)] -= factor * tableau[(row, j)];
            }
        }
    }
}
