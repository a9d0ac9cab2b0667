//! Explicit state-space transient engine: forward-Euler integration over a
//! reduced state vector of capacitor voltages and inductor currents.
//!
//! Reuses the same `PreprocessedCircuit` layout as the implicit engine so
//! `TransientResult`'s name-based accessors work identically against
//! either engine's output. A capacitor has no auxiliary row of its own, so
//! its terminal voltage is pinned to the state value through a large
//! conductance (`g_large`) plus a matching current source, the standard
//! companion trick for voltage-pinning without a branch-current unknown.
//! An inductor already owns a branch row from preprocessing; that row is
//! pinned directly to the state current instead of being stamped with its
//! BDF2 companion model.

use nalgebra::DVector;
use voltra_core::{MnaSystem, StateVarKind};

use crate::error::Result;
use crate::linear;
use crate::preprocessor::PreprocessedCircuit;
use crate::transient::result::{TimePoint, TransientResult};
use crate::transient::types::RunStatistics;

/// The only integration method the explicit engine currently offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationMethod {
    #[default]
    ForwardEuler,
}

/// Parameters for [`run_explicit`].
#[derive(Debug, Clone)]
pub struct StateSpaceParams {
    pub start_time: f64,
    pub stop_time: f64,
    pub step: f64,
    pub integration_method: IntegrationMethod,
    /// Conductance pinning a capacitor's terminal voltage to its state
    /// value; large relative to the rest of the network's conductances.
    pub g_large: f64,
}

impl StateSpaceParams {
    pub fn new(start_time: f64, stop_time: f64, step: f64) -> Self {
        Self {
            start_time,
            stop_time,
            step,
            integration_method: IntegrationMethod::ForwardEuler,
            g_large: 1e6,
        }
    }
}

/// Assemble the MNA system at `t`: every non-reactive element stamps
/// itself normally, and every state variable is pinned at its current
/// value `s[i]`.
fn assemble(pre: &PreprocessedCircuit, t: f64, s: &[f64], g_large: f64) -> MnaSystem {
    let mut mna = MnaSystem::new(pre.num_nodes(), pre.num_vsources);
    for element in pre.circuit.elements() {
        if element.state_var().is_none() {
            element.stamp(&mut mna, t);
        }
    }

    for (entry, &value) in pre.state_vars.iter().zip(s.iter()) {
        match entry.kind {
            StateVarKind::CapacitorVoltage => {
                mna.stamp_conductance(entry.idx1, entry.idx2, g_large);
                mna.stamp_current_source(entry.idx1, entry.idx2, g_large * value);
            }
            StateVarKind::InductorCurrent => {
                let br = entry.branch_row.expect("inductor state var always has a branch row");
                if let Some(i) = entry.idx1 {
                    mna.stamp(i, br, 1.0);
                    mna.stamp(br, i, 1.0);
                }
                if let Some(j) = entry.idx2 {
                    mna.stamp(j, br, -1.0);
                    mna.stamp(br, j, -1.0);
                }
                mna.stamp(br, br, 1.0);
                mna.add_rhs(br, value);
            }
        }
    }

    mna
}

/// Run the explicit forward-Euler state-space engine over
/// `[params.start_time, params.stop_time]`, starting every state variable at
/// its element's IC parameter (spec §4.2 rule 4, default 0).
pub fn run_explicit(pre: &PreprocessedCircuit, params: &StateSpaceParams) -> Result<TransientResult> {
    let mut s: Vec<f64> = pre.state_vars.iter().map(|entry| entry.initial_value).collect();
    let mut t = params.start_time;

    let mna0 = assemble(pre, t, &s, params.g_large);
    let mut solution: DVector<f64> = linear::solve(&mna0.to_dense_matrix(), &mna0.triplets, mna0.rhs())?;
    for (entry, value) in pre.state_vars.iter().zip(s.iter_mut()) {
        *value = entry.sample(&solution);
    }

    let mut result = TransientResult {
        points: vec![TimePoint {
            time: t,
            solution: solution.clone(),
        }],
        num_nodes: pre.num_nodes(),
        statistics: RunStatistics::default(),
    };

    while t < params.stop_time - 1e-15 {
        let h = params.step.min(params.stop_time - t);

        let mna = assemble(pre, t + h, &s, params.g_large);
        solution = linear::solve(&mna.to_dense_matrix(), &mna.triplets, mna.rhs())?;
        result.statistics.total_lu_solves += 1;

        for (entry, value) in pre.state_vars.iter().zip(s.iter_mut()) {
            let ds_dt = match entry.kind {
                StateVarKind::CapacitorVoltage => {
                    let v_node = entry.sample(&solution);
                    (v_node - *value) * params.g_large / entry.parameter
                }
                StateVarKind::InductorCurrent => {
                    let v1 = entry.idx1.map(|i| solution[i]).unwrap_or(0.0);
                    let v2 = entry.idx2.map(|i| solution[i]).unwrap_or(0.0);
                    (v1 - v2) / entry.parameter
                }
            };
            *value += h * ds_dt;
        }

        t += h;
        result.statistics.accepted_steps += 1;
        result.points.push(TimePoint {
            time: t,
            solution: solution.clone(),
        });
    }

    Ok(result)
}
