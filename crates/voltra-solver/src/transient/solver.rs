//! The implicit MNA/BDF2 transient step loop.
//!
//! Each step runs predict -> stamp -> solve -> damp -> accept/reject.
//! Diodes (the only `is_mcp()` elements) are resolved by rebuilding the
//! base system with every diode forced to `v_d = 0`, handing it to
//! [`crate::mcp::solve_mcp`], and re-stamping with the resolved branch
//! voltages before the real solve.

use nalgebra::DVector;
use voltra_core::MnaSystem;
use voltra_devices::Diode;

use crate::error::{Error, Result};
use crate::linear;
use crate::mcp::{self, McpBranch};
use crate::preprocessor::PreprocessedCircuit;

use super::result::{TimePoint, TransientResult};
use super::types::{RunStatistics, TransientParams};

/// Element index, branch row, and element-table parameters (`Vf`, `Ron`) of
/// every diode in the circuit, resolved once up front so the step loop
/// doesn't re-scan the element list every step.
fn diode_branches(pre: &PreprocessedCircuit) -> Vec<(usize, usize, f64, f64)> {
    let num_nodes = pre.num_nodes();
    pre.circuit
        .elements()
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_any().downcast_ref::<Diode>().map(|d| (i, d.branch_row(num_nodes), d.vf(), d.ron())))
        .collect()
}

/// Assemble and stamp a fresh MNA system at `t`, including the
/// mutual-inductance coupling manager's cross terms.
fn assemble(pre: &PreprocessedCircuit, t: f64) -> Result<MnaSystem> {
    let mut mna = MnaSystem::new(pre.num_nodes(), pre.num_vsources);
    for element in pre.circuit.elements() {
        element.stamp(&mut mna, t);
    }
    pre.coupling.stamp(&pre.circuit, &mut mna)?;
    Ok(mna)
}

/// Attempt one step of size `step_h` landing at `t_new`, given the current
/// accepted solution `current` (needed only for damping). Returns the
/// candidate solution; does not commit element history.
fn attempt_step(
    pre: &mut PreprocessedCircuit,
    diodes: &[(usize, usize, f64, f64)],
    current: &DVector<f64>,
    t_new: f64,
    step_h: f64,
    params: &TransientParams,
    stats: &mut RunStatistics,
) -> Result<DVector<f64>> {
    for element in pre.circuit.elements_mut() {
        element.update_companion(step_h)?;
    }

    for &(idx, ..) in diodes {
        if let Some(d) = pre.circuit.elements_mut()[idx].as_any_mut().downcast_mut::<Diode>() {
            d.set_forced_voltage(0.0);
        }
    }

    let mut mna = assemble(pre, t_new)?;

    let mut solution = if !diodes.is_empty() {
        let branches: Vec<McpBranch> = diodes
            .iter()
            .map(|&(_, row, vf, ron)| McpBranch { branch_row: row, vf, ron })
            .collect();
        let mcp_solution = mcp::solve_mcp(&mna.to_dense_matrix(), mna.rhs(), &branches, params.max_lcp_iterations)?;
        stats.record_lcp(mcp_solution.iterations);
        stats.total_lu_solves += branches.len() + 1;

        for (&(idx, ..), &v) in diodes.iter().zip(mcp_solution.voltages.iter()) {
            if let Some(d) = pre.circuit.elements_mut()[idx].as_any_mut().downcast_mut::<Diode>() {
                d.set_forced_voltage(v);
            }
        }

        mna = assemble(pre, t_new)?;
        stats.total_lu_solves += 1;
        linear::solve(&mna.to_dense_matrix(), &mna.triplets, mna.rhs())?
    } else {
        stats.total_lu_solves += 1;
        linear::solve(&mna.to_dense_matrix(), &mna.triplets, mna.rhs())?
    };

    if !solution.iter().all(|v| v.is_finite()) {
        return Err(Error::NonFinite {
            where_: "transient step solution".to_string(),
        });
    }

    if params.enable_damping {
        for j in 0..pre.num_nodes() {
            let step = solution[j] - current[j];
            if step.abs() > params.max_voltage_step {
                log::debug!("damping clamped node row {j}: step {step:+.3} exceeds max_voltage_step {}", params.max_voltage_step);
                solution[j] = current[j] + step.signum() * params.max_voltage_step * params.damping_factor;
            }
        }
    }

    Ok(solution)
}

/// Run the implicit MNA/BDF2 transient engine over `[params.start_time,
/// params.stop_time]`.
///
/// `cancelled` is polled once per accepted step; when it returns `true` the
/// run stops with [`Error::Cancelled`]. On any fatal error the result
/// accumulated so far is returned alongside the error rather than
/// discarded, per the partial-result contract.
pub fn run_transient(
    pre: &mut PreprocessedCircuit,
    params: &TransientParams,
    cancelled: &dyn Fn() -> bool,
) -> (TransientResult, Option<Error>) {
    let num_nodes = pre.num_nodes();
    let diodes = diode_branches(pre);

    let initial = pre.initial_state();
    for element in pre.circuit.elements_mut() {
        element.init_transient(&initial);
    }

    let mut result = TransientResult {
        points: vec![TimePoint {
            time: params.start_time,
            solution: initial.clone(),
        }],
        num_nodes,
        statistics: RunStatistics::default(),
    };

    let mut current = initial;
    let mut before: Option<DVector<f64>> = None;
    let mut h_prev: Option<f64> = None;
    let mut h = params.initial_step;
    let mut t = params.start_time;

    while t < params.stop_time - 1e-15 {
        if cancelled() {
            return (result, Some(Error::Cancelled));
        }

        let step_h = h.min(params.stop_time - t).max(params.min_step);
        let t_new = t + step_h;

        match attempt_step(pre, &diodes, &current, t_new, step_h, params, &mut result.statistics) {
            Ok(solution) => {
                let lte = if params.enable_predictor && params.adaptive_step {
                    match (&before, h_prev) {
                        (Some(before), Some(hp)) => {
                            let predicted = &current + (step_h / hp) * (&current - before);
                            (&solution - &predicted).norm() / (solution.norm() + 1.0)
                        }
                        _ => 0.0,
                    }
                } else {
                    0.0
                };

                if params.adaptive_step && lte > params.convergence_tolerance.sqrt() {
                    result.statistics.rejected_steps += 1;
                    h = step_h * 0.5;
                    log::debug!("step rejected at t={t_new:.6e} (lte={lte:.3e}), halving h to {h:.3e}");
                    if h < params.min_step {
                        return (result, Some(Error::StepTooSmall { h, h_min: params.min_step }));
                    }
                    continue;
                }

                for element in pre.circuit.elements_mut() {
                    element.update_history(&solution, step_h);
                }

                before = Some(current);
                current = solution;
                t = t_new;
                h_prev = Some(step_h);
                result.statistics.accepted_steps += 1;
                result.points.push(TimePoint {
                    time: t,
                    solution: current.clone(),
                });

                if params.adaptive_step {
                    h = (step_h * 1.1).min(params.max_step);
                }
            }
            Err(e) if !e.is_fatal() && params.adaptive_step => {
                result.statistics.rejected_steps += 1;
                h = step_h * 0.5;
                log::debug!("step rejected at t={t_new:.6e} ({e}), halving h to {h:.3e}");
                if h < params.min_step {
                    return (result, Some(Error::StepTooSmall { h, h_min: params.min_step }));
                }
            }
            Err(e) => return (result, Some(e)),
        }
    }

    (result, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::Circuit;
    use voltra_devices::{Capacitor, Resistor, VoltageSource};

    fn rc_circuit() -> PreprocessedCircuit {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Capacitor::new("C1", "out", "0", 1e-6, 0.0))).unwrap();
        crate::preprocessor::preprocess(circuit).unwrap()
    }

    #[test]
    fn rc_circuit_charges_toward_source_voltage() {
        let mut pre = rc_circuit();
        let params = TransientParams::new(0.0, 5e-3, 10e-6);
        let (result, error) = run_transient(&mut pre, &params, &|| false);
        assert!(error.is_none());
        let out_row = pre.nodes.get(&voltra_core::NodeKey::new("out")).unwrap();
        let final_v = result.points.last().unwrap().solution[out_row];
        assert!((final_v - 5.0).abs() < 0.05, "V(out) = {final_v}");
    }

    #[test]
    fn rc_circuit_matches_exponential_at_one_time_constant() {
        let mut pre = rc_circuit();
        let params = TransientParams::new(0.0, 5e-3, 1e-6);
        let (result, error) = run_transient(&mut pre, &params, &|| false);
        assert!(error.is_none());
        let out_row = pre.nodes.get(&voltra_core::NodeKey::new("out")).unwrap();
        let v_tau = result.voltage_at(out_row, 1e-3).unwrap();
        let expected = 5.0 * (1.0 - (-1.0_f64).exp());
        assert!((v_tau - expected).abs() < 0.15, "V(tau) = {v_tau}, expected {expected}");
    }

    #[test]
    fn cancellation_aborts_the_run() {
        let mut pre = rc_circuit();
        let params = TransientParams::new(0.0, 5e-3, 10e-6);
        let (result, error) = run_transient(&mut pre, &params, &|| true);
        assert!(matches!(error, Some(Error::Cancelled)));
        assert_eq!(result.points.len(), 1);
    }
}
