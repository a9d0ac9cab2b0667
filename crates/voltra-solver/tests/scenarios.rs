//! End-to-end scenario tests exercising the full preprocess -> transient
//! pipeline against circuits with known closed-form behavior.

use voltra_core::Circuit;
use voltra_devices::{sine, Capacitor, Diode, Inductor, Resistor, Transformer, VoltageSource, Winding};
use voltra_solver::{preprocess, run_transient, select_strategy, Strategy, TransientParams};

fn node_voltage(result: &voltra_solver::TransientResult, pre: &voltra_solver::PreprocessedCircuit, node: &str, time: f64) -> f64 {
    let row = pre.nodes.get(&voltra_core::NodeKey::new(node)).expect("node must exist");
    result.voltage_at(row, time).expect("time within run bounds")
}

#[test]
fn s1_resistive_divider_settles_at_half_the_source_voltage() {
    let mut circuit = Circuit::new();
    circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 10.0))).unwrap();
    circuit.add_element(Box::new(Resistor::new("R1", "in", "mid", 1000.0))).unwrap();
    circuit.add_element(Box::new(Resistor::new("R2", "mid", "0", 1000.0))).unwrap();

    assert_eq!(select_strategy(&circuit), Strategy::DegenerateDc);

    let mut pre = preprocess(circuit).unwrap();
    let params = TransientParams::new(0.0, 1e-3, 1e-4);
    let (result, error) = run_transient(&mut pre, &params, &|| false);
    assert!(error.is_none());

    let v_mid = node_voltage(&result, &pre, "mid", 1e-3);
    assert!((v_mid - 5.0).abs() < 1e-6, "V(mid) = {v_mid}");
}

#[test]
fn s2_rc_circuit_charges_to_within_1_percent_after_five_time_constants() {
    let mut circuit = Circuit::new();
    circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
    circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
    circuit.add_element(Box::new(Capacitor::new("C1", "out", "0", 1e-6, 0.0))).unwrap();

    let mut pre = preprocess(circuit).unwrap();
    let tau = 1000.0 * 1e-6;
    let params = TransientParams::new(0.0, 5.0 * tau, tau / 100.0);
    let (result, error) = run_transient(&mut pre, &params, &|| false);
    assert!(error.is_none());

    let v_final = node_voltage(&result, &pre, "out", 5.0 * tau);
    assert!((v_final - 5.0).abs() < 0.05, "V(out) = {v_final}");
}

#[test]
fn s3_underdamped_rlc_ring_oscillates_near_the_resonant_frequency() {
    // Series RLC driven by a step, lightly damped so it rings.
    let mut circuit = Circuit::new();
    circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 1.0))).unwrap();
    circuit.add_element(Box::new(Resistor::new("R1", "in", "a", 10.0))).unwrap();
    circuit.add_element(Box::new(Inductor::new("L1", "a", "b", 1e-3, 0.0))).unwrap();
    circuit.add_element(Box::new(Capacitor::new("C1", "b", "0", 1e-6, 0.0))).unwrap();

    let mut pre = preprocess(circuit).unwrap();
    let omega0 = 1.0 / (1e-3_f64 * 1e-6).sqrt();
    let period = 2.0 * std::f64::consts::PI / omega0;
    let params = TransientParams::new(0.0, 5.0 * period, period / 200.0);
    let (result, error) = run_transient(&mut pre, &params, &|| false);
    assert!(error.is_none());

    let voltages: Vec<f64> = result.points.iter().map(|p| p.solution[pre.nodes.get(&voltra_core::NodeKey::new("b")).unwrap()]).collect();
    let times: Vec<f64> = result.points.iter().map(|p| p.time).collect();

    let mut crossings = Vec::new();
    for i in 1..voltages.len() {
        if (voltages[i - 1] - 1.0) > 0.0 && (voltages[i] - 1.0) <= 0.0 {
            let t = times[i - 1] + (1.0 - voltages[i - 1]) * (times[i] - times[i - 1]) / (voltages[i] - voltages[i - 1]);
            crossings.push(t);
        }
    }
    assert!(crossings.len() >= 2, "expected at least two ringing crossings, got {}", crossings.len());
    let measured_period = crossings[1] - crossings[0];
    let error = (measured_period - period).abs() / period;
    assert!(error < 0.1, "measured period {measured_period} vs expected {period} ({:.1}% off)", error * 100.0);
}

#[test]
fn s4_ideal_diode_blocks_the_negative_half_cycle() {
    let mut circuit = Circuit::new();
    let wf = sine(0.0, 5.0, 1000.0, 0.0, 0.0);
    circuit.add_element(Box::new(VoltageSource::new("V1", "in", "0", wf))).unwrap();
    circuit.add_element(Box::new(Diode::new("D1", "in", "out", 0.0, 0.0))).unwrap();
    circuit.add_element(Box::new(Resistor::new("R1", "out", "0", 1000.0))).unwrap();

    assert_eq!(select_strategy(&circuit), Strategy::MnaMcp);

    let mut pre = preprocess(circuit).unwrap();
    let period = 1e-3;
    let params = TransientParams::new(0.0, 2.0 * period, period / 200.0);
    let (result, error) = run_transient(&mut pre, &params, &|| false);
    assert!(error.is_none());

    // Quarter into the cycle the source is near its positive peak: the
    // diode should be conducting and V(out) should track it closely.
    let v_out_pos = node_voltage(&result, &pre, "out", period / 4.0);
    assert!(v_out_pos > 4.0, "V(out) during positive half-cycle = {v_out_pos}");

    // Three-quarters in, the source is near its negative peak: the diode
    // should block and V(out) should sit near zero.
    let v_out_neg = node_voltage(&result, &pre, "out", 3.0 * period / 4.0);
    assert!(v_out_neg.abs() < 0.1, "V(out) during negative half-cycle = {v_out_neg}");
}

#[test]
fn s5_one_to_one_transformer_couples_primary_into_secondary() {
    let mut circuit = Circuit::new();
    let wf = sine(0.0, 5.0, 1000.0, 0.0, 0.0);
    circuit.add_element(Box::new(VoltageSource::new("V1", "p1", "0", wf))).unwrap();
    circuit.add_element(Box::new(Resistor::new("Rp", "p1", "p2", 10.0))).unwrap();
    circuit
        .add_element(Box::new(Transformer::new(
            "T1",
            vec![Winding::new("p2", "0", 1e-3), Winding::new("s1", "0", 1e-3)],
            0.999,
        )))
        .unwrap();
    circuit.add_element(Box::new(Resistor::new("Rs", "s1", "0", 1000.0))).unwrap();

    let mut pre = preprocess(circuit).unwrap();
    let period = 1e-3;
    let params = TransientParams::new(0.0, 3.0 * period, period / 400.0);
    let (result, error) = run_transient(&mut pre, &params, &|| false);
    assert!(error.is_none());

    let v_primary = node_voltage(&result, &pre, "p2", 2.25 * period);
    let v_secondary = node_voltage(&result, &pre, "s1", 2.25 * period);
    // With tight coupling and a 1:1 turns ratio the secondary should follow
    // the primary's sign and be within the same order of magnitude.
    assert!(v_primary.signum() == v_secondary.signum() || v_secondary.abs() < 0.1);
    assert!(v_secondary.abs() > 0.1, "secondary should show an induced voltage, got {v_secondary}");
}

#[test]
fn s6_variable_step_bdf2_matches_fixed_step_within_tolerance() {
    // The same RC charge, once at a fixed small step and once allowed to
    // grow (adaptive_step default), should agree closely by 5 tau: this
    // exercises the variable-step coefficient law end to end rather than
    // in isolation (see `voltra_devices::bdf2` for the coefficient-level
    // tests).
    let build = || {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Capacitor::new("C1", "out", "0", 1e-6, 0.0))).unwrap();
        circuit
    };

    let tau = 1000.0 * 1e-6;

    let mut pre_fixed = preprocess(build()).unwrap();
    let mut params_fixed = TransientParams::new(0.0, 5.0 * tau, tau / 500.0);
    params_fixed.adaptive_step = false;
    let (result_fixed, error_fixed) = run_transient(&mut pre_fixed, &params_fixed, &|| false);
    assert!(error_fixed.is_none());

    let mut pre_adaptive = preprocess(build()).unwrap();
    let params_adaptive = TransientParams::new(0.0, 5.0 * tau, tau / 500.0);
    let (result_adaptive, error_adaptive) = run_transient(&mut pre_adaptive, &params_adaptive, &|| false);
    assert!(error_adaptive.is_none());

    let v_fixed = node_voltage(&result_fixed, &pre_fixed, "out", 5.0 * tau);
    let v_adaptive = node_voltage(&result_adaptive, &pre_adaptive, "out", 5.0 * tau);
    assert!((v_fixed - v_adaptive).abs() < 0.02, "fixed={v_fixed} adaptive={v_adaptive}");
    assert!(
        result_adaptive.statistics.accepted_steps <= result_fixed.statistics.accepted_steps,
        "adaptive stepping should not need more accepted steps than the fixed-step run"
    );
}
