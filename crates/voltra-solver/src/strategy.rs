//! Picks which engine a circuit should be simulated with.
//!
//! A switch is a deterministic function of time (see
//! `voltra_devices::Switch`), not an MCP participant, so its presence
//! doesn't by itself force the implicit engine; only ideal diodes do.

use voltra_core::Circuit;

/// Which engine `run` (or a caller driving the engines directly) should
/// use for a given circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// At least one ideal diode is present: only the implicit MNA engine's
    /// MCP/LCP pass can resolve its on/off state.
    MnaMcp,
    /// No reactive element at all: a single solve at `t = start_time`
    /// fully characterizes the circuit, with no history to integrate.
    DegenerateDc,
    /// The default: implicit MNA/BDF2 transient integration.
    MnaBdf2,
}

/// Choose a [`Strategy`] for `circuit`.
pub fn select_strategy(circuit: &Circuit) -> Strategy {
    if circuit.has_mcp_elements() {
        return Strategy::MnaMcp;
    }
    if !circuit.elements().iter().any(|e| e.state_var().is_some()) {
        return Strategy::DegenerateDc;
    }
    Strategy::MnaBdf2
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_devices::{Capacitor, Diode, Resistor, VoltageSource};

    #[test]
    fn resistive_divider_is_degenerate_dc() {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R2", "out", "0", 1000.0))).unwrap();
        assert_eq!(select_strategy(&circuit), Strategy::DegenerateDc);
    }

    #[test]
    fn rc_circuit_is_mna_bdf2() {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "in", "out", 1000.0))).unwrap();
        circuit.add_element(Box::new(Capacitor::new("C1", "out", "0", 1e-6, 0.0))).unwrap();
        assert_eq!(select_strategy(&circuit), Strategy::MnaBdf2);
    }

    #[test]
    fn circuit_with_a_diode_forces_mna_mcp() {
        let mut circuit = Circuit::new();
        circuit.add_element(Box::new(VoltageSource::dc("V1", "in", "0", 5.0))).unwrap();
        circuit.add_element(Box::new(Diode::new("D1", "in", "out", 0.0, 0.0))).unwrap();
        circuit.add_element(Box::new(Resistor::new("R1", "out", "0", 1000.0))).unwrap();
        assert_eq!(select_strategy(&circuit), Strategy::MnaMcp);
    }
}
