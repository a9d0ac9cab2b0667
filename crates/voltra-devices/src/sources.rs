//! Independent voltage and current sources, driven by a time-varying
//! waveform callable.

use std::sync::Arc;

use nalgebra::DVector;
use voltra_core::{CoreError, Element, MnaSystem, NodeIndex, NodeKey};

/// A source's value as a function of simulation time.
pub type WaveformFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Constant (DC) waveform.
pub fn constant(value: f64) -> WaveformFn {
    Arc::new(move |_t| value)
}

/// SPICE-style `PULSE`: `v1` until `delay`, linear ramp to `v2` over `rise`,
/// holds for `width`, ramps back over `fall`, then repeats every `period`
/// (a `period` of `0.0` disables repetition).
pub fn pulse(v1: f64, v2: f64, delay: f64, rise: f64, fall: f64, width: f64, period: f64) -> WaveformFn {
    Arc::new(move |t| {
        let t = if period > 0.0 && t > delay {
            delay + (t - delay) % period
        } else {
            t
        };
        if t < delay {
            v1
        } else if t < delay + rise {
            v1 + (v2 - v1) * (t - delay) / rise.max(f64::MIN_POSITIVE)
        } else if t < delay + rise + width {
            v2
        } else if t < delay + rise + width + fall {
            v2 + (v1 - v2) * (t - delay - rise - width) / fall.max(f64::MIN_POSITIVE)
        } else {
            v1
        }
    })
}

/// SPICE-style damped `SIN`: `offset + amplitude * sin(2*pi*freq*(t-delay)) *
/// exp(-damping*(t-delay))` for `t >= delay`, else `offset`.
pub fn sine(offset: f64, amplitude: f64, freq: f64, delay: f64, damping: f64) -> WaveformFn {
    Arc::new(move |t| {
        if t < delay {
            offset
        } else {
            let tau = t - delay;
            offset + amplitude * (2.0 * std::f64::consts::PI * freq * tau).sin() * (-damping * tau).exp()
        }
    })
}

/// Independent voltage source. Always needs a branch current variable.
#[derive(Clone)]
pub struct VoltageSource {
    name: String,
    n_pos: NodeKey,
    n_neg: NodeKey,
    waveform: WaveformFn,
    terminals: Vec<NodeKey>,
    idx_pos: Option<usize>,
    idx_neg: Option<usize>,
    current_index: usize,
}

impl std::fmt::Debug for VoltageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoltageSource")
            .field("name", &self.name)
            .field("n_pos", &self.n_pos)
            .field("n_neg", &self.n_neg)
            .finish_non_exhaustive()
    }
}

impl VoltageSource {
    pub fn new(
        name: impl Into<String>,
        n_pos: impl Into<NodeKey>,
        n_neg: impl Into<NodeKey>,
        waveform: WaveformFn,
    ) -> Self {
        let n_pos = n_pos.into();
        let n_neg = n_neg.into();
        let terminals = vec![n_pos.clone(), n_neg.clone()];
        Self {
            name: name.into(),
            n_pos,
            n_neg,
            waveform,
            terminals,
            idx_pos: None,
            idx_neg: None,
            current_index: 0,
        }
    }

    pub fn dc(name: impl Into<String>, n_pos: impl Into<NodeKey>, n_neg: impl Into<NodeKey>, value: f64) -> Self {
        Self::new(name, n_pos, n_neg, constant(value))
    }

    pub fn branch_row(&self, num_nodes: usize) -> usize {
        num_nodes + self.current_index
    }
}

impl Element for VoltageSource {
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

    fn needs_current_variable(&self) -> bool {
        true
    }

    fn bind(&mut self, nodes: &NodeIndex, current_index: Option<usize>) -> voltra_core::Result<()> {
        self.idx_pos = nodes.get(&self.n_pos);
        self.idx_neg = nodes.get(&self.n_neg);
        self.current_index = current_index.ok_or_else(|| {
            CoreError::bad_netlist(format!("{} needs a branch current variable", self.name))
        })?;
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, t: f64) {
        let value = (self.waveform)(t);
        mna.stamp_voltage_source(self.idx_pos, self.idx_neg, self.current_index, value);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

/// Independent current source. Contributes no branch current variable.
#[derive(Clone)]
pub struct CurrentSource {
    name: String,
    n_pos: NodeKey,
    n_neg: NodeKey,
    waveform: WaveformFn,
    terminals: Vec<NodeKey>,
    idx_pos: Option<usize>,
    idx_neg: Option<usize>,
}

impl std::fmt::Debug for CurrentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentSource")
            .field("name", &self.name)
            .field("n_pos", &self.n_pos)
            .field("n_neg", &self.n_neg)
            .finish_non_exhaustive()
    }
}

impl CurrentSource {
    pub fn new(
        name: impl Into<String>,
        n_pos: impl Into<NodeKey>,
        n_neg: impl Into<NodeKey>,
        waveform: WaveformFn,
    ) -> Self {
        let n_pos = n_pos.into();
        let n_neg = n_neg.into();
        let terminals = vec![n_pos.clone(), n_neg.clone()];
        Self {
            name: name.into(),
            n_pos,
            n_neg,
            waveform,
            terminals,
            idx_pos: None,
            idx_neg: None,
        }
    }

    pub fn dc(name: impl Into<String>, n_pos: impl Into<NodeKey>, n_neg: impl Into<NodeKey>, value: f64) -> Self {
        Self::new(name, n_pos, n_neg, constant(value))
    }
}

impl Element for CurrentSource {
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
        self.idx_pos = nodes.get(&self.n_pos);
        self.idx_neg = nodes.get(&self.n_neg);
        Ok(())
    }

    fn init_transient(&mut self, _initial_state: &DVector<f64>) {}

    fn update_companion(&mut self, _h: f64) -> Result<(), CoreError> {
        Ok(())
    }

    fn stamp(&self, mna: &mut MnaSystem, t: f64) {
        let value = (self.waveform)(t);
        mna.stamp_current_source(self.idx_pos, self.idx_neg, value);
    }

    fn update_history(&mut self, _solution: &DVector<f64>, _h: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltra_core::NodeIndex;

    #[test]
    fn voltage_source_stamps_dc_value() {
        let mut nodes = NodeIndex::new();
        nodes.resolve(&NodeKey::new("out"));
        let mut v = VoltageSource::dc("V1", "out", "0", 5.0);
        v.bind(&nodes, Some(0)).unwrap();
        let mut mna = MnaSystem::new(1, 1);
        v.stamp(&mut mna, 0.0);
        assert_eq!(mna.rhs()[1], 5.0);
    }

    #[test]
    fn pulse_ramps_between_levels() {
        let wf = pulse(0.0, 5.0, 1.0, 0.5, 0.5, 1.0, 0.0);
        assert_eq!(wf(0.0), 0.0);
        assert!((wf(1.25) - 2.5).abs() < 1e-9);
        assert_eq!(wf(1.5), 5.0);
    }

    #[test]
    fn sine_starts_at_offset_before_delay() {
        let wf = sine(1.0, 2.0, 60.0, 0.01, 0.0);
        assert_eq!(wf(0.0), 1.0);
    }
}
