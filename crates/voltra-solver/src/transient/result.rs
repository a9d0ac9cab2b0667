//! Result container for a transient run: raw timepoints plus name-based
//! accessors (`node_voltages`, `branch_currents`, `state_variables` in
//! spec terms) resolved against a [`PreprocessedCircuit`].

use nalgebra::DVector;
use voltra_core::NodeKey;

use super::types::RunStatistics;
use crate::preprocessor::PreprocessedCircuit;

/// A single timepoint in a transient simulation result.
#[derive(Debug, Clone)]
pub struct TimePoint {
    pub time: f64,
    pub solution: DVector<f64>,
}

/// Result of a transient simulation: a monotonically increasing time series
/// of full solution vectors, plus the statistics accumulated while producing
/// it.
#[derive(Debug, Clone)]
pub struct TransientResult {
    pub points: Vec<TimePoint>,
    pub num_nodes: usize,
    pub statistics: RunStatistics,
}

impl TransientResult {
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|tp| tp.time).collect()
    }

    /// Interpolate the full solution vector at `time`, clamping to the
    /// boundary values outside `[t_0, t_K]`.
    pub fn interpolate_at(&self, time: f64) -> Option<DVector<f64>> {
        if self.points.is_empty() {
            return None;
        }
        if time <= self.points[0].time {
            return Some(self.points[0].solution.clone());
        }
        if time >= self.points.last()?.time {
            return Some(self.points.last()?.solution.clone());
        }
        for i in 0..self.points.len() - 1 {
            let t0 = self.points[i].time;
            let t1 = self.points[i + 1].time;
            if time >= t0 && time <= t1 {
                let alpha = (time - t0) / (t1 - t0);
                let v0 = &self.points[i].solution;
                let v1 = &self.points[i + 1].solution;
                return Some(v0 * (1.0 - alpha) + v1 * alpha);
            }
        }
        None
    }

    /// Resample onto a uniform grid of step `tstep` over `[tstart, tstop]`,
    /// defaulting to the run's own time bounds.
    pub fn sample_at_times(&self, tstep: f64, tstart: Option<f64>, tstop: Option<f64>) -> TransientResult {
        let tstart = tstart.unwrap_or(0.0);
        let tstop = tstop.unwrap_or_else(|| self.points.last().map(|p| p.time).unwrap_or(0.0));

        let mut sampled = Vec::new();
        let mut t = tstart;
        while t <= tstop + tstep * 0.001 {
            if let Some(solution) = self.interpolate_at(t) {
                sampled.push(TimePoint { time: t, solution });
            }
            t += tstep;
        }

        TransientResult {
            points: sampled,
            num_nodes: self.num_nodes,
            statistics: self.statistics.clone(),
        }
    }

    /// Row-indexed node voltage across all timepoints.
    pub fn voltage_waveform(&self, node_row: usize) -> Vec<(f64, f64)> {
        self.points.iter().map(|tp| (tp.time, tp.solution[node_row])).collect()
    }

    pub fn voltage_at(&self, node_row: usize, time: f64) -> Option<f64> {
        self.interpolate_at(time).map(|sol| sol[node_row])
    }

    /// Name-based node voltage series. Ground reads as a constant `0.0`.
    pub fn node_voltage(&self, pre: &PreprocessedCircuit, node: impl Into<NodeKey>) -> Vec<f64> {
        let node = node.into();
        match pre.nodes.get(&node) {
            Some(row) => self.points.iter().map(|tp| tp.solution[row]).collect(),
            None => vec![0.0; self.points.len()],
        }
    }

    /// Name-based branch-current series for any element that owns an
    /// auxiliary current variable (voltage sources, inductors, CCVS,
    /// diodes, closed switches with a body diode). `None` if the element
    /// has no branch current.
    pub fn branch_current(&self, pre: &PreprocessedCircuit, element: &str) -> Option<Vec<f64>> {
        let row = *pre.current_rows.get(element)?;
        Some(self.points.iter().map(|tp| tp.solution[row]).collect())
    }

    /// Name-based reduced state-variable series (capacitor voltage or
    /// inductor current), matching the explicit engine's state vector
    /// layout for the same element.
    pub fn state_variable(&self, pre: &PreprocessedCircuit, element: &str) -> Option<Vec<f64>> {
        let entry = pre.state_vars.iter().find(|e| e.name == element)?;
        Some(
            self.points
                .iter()
                .map(|tp| entry.sample(&tp.solution))
                .collect(),
        )
    }
}
