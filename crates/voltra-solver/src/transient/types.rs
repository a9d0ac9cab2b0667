//! Parameters and run statistics for the MNA/BDF2 transient engine.

/// Parameters for `run_transient`, carrying every field named under
/// `run_transient`'s `params` argument: start/stop time, step bounds, and
/// the predictor/damping/adaptive-stepping feature flags.
#[derive(Debug, Clone)]
pub struct TransientParams {
    pub start_time: f64,
    pub stop_time: f64,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub enable_predictor: bool,
    pub enable_damping: bool,
    pub max_voltage_step: f64,
    pub damping_factor: f64,
    pub adaptive_step: bool,
    pub convergence_tolerance: f64,
    pub max_lcp_iterations: usize,
    pub collect_statistics: bool,
}

impl TransientParams {
    /// Construct parameters for `[start_time, stop_time]` at a fixed
    /// `initial_step`, deriving `min_step`/`max_step` from it the way the
    /// teacher's `AdaptiveTransientParams::for_tstop` does.
    pub fn new(start_time: f64, stop_time: f64, initial_step: f64) -> Self {
        Self {
            start_time,
            stop_time,
            initial_step,
            min_step: initial_step * 1e-6,
            max_step: (stop_time - start_time).max(initial_step) / 10.0,
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 0.0,
            initial_step: 0.0,
            min_step: 0.0,
            max_step: 0.0,
            enable_predictor: true,
            enable_damping: true,
            max_voltage_step: 5.0,
            damping_factor: 0.8,
            adaptive_step: true,
            convergence_tolerance: 1e-9,
            max_lcp_iterations: 1000,
            collect_statistics: true,
        }
    }
}

impl Default for TransientParams {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Accumulated statistics for a completed (or partially completed) run.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub avg_lcp_iterations: f64,
    pub max_lcp_iterations: usize,
    pub total_lu_solves: usize,
    lcp_calls: usize,
    lcp_iteration_sum: usize,
}

impl RunStatistics {
    pub fn record_lcp(&mut self, iterations: usize) {
        self.lcp_calls += 1;
        self.lcp_iteration_sum += iterations;
        self.max_lcp_iterations = self.max_lcp_iterations.max(iterations);
        self.avg_lcp_iterations = self.lcp_iteration_sum as f64 / self.lcp_calls as f64;
    }
}
