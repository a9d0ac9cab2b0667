//! Variable-step BDF2 coefficients shared by every companion-model device.

/// Coefficients `(alpha, beta, gamma)` of the backward-difference derivative
/// approximation `dV/dt ≈ alpha*V_new + beta*V_prev + gamma*V_prev2`.
///
/// `h` is the step about to be attempted; `h_prev` is the size of the step
/// that produced `V_prev` from `V_prev2`. `h_prev = None` selects the
/// backward-Euler approximation (`alpha = 1/h, beta = -1/h, gamma = 0`),
/// used for the first accepted step of a run, when no second history point
/// exists yet.
pub fn bdf2_coefficients(h: f64, h_prev: Option<f64>) -> (f64, f64, f64) {
    match h_prev {
        None => (1.0 / h, -1.0 / h, 0.0),
        Some(h_prev) => {
            let r = h / h_prev;
            let alpha = (1.0 + 2.0 * r) / (h * (1.0 + r));
            let beta = -(1.0 + r) / h;
            let gamma = (r * r) / (h * (1.0 + r));
            (alpha, beta, gamma)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_backward_euler() {
        let (a, b, g) = bdf2_coefficients(0.1, None);
        assert_eq!(a, 10.0);
        assert_eq!(b, -10.0);
        assert_eq!(g, 0.0);
    }

    #[test]
    fn equal_steps_match_fixed_step_bdf2() {
        let (a, b, g) = bdf2_coefficients(0.1, Some(0.1));
        assert!((a - 15.0).abs() < 1e-12);
        assert!((b - (-20.0)).abs() < 1e-12);
        assert!((g - 5.0).abs() < 1e-12);
    }

    #[test]
    fn coefficients_sum_to_zero() {
        // dV/dt of a constant signal must vanish regardless of step ratio.
        for h_prev in [0.05, 0.1, 0.2, 0.37] {
            let (a, b, g) = bdf2_coefficients(0.1, Some(h_prev));
            assert!((a + b + g).abs() < 1e-10);
        }
    }
}
