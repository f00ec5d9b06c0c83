extern crate nalgebra as na;

use na::{DMatrix, DVector};
use crate::Float;

/**
 * Damped normal equation step (J^T J + mu*I) h = -J^T r.
 * Returns the step, the gradient J^T r, the denominator of the gain ratio and the damping used.
 * If mu is None it is initialised as tau times the largest diagonal entry of J^T J.
 */
#[allow(non_snake_case)]
pub fn gauss_newton_step(
    residuals: &DVector<Float>,
    jacobian: &DMatrix<Float>,
    mu: Option<Float>,
    tau: Float) -> Option<(DVector<Float>, DVector<Float>, Float, Float)> {
    let (A,g) = (jacobian.transpose()*jacobian,jacobian.transpose()*residuals);
    let mu_val = match mu {
        None => tau*A.diagonal().max(),
        Some(v) => v
    };
    let n = A.nrows();
    let h = (A + DMatrix::<Float>::identity(n,n)*mu_val).cholesky()?.solve(&(-(&g)));
    let gain_ratio_denom = 0.5*h.dot(&(mu_val*(&h)-(&g)));
    Some((h,g,gain_ratio_denom, mu_val))
}

/**
 * Methods for non-linear least squares problems - Madsen, Nielsen, Tingleff
 * Damping update after an accepted step.
 */
pub fn accepted_damping(mu: Float, gain_ratio: Float) -> Float {
    mu*(1.0/3.0 as Float).max(1.0 - (2.0*gain_ratio - 1.0).powi(3))
}
