extern crate nalgebra as na;

use na::{Vector, Vector3, Matrix3, Matrix3x6, Matrix4, U3, U1, base::storage::Storage};
use crate::Float;

pub fn skew_symmetric<T>(w: &Vector<Float,U3,T>) -> Matrix3<Float> where T: Storage<Float,U3,U1>  {
    Matrix3::<Float>::new(0.0, -w[2], w[1],
                          w[2], 0.0, -w[0],
                          -w[1], w[0], 0.0)
}

/**
 * Jacobian of exp(delta)*p at delta = 0 for delta = (u,w), evaluated at the already transformed point p.
 */
pub fn left_jacobian_around_identity<T>(transformed_position: &Vector<Float,U3,T>) -> Matrix3x6<Float> where T: Storage<Float,U3,U1> {
    let skew_symmetrix = skew_symmetric(&(-1.0*transformed_position));
    let mut jacobian = Matrix3x6::<Float>::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                                               0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
                                               0.0, 0.0, 1.0, 0.0, 0.0, 0.0);

    for i in 3..6 {
        jacobian.set_column(i, &skew_symmetrix.column(i-3));
    }

    jacobian
}

#[allow(non_snake_case)]
fn rodrigues_coefficients(omega: Float) -> (Float, Float, Float) {
    let omega_sqr = omega.powi(2);
    match omega {
        o if o < 1e-6 => (1.0 - omega_sqr/6.0, 0.5 - omega_sqr/24.0, 1.0/6.0 - omega_sqr/120.0),
        _ => {
            let A = omega.sin()/omega;
            let B = (1.0 - omega.cos())/omega_sqr;
            let C = (1.0 - A)/omega_sqr;
            (A,B,C)
        }
    }
}

#[allow(non_snake_case)]
pub fn exp_so3<T>(w: &Vector<Float,U3,T>) -> Matrix3<Float> where T: Storage<Float,U3,U1> {
    let (A,B,_) = rodrigues_coefficients(w.norm());
    let w_x = skew_symmetric(w);
    let I = Matrix3::<Float>::identity();
    I + A*w_x + B*w_x*w_x
}

#[allow(non_snake_case)]
pub fn exp_se3<T>(u: &Vector<Float,U3,T>, w: &Vector<Float,U3,T>) -> Matrix4<Float> where T: Storage<Float,U3,U1> {
    let (A,B,C) = rodrigues_coefficients(w.norm());
    let w_x = skew_symmetric(w);
    let w_x_sqr = w_x*w_x;
    let I = Matrix3::<Float>::identity();
    let R = I + A*w_x + B*w_x_sqr;
    let V = I + B*w_x + C*w_x_sqr;
    let t: Vector3<Float> = V*u;

    let mut res = Matrix4::<Float>::identity();
    res.fixed_view_mut::<3,3>(0,0).copy_from(&R);
    res.fixed_view_mut::<3,1>(0,3).copy_from(&t);
    res
}
