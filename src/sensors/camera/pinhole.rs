extern crate nalgebra as na;

use na::{U1,U3, Matrix2x3, Matrix3, Matrix3x4, Matrix4, Vector, Vector2, Vector3, base::storage::Storage};
use crate::Float;
use crate::numerics::{lie::exp_se3, pose::optimal_correction_of_rotation};

/**
 * Calibrated camera x ~ K[R|t]X. The translation is the world origin expressed in the camera frame.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct PinholeCamera {
    intrinsics: Matrix3<Float>,
    rotation: Matrix3<Float>,
    translation: Vector3<Float>
}

impl PinholeCamera {
    pub fn new(intrinsics: Matrix3<Float>, rotation: Matrix3<Float>, translation: Vector3<Float>) -> PinholeCamera {
        PinholeCamera { intrinsics, rotation, translation }
    }

    pub fn at_world_origin(intrinsics: Matrix3<Float>) -> PinholeCamera {
        PinholeCamera::new(intrinsics, Matrix3::<Float>::identity(), Vector3::<Float>::zeros())
    }

    pub fn intrinsics(&self) -> &Matrix3<Float> {
        &self.intrinsics
    }

    pub fn rotation(&self) -> &Matrix3<Float> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<Float> {
        &self.translation
    }

    pub fn get_fx(&self) -> Float {
        self.intrinsics[(0,0)]
    }

    pub fn get_fy(&self) -> Float {
        self.intrinsics[(1,1)]
    }

    pub fn set_translation(&mut self, translation: Vector3<Float>) -> () {
        self.translation = translation;
    }

    pub fn center(&self) -> Vector3<Float> {
        -self.rotation.transpose()*self.translation
    }

    pub fn set_center(&mut self, center: &Vector3<Float>) -> () {
        self.translation = -self.rotation*center;
    }

    pub fn projection_matrix(&self) -> Matrix3x4<Float> {
        let mut extrinsics = Matrix3x4::<Float>::zeros();
        extrinsics.fixed_view_mut::<3,3>(0,0).copy_from(&self.rotation);
        extrinsics.fixed_view_mut::<3,1>(0,3).copy_from(&self.translation);
        self.intrinsics*extrinsics
    }

    /**
     * Pose updated on the left by exp((u,w)), i.e. T <- exp(delta)*T.
     * The rotation is projected back onto SO(3) to keep repeated updates from drifting.
     */
    pub fn left_perturbed(&self, u: &Vector3<Float>, w: &Vector3<Float>) -> PinholeCamera {
        let mut pose = Matrix4::<Float>::identity();
        pose.fixed_view_mut::<3,3>(0,0).copy_from(&self.rotation);
        pose.fixed_view_mut::<3,1>(0,3).copy_from(&self.translation);
        let updated = exp_se3(u, w)*pose;
        let rotation = updated.fixed_view::<3,3>(0,0).into_owned();
        let rotation = optimal_correction_of_rotation(&rotation).unwrap_or(rotation);
        PinholeCamera::new(self.intrinsics, rotation, updated.fixed_view::<3,1>(0,3).into_owned())
    }

    pub fn transform_to_camera_frame<T>(&self, position: &Vector<Float,U3,T>) -> Vector3<Float> where T: Storage<Float,U3,U1> {
        self.rotation*position + self.translation
    }

    /**
     * Projects a point given in the camera frame. Points on the principal plane have no image.
     */
    pub fn project_from_camera_frame<T>(&self, position: &Vector<Float,U3,T>) -> Option<Vector2<Float>> where T: Storage<Float,U3,U1> {
        let z = position[2];
        if z.abs() < Float::EPSILON {
            return None;
        }
        let projected = self.intrinsics*(position/z);
        Some(Vector2::<Float>::new(projected[0], projected[1]))
    }

    pub fn get_jacobian_with_respect_to_position_in_camera_frame<T>(&self, position: &Vector<Float,U3,T>) -> Option<Matrix2x3<Float>> where T: Storage<Float,U3,U1> {
        let x = position[0];
        let y = position[1];
        let z = position[2];
        if z.abs() < Float::EPSILON {
            return None;
        }
        let z_sqrd = z.powi(2);
        let fx = self.get_fx();
        let fy = self.get_fy();
        let s = self.intrinsics[(0,1)];

        Some(Matrix2x3::<Float>::new(fx/z, s/z, -(fx*x + s*y)/z_sqrd,
                                     0.0, fy/z, -(fy*y)/z_sqrd))
    }
}
