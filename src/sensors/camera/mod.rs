extern crate nalgebra as na;

use na::{Matrix3, Matrix3x4, Vector2, Vector3, Vector4};
use crate::Float;

pub mod pinhole;
pub mod projective;

use pinhole::PinholeCamera;
use projective::ProjectiveCamera;

/**
 * Camera models a reconstruction can hold.
 * Projective cameras come out of uncalibrated initialisation and resection and become pinhole cameras after a metric upgrade.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub enum Camera {
    Pinhole(PinholeCamera),
    Projective(ProjectiveCamera)
}

impl Camera {
    pub fn projection_matrix(&self) -> Matrix3x4<Float> {
        match self {
            Camera::Pinhole(c) => c.projection_matrix(),
            Camera::Projective(c) => *c.projection_matrix()
        }
    }

    /**
     * Projects a homogeneous world point to pixel coordinates.
     */
    pub fn project(&self, point: &Vector4<Float>) -> Option<Vector2<Float>> {
        match self {
            Camera::Pinhole(c) => {
                let w = point[3];
                if w.abs() < Float::EPSILON {
                    return None;
                }
                c.project_from_camera_frame(&c.transform_to_camera_frame(&(point.fixed_rows::<3>(0)/w)))
            },
            Camera::Projective(c) => c.project(point)
        }
    }

    /**
     * Multiple View Geometry - Hartley & Zisserman p.162
     * Signed depth of a homogeneous point, positive in front of the camera.
     */
    pub fn depth(&self, point: &Vector4<Float>) -> Float {
        let p = self.projection_matrix();
        let m = p.fixed_columns::<3>(0);
        let w = (p*point)[2];
        let det_sign = m.determinant().signum();
        let m3_norm = m.row(2).norm();
        match point[3] {
            t if t.abs() < Float::EPSILON || m3_norm < Float::EPSILON => 0.0,
            t => det_sign*w/(t*m3_norm)
        }
    }

    pub fn as_pinhole(&self) -> Option<&PinholeCamera> {
        match self {
            Camera::Pinhole(c) => Some(c),
            Camera::Projective(_) => None
        }
    }

    pub fn as_projective(&self) -> Option<&ProjectiveCamera> {
        match self {
            Camera::Projective(c) => Some(c),
            Camera::Pinhole(_) => None
        }
    }
}

impl From<PinholeCamera> for Camera {
    fn from(camera: PinholeCamera) -> Camera {
        Camera::Pinhole(camera)
    }
}

impl From<ProjectiveCamera> for Camera {
    fn from(camera: ProjectiveCamera) -> Camera {
        Camera::Projective(camera)
    }
}

/**
 * Photogrammetric Computer Vision p.498
 * Decomposes a general camera projection P into K[R|t] with a positive diagonal of K and det(R) = 1.
 * Returns None if the left 3x3 block of P is singular.
 */
#[allow(non_snake_case)]
pub fn decompose_projection(projection_matrix: &Matrix3x4<Float>) -> Option<PinholeCamera> {
    let A = projection_matrix.fixed_columns::<3>(0).into_owned();
    let a = projection_matrix.fixed_columns::<1>(3).into_owned();

    let Z = -A.try_inverse()?*a;
    let A_norm = match A.determinant() {
        det if det < 0.0 => -A,
        det if det > 0.0 => A,
        _ => return None
    };
    let qr_decomp = A_norm.try_inverse()?.qr();
    let mut R = qr_decomp.q().try_inverse()?;
    let mut K = qr_decomp.r().try_inverse()?;
    let K_diag = K.diagonal();
    let mut K_diag_sign = Vector3::<Float>::zeros();
    for i in 0..3 {
        K_diag_sign[i] = match K_diag[i] {
            v if v < 0.0 => -1.0,
            v if v > 0.0 => 1.0,
            _ => return None
        };
    }

    let D = Matrix3::<Float>::from_diagonal(&K_diag_sign);
    R = D*R;
    K = K*D;
    K = K/K[(2,2)];

    let t = -R*Z;
    Some(PinholeCamera::new(K, R, t))
}
