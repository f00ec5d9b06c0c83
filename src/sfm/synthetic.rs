extern crate nalgebra as na;

use na::{Matrix3, Matrix3x4, Vector2, Vector3};
use rand::{rngs::SmallRng, Rng, SeedableRng, seq::index};
use rand_distr::{Distribution, Normal};
use serde::{Serialize, Deserialize};
use crate::{float, Float};
use crate::image::features::{PointFeature, matches::Matches};
use crate::sensors::camera::pinhole::PinholeCamera;

/**
 * Cameras on a ring around the origin, each looking at a jittered target near the origin.
 * Points are drawn uniformly from the cube [-1,1]^3.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NViewDataSetConfig {
    pub focal: Float,
    pub principal_point: [Float; 2],
    pub distance: Float,
    pub jitter: Float,
    pub pixel_noise: Float,
    pub seed: u64
}

impl Default for NViewDataSetConfig {
    fn default() -> NViewDataSetConfig {
        NViewDataSetConfig {
            focal: 1000.0,
            principal_point: [500.0, 500.0],
            distance: 3.0,
            jitter: 0.2,
            pixel_noise: 0.0,
            seed: 42
        }
    }
}

#[derive(Debug, Clone)]
pub struct NViewDataSet {
    pub intrinsics: Vec<Matrix3<Float>>,
    pub rotations: Vec<Matrix3<Float>>,
    pub translations: Vec<Vector3<Float>>,
    pub points: Vec<Vector3<Float>>,
    /// observations[view][point]
    pub observations: Vec<Vec<Vector2<Float>>>
}

impl NViewDataSet {
    pub fn n_views(&self) -> usize {
        self.rotations.len()
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn camera(&self, view: usize) -> PinholeCamera {
        PinholeCamera::new(self.intrinsics[view], self.rotations[view], self.translations[view])
    }

    pub fn projection(&self, view: usize) -> Matrix3x4<Float> {
        self.camera(view).projection_matrix()
    }

    pub fn center(&self, view: usize) -> Vector3<Float> {
        self.camera(view).center()
    }
}

/**
 * Rotation whose rows are the camera axes of a camera at `center` looking at `target`, y roughly along `up`.
 */
pub fn look_at(center: &Vector3<Float>, target: &Vector3<Float>, up: &Vector3<Float>) -> Matrix3<Float> {
    let z = (target - center).normalize();
    let x = up.cross(&z).normalize();
    let y = z.cross(&x);
    Matrix3::<Float>::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

#[allow(non_snake_case)]
pub fn n_view_dataset(n_views: usize, n_points: usize, config: &NViewDataSetConfig) -> NViewDataSet {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let K = Matrix3::<Float>::new(config.focal, 0.0, config.principal_point[0],
                                  0.0, config.focal, config.principal_point[1],
                                  0.0, 0.0, 1.0);
    let up = Vector3::<Float>::new(0.0, 1.0, 0.0);

    let mut rotations = Vec::<Matrix3<Float>>::with_capacity(n_views);
    let mut translations = Vec::<Vector3<Float>>::with_capacity(n_views);
    for i in 0..n_views {
        let theta = 2.0*float::consts::PI*(i as Float)/(n_views as Float);
        let height = 0.2*config.distance*(((i % 3) as Float) - 1.0);
        let center = Vector3::<Float>::new(config.distance*theta.cos(), height, config.distance*theta.sin());
        let target = Vector3::<Float>::new(
            config.jitter*rng.gen_range(-1.0..1.0),
            config.jitter*rng.gen_range(-1.0..1.0),
            config.jitter*rng.gen_range(-1.0..1.0));
        let R = look_at(&center, &target, &up);
        translations.push(-R*center);
        rotations.push(R);
    }

    let points = (0..n_points)
        .map(|_| Vector3::<Float>::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect::<Vec<Vector3<Float>>>();

    let noise = match config.pixel_noise {
        s if s > 0.0 => Normal::new(0.0, s).ok(),
        _ => None
    };
    let observations = (0..n_views).map(|i| {
        let camera = PinholeCamera::new(K, rotations[i], translations[i]);
        points.iter().map(|p| {
            let x = camera.project_from_camera_frame(&camera.transform_to_camera_frame(p)).unwrap_or_else(Vector2::<Float>::zeros);
            match &noise {
                Some(n) => x + Vector2::<Float>::new(n.sample(&mut rng), n.sample(&mut rng)),
                None => x
            }
        }).collect::<Vec<Vector2<Float>>>()
    }).collect::<Vec<Vec<Vector2<Float>>>>();

    NViewDataSet { intrinsics: vec![K; n_views], rotations, translations, points, observations }
}

/**
 * Every observation becomes a track of its point, except that in each image the first `n_outliers`
 * points are filed under randomly sampled tracks. Later insertions overwrite earlier ones.
 */
pub fn generate_matches(data: &NViewDataSet, n_outliers: usize, seed: u64) -> Matches {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n_points = data.n_points();
    let n_outliers = n_outliers.min(n_points);
    let mut matches = Matches::new();
    for (view, observations) in data.observations.iter().enumerate() {
        let wrong_matches = index::sample(&mut rng, n_points, n_outliers).into_vec();
        for (p, x) in observations.iter().enumerate() {
            let track = match p < n_outliers {
                true => wrong_matches[p],
                false => p
            };
            matches.insert(view, track, PointFeature::from(*x));
        }
    }
    matches
}
