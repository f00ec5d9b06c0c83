use std::{fs, path::Path};
use serde::{Serialize, Deserialize};
use crate::Float;
use crate::numerics::ransac::RansacParameters;
use crate::sfm::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationParameters {
    pub max_reprojection_error: Option<Float>
}

impl Default for TriangulationParameters {
    fn default() -> TriangulationParameters {
        TriangulationParameters { max_reprojection_error: Some(4.0) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseRefinementParameters {
    pub max_iterations: usize,
    pub tau: Float
}

impl Default for PoseRefinementParameters {
    fn default() -> PoseRefinementParameters {
        PoseRefinementParameters { max_iterations: 20, tau: 1e-6 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricUpgradeParameters {
    /// Principal point shared by all images. The centroid of each image's observations is used otherwise.
    pub principal_point: Option<[Float; 2]>,
    /// Relative size of the second smallest singular value below which the quadric is not determined.
    pub rank_tolerance: Float,
    /// Largest skew, aspect ratio error or principal point offset, relative to the focal length, an upgraded camera may show.
    pub max_intrinsics_deviation: Float
}

impl Default for MetricUpgradeParameters {
    fn default() -> MetricUpgradeParameters {
        MetricUpgradeParameters { principal_point: None, rank_tolerance: 1e-9, max_intrinsics_deviation: 0.05 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleAdjustmentParameters {
    pub max_iterations: usize,
    pub tau: Float,
    pub eps_cost: Float,
    pub eps_gradient: Float,
    pub eps_step: Float
}

impl Default for BundleAdjustmentParameters {
    fn default() -> BundleAdjustmentParameters {
        BundleAdjustmentParameters {
            max_iterations: 100,
            tau: 1e-3,
            eps_cost: 1e-10,
            eps_gradient: 1e-10,
            eps_step: 1e-12
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOrderParameters {
    pub min_common_matches: usize
}

impl Default for ImageOrderParameters {
    fn default() -> ImageOrderParameters {
        ImageOrderParameters { min_common_matches: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParameters {
    pub two_view: RansacParameters,
    pub resection: RansacParameters,
    pub homography: RansacParameters,
    pub triangulation: TriangulationParameters,
    pub pose_refinement: PoseRefinementParameters,
    pub metric_upgrade: MetricUpgradeParameters,
    pub bundle_adjustment: BundleAdjustmentParameters,
    pub image_order: ImageOrderParameters
}

impl Default for ReconstructionParameters {
    fn default() -> ReconstructionParameters {
        ReconstructionParameters {
            two_view: RansacParameters::with_threshold(1.0),
            resection: RansacParameters::with_threshold(2.0),
            homography: RansacParameters::with_threshold(2.0),
            triangulation: TriangulationParameters::default(),
            pose_refinement: PoseRefinementParameters::default(),
            metric_upgrade: MetricUpgradeParameters::default(),
            bundle_adjustment: BundleAdjustmentParameters::default(),
            image_order: ImageOrderParameters::default()
        }
    }
}

impl ReconstructionParameters {
    pub fn from_yaml_str(yaml: &str) -> Result<ReconstructionParameters> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ReconstructionParameters> {
        let content = fs::read_to_string(path)?;
        ReconstructionParameters::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
