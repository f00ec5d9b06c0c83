use thiserror::Error;
use crate::Float;
use crate::sfm::reconstruction::CameraId;

#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("need at least {required} correspondences, got {found}")]
    InsufficientCorrespondences { required: usize, found: usize },
    #[error("no admissible geometric solution: {0}")]
    NoGeometricSolution(String),
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),
    #[error("no convergence after {iterations} iterations (rms {rms})")]
    NonConvergence { iterations: usize, rms: Float },
    #[error("camera {camera:?} is not a {expected} camera")]
    CameraModelMismatch { camera: CameraId, expected: &'static str },
    #[error("invalid configuration: {0}")]
    Configuration(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error)
}

pub type Result<T> = std::result::Result<T, ReconstructionError>;
