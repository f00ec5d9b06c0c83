pub mod bundle_adjustment;
pub mod epipolar;
pub mod error;
pub mod image_order;
pub mod incremental;
pub mod landmark;
pub mod metric_upgrade;
pub mod pnp;
pub mod reconstruction;
pub mod runtime_parameters;
pub mod synthetic;
pub mod triangulation;

pub use error::{ReconstructionError, Result};
