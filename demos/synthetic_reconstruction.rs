use color_eyre::eyre::Result;

use std::env;
use vision_sfm::Float;
use vision_sfm::sfm::{
    bundle_adjustment::reprojection_rms,
    image_order::select_efficient_image_order,
    incremental::{reconstruct_component, Intrinsics},
    runtime_parameters::ReconstructionParameters,
    synthetic::{generate_matches, n_view_dataset, NViewDataSetConfig}
};

fn main() -> Result<()> {
    color_eyre::install()?;

    let parameters = match env::args().nth(1) {
        Some(path) => ReconstructionParameters::load(path)?,
        None => ReconstructionParameters::default()
    };

    let n_views = 8;
    let n_points = 200;
    let n_outliers = 30;
    let config = NViewDataSetConfig { pixel_noise: 0.5, ..Default::default() };
    let data = n_view_dataset(n_views, n_points, &config);
    let matches = generate_matches(&data, n_outliers, config.seed);
    let intrinsics = (0..n_views).map(|i| (i, data.intrinsics[i])).collect::<Intrinsics>();

    let components = select_efficient_image_order(&matches, &parameters);
    println!("{} components", components.len());

    for order in components.iter() {
        println!("image order: {:?}", order);
        let reconstruction = reconstruct_component(&matches, order, Some(&intrinsics), &parameters)?;

        let reference = order[0];
        let reference_rotation = data.rotations[reference];
        for (id, camera) in reconstruction.cameras().iter() {
            let pinhole = match camera.as_pinhole() {
                Some(c) => c,
                None => continue
            };
            let estimated = match reconstruction.camera(reference).and_then(|c| c.as_pinhole()) {
                Some(r) => pinhole.rotation()*r.rotation().transpose(),
                None => continue
            };
            let expected = data.rotations[id.image()]*reference_rotation.transpose();
            let error: Float = (estimated - expected).norm();
            println!("camera {}: relative rotation error {:e}", id.image(), error);
        }

        println!("cameras: {}, points: {}, rms: {}",
            reconstruction.camera_count(),
            reconstruction.structure_count(),
            reprojection_rms(reconstruction.matches(), &reconstruction));
    }

    Ok(())
}
