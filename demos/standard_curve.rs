//! Example of a complete calibration session.
//!
//! Fits the built-in models and a saturation law to a standard curve of
//! absorbance readings, ranks them, converts new readings and stores the
//! chosen model as a standard.

use calib_rs::calibrator::{Calibrator, CalibratorConfig};
use calib_rs::parameters::ParameterSet;
use calib_rs::{CalibrationModel, Standard};

use ndarray::array;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    println!("Standard curve example");
    println!("======================\n");

    // Absorbance of a dilution series; the detector saturates above 1.6
    let concentrations = [0.0, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0];
    let absorbances = [0.002, 0.151, 0.297, 0.571, 0.826, 1.061, 1.279, 1.62, 1.74];

    let mut calibrator = Calibrator::from_arrays("s0", &concentrations, &absorbances, "mmol / l")?
        .with_name("ABTS")
        .with_cutoff(1.6)
        .with_config(CalibratorConfig::default().with_parallel(true))
        .with_default_models()?;

    // A custom law with a bounded half-saturation constant
    let mut params = ParameterSet::new();
    params.add("a_max", 3.0)?;
    params.add_with_bounds("k", 5.0, 0.0, f64::INFINITY)?;
    calibrator.push_model(CalibrationModel::from_parameters(
        "saturation",
        "a_max * s0 / (k + s0)",
        params,
    )?)?;

    let report = calibrator.fit_all();
    for (name, err) in &report.failed {
        println!("{} was not fitted: {}", name, err);
    }
    calibrator.rank();
    println!("{}", calibrator);

    let best = calibrator
        .best_model()
        .ok_or("no model could be fitted")?
        .name()
        .to_string();
    println!("Best model: {}\n", best);

    let readings = array![0.2, 0.9, 1.3, 1.5];
    let inside = calibrator.calculate_concentrations(&best, &readings, false)?;
    let extrapolated = calibrator.calculate_concentrations(&best, &readings, true)?;
    println!("{:>10} {:>14} {:>14}", "Signal", "Conc.", "Extrapolated");
    for i in 0..readings.len() {
        println!("{:>10.3} {:>14.4} {:>14.4}", readings[i], inside[i], extrapolated[i]);
    }

    let standard = calibrator.create_standard(&best)?;
    let json = standard.to_json()?;
    println!("\nStored standard:\n{}", json);

    let restored = Standard::from_json(&json)?;
    let again = restored.result.invert(&readings, false)?;
    println!("\nRestored model gives {:?}", again.to_vec());

    Ok(())
}
