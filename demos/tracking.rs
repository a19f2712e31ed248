//! Tracking Simulation Example
//!
//! Runs the 1-D tracking simulation with both covariance update forms and
//! compares the filter against the raw measurements

use kalman_engine::sim::{mean, rms_error, run_simulation, SimConfig};
use kalman_engine::{CovarianceUpdate, FilterParams};
use std::fs::{self, File};
use std::io::Write;

fn main() -> anyhow::Result<()> {
    println!("Running Kalman tracking simulation...\n");

    fs::create_dir_all("out")?;

    let config = SimConfig {
        dt: 0.1,
        jitter: 0.2,
        steps: 1000,
        sigma_position: 0.5,
        sigma_accel: 0.2,
        command_accel: 0.05,
        seed: 42,
    };

    println!("Configuration:");
    println!("  Nominal dt: {} (jitter {:.0}%)", config.dt, config.jitter * 100.0);
    println!("  Total steps: {}", config.steps);
    println!("  Measurement sigma: {}", config.sigma_position);
    println!("  Acceleration sigma: {}", config.sigma_accel);
    println!();

    let simplified = run_simulation(config.clone(), FilterParams::default())?;
    let joseph = run_simulation(
        config.clone(),
        FilterParams::new(CovarianceUpdate::Joseph, 1e-12),
    )?;

    let errors_meas: Vec<f64> = simplified.iter().map(|s| s.err_measurement).collect();
    let errors_simplified: Vec<f64> = simplified.iter().map(|s| s.err_estimate).collect();
    let errors_joseph: Vec<f64> = joseph.iter().map(|s| s.err_estimate).collect();
    let nis: Vec<f64> = simplified.iter().map(|s| s.nis).collect();

    println!("METRICS SUMMARY");
    println!("===============");
    println!("\nRMS Position Errors:");
    println!("  Raw measurement:     {:.6}", rms_error(&errors_meas));
    println!("  Kalman (simplified): {:.6}", rms_error(&errors_simplified));
    println!("  Kalman (Joseph):     {:.6}", rms_error(&errors_joseph));
    println!("\nMean NIS (expected ~1): {:.4}", mean(&nis));

    let csv_path = "out/tracking.csv";
    let mut file = File::create(csv_path)?;

    writeln!(
        file,
        "t,position_true,measurement,position_estimate,velocity_true,velocity_estimate,position_variance,nis"
    )?;

    for step in &simplified {
        writeln!(
            file,
            "{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            step.t,
            step.position_true,
            step.measurement,
            step.position_estimate,
            step.velocity_true,
            step.velocity_estimate,
            step.position_variance,
            step.nis
        )?;
    }

    println!("\nCSV output written to: {}", csv_path);
    println!("Done!");

    Ok(())
}
