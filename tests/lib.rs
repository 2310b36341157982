//! Main test file for calib-rs
//!
//! This file organizes and includes all test modules for the library.

// Signal law parsing and evaluation
mod equation;

// Parameter system tests
mod parameters;

// Optimizer and fitting engine
mod fitting;

// Calibration sessions as a whole
mod calibration;

/// Test helpers - common utilities for tests
pub mod test_helpers {
    use ndarray::Array1;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    /// Check if two arrays are approximately equal; NaN equals NaN
    pub fn array_approx_eq(a: &Array1<f64>, b: &Array1<f64>, tol: f64) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b.iter())
                .all(|(x, y)| (x.is_nan() && y.is_nan()) || (x - y).abs() < tol)
    }

    /// Signals of `law` at `x` with Gaussian noise of standard deviation `sigma`.
    /// The seed makes the data reproducible.
    pub fn noisy_signals<F>(law: F, x: &Array1<f64>, sigma: f64, seed: u64) -> Array1<f64>
    where
        F: Fn(f64) -> f64,
    {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).unwrap();
        x.mapv(|xi| law(xi) + noise.sample(&mut rng))
    }
}
