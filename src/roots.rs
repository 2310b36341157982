//! Scalar root finding.
//!
//! Brent's bracketed method, and a scan that locates the smallest root of a
//! function on an interval by looking for the first sign change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors of the scalar root finders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RootError {
    #[error("Invalid interval [{a}, {b}]")]
    InvalidInterval { a: f64, b: f64 },

    #[error("f(a) = {fa} and f(b) = {fb} do not bracket a root")]
    SameSignBracket { fa: f64, fb: f64 },

    #[error("No convergence after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    #[error("No root in [{a}, {b}]")]
    NoRoot { a: f64, b: f64 },
}

/// Options for scalar root finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOptions {
    /// Absolute tolerance on the root
    pub xtol: f64,
    /// Relative tolerance on the root
    pub rtol: f64,
    /// `|f(x)| <= ftol` counts as a root without refinement
    pub ftol: f64,
    /// Maximum number of Brent iterations per root
    pub max_iterations: usize,
    /// Number of equal sub-intervals scanned for the first sign change
    pub scan_intervals: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            ftol: 1e-12,
            max_iterations: 100,
            scan_intervals: 64,
        }
    }
}

impl RootOptions {
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_scan_intervals(mut self, scan_intervals: usize) -> Self {
        self.scan_intervals = scan_intervals;
        self
    }
}

/// Result from a root finding method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootResult {
    /// The root found
    pub root: f64,
    /// Function value at root
    pub function_value: f64,
    /// Number of iterations used
    pub iterations: usize,
}

fn opposite_signs(fa: f64, fb: f64) -> bool {
    (fa < 0.0 && fb > 0.0) || (fa > 0.0 && fb < 0.0)
}

/// Brent's method on the bracket `[a, b]`.
///
/// Combines inverse quadratic interpolation, the secant step and bisection;
/// converges whenever `f(a)` and `f(b)` differ in sign.
///
/// # Errors
/// * `InvalidInterval` if `a >= b` or an endpoint is not finite
/// * `SameSignBracket` if `f(a)` and `f(b)` do not bracket a root
/// * `DidNotConverge` if `max_iterations` is exceeded
pub fn brentq<F>(f: F, a: f64, b: f64, options: &RootOptions) -> Result<RootResult, RootError>
where
    F: Fn(f64) -> f64,
{
    if !(a < b) || !a.is_finite() || !b.is_finite() {
        return Err(RootError::InvalidInterval { a, b });
    }

    let mut xpre = a;
    let mut xcur = b;
    let mut fpre = f(a);
    let mut fcur = f(b);

    if fpre == 0.0 {
        return Ok(RootResult {
            root: xpre,
            function_value: fpre,
            iterations: 0,
        });
    }
    if fcur == 0.0 {
        return Ok(RootResult {
            root: xcur,
            function_value: fcur,
            iterations: 0,
        });
    }
    if !opposite_signs(fpre, fcur) {
        return Err(RootError::SameSignBracket { fa: fpre, fb: fcur });
    }

    let mut xblk = 0.0;
    let mut fblk = 0.0;
    let mut spre = 0.0;
    let mut scur = 0.0;

    for iteration in 1..=options.max_iterations {
        if opposite_signs(fpre, fcur) {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        // keep the best estimate in xcur
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;
            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (options.xtol + options.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(RootResult {
                root: xcur,
                function_value: fcur,
                iterations: iteration,
            });
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic interpolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };

            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = f(xcur);
    }

    Err(RootError::DidNotConverge {
        iterations: options.max_iterations,
    })
}

/// Smallest root of `f` on `[a, b]`.
///
/// The interval is cut into `scan_intervals` equal pieces, walked from `a`.
/// The first grid point with `|f| <= ftol` is returned as is; otherwise the
/// first piece whose ends differ in sign is refined with [`brentq`]. Roots
/// where `f` touches zero without changing sign are only found on a grid
/// point. Grid points where `f` is NaN never form a bracket.
///
/// # Errors
/// * `InvalidInterval` if `a > b` or an endpoint is not finite
/// * `NoRoot` if no grid point or sign change is found
pub fn find_smallest_root<F>(f: F, a: f64, b: f64, options: &RootOptions) -> Result<RootResult, RootError>
where
    F: Fn(f64) -> f64,
{
    if a > b || !a.is_finite() || !b.is_finite() {
        return Err(RootError::InvalidInterval { a, b });
    }

    let is_root = |fx: f64| fx.abs() <= options.ftol;

    let mut prev_x = a;
    let mut prev_f = f(a);
    if is_root(prev_f) {
        return Ok(RootResult {
            root: a,
            function_value: prev_f,
            iterations: 0,
        });
    }

    let pieces = options.scan_intervals.max(1);
    let step = (b - a) / pieces as f64;
    if step == 0.0 {
        return Err(RootError::NoRoot { a, b });
    }

    for i in 1..=pieces {
        let x = if i == pieces { b } else { a + step * i as f64 };
        let fx = f(x);

        if opposite_signs(prev_f, fx) {
            return brentq(&f, prev_x, x, options);
        }
        if is_root(fx) {
            return Ok(RootResult {
                root: x,
                function_value: fx,
                iterations: 0,
            });
        }

        prev_x = x;
        prev_f = fx;
    }

    Err(RootError::NoRoot { a, b })
}
