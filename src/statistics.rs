//! Goodness-of-fit statistics of a calibration fit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Statistics of a successful fit.
///
/// `n` in the formulas is the number of samples used in the fit (NaN pairs
/// excluded) and `k` the number of parameters. Non-finite values are written
/// to JSON as `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    /// Akaike information criterion, `n ln(SS/n) + 2k`
    #[serde(with = "nullable_f64")]
    pub aic: f64,

    /// Bayesian information criterion, `n ln(SS/n) + k ln(n)`
    #[serde(with = "nullable_f64")]
    pub bic: f64,

    /// Coefficient of determination, `1 - SS_res / SS_tot`; NaN when all
    /// signals are equal
    #[serde(with = "nullable_f64")]
    pub r2: f64,

    /// Root mean square deviation, `sqrt(SS_res / n)`
    #[serde(with = "nullable_f64")]
    pub rmsd: f64,
}

/// JSON has no NaN or infinity: store them as `null`, load `null` as NaN.
mod nullable_f64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl FitStatistics {
    /// Compute the statistics from residuals `f(x) - y` and the observed signals.
    ///
    /// Both slices must only hold the samples that took part in the fit.
    /// `SS_res` is floored at `1e-250 * n` inside the logarithms so an exact
    /// fit still yields finite criteria.
    pub fn from_residuals(residuals: &[f64], observed: &[f64], n_params: usize) -> Self {
        let n = residuals.len() as f64;
        let k = n_params as f64;

        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let mean = observed.iter().sum::<f64>() / n;
        let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();

        let chi = ss_res.max(1e-250 * n);
        let neg2_log_likelihood = n * (chi / n).ln();

        Self {
            aic: neg2_log_likelihood + 2.0 * k,
            bic: neg2_log_likelihood + k * n.ln(),
            r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN },
            rmsd: (ss_res / n).sqrt(),
        }
    }
}
