//! Model selection for one analyte.
//!
//! A [`Calibrator`] holds the reference samples of one analyte, an optional
//! signal cutoff and a list of candidate models. It fits all candidates, ranks
//! them by AIC and converts new signals with the model the caller picks.
//!
//! ```rust
//! use calib_rs::calibrator::Calibrator;
//! use ndarray::array;
//!
//! let mut calibrator = Calibrator::from_arrays(
//!     "s0",
//!     &[0.0, 1.0, 2.0, 3.0, 4.0],
//!     &[0.0, 0.21, 0.39, 0.62, 0.80],
//!     "mmol / l",
//! )
//! .unwrap()
//! .with_default_models()
//! .unwrap();
//!
//! let report = calibrator.fit_all();
//! assert!(report.is_complete());
//! calibrator.rank();
//!
//! let best = calibrator.best_model().unwrap().name().to_string();
//! let conc = calibrator.calculate_concentrations(&best, &array![0.5], false).unwrap();
//! assert!((conc[0] - 2.5).abs() < 0.1);
//! ```

use crate::error::{CalibError, Result};
use crate::fit::Fitter;
use crate::inversion::{self, InversionOptions};
use crate::lm::LmConfig;
use crate::model::CalibrationModel;
use crate::models;
use crate::sample::{Sample, Standard};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Progress of a calibration session. Every step may be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibratorState {
    Created,
    CutoffApplied,
    Fitted,
    Ranked,
}

/// Configuration of a calibration session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratorConfig {
    /// Optimizer settings used for every model
    pub lm: LmConfig,
    /// Root finding settings for concentration calculation
    pub inversion: InversionOptions,
    /// Fit the candidate models in parallel
    pub parallel: bool,
}

impl CalibratorConfig {
    /// Parse a configuration; missing fields take their defaults.
    ///
    /// ```
    /// use calib_rs::calibrator::CalibratorConfig;
    ///
    /// let config = CalibratorConfig::from_json(r#"{"parallel": true, "lm": {"max_iterations": 50}}"#).unwrap();
    /// assert!(config.parallel);
    /// assert_eq!(config.lm.max_iterations, 50);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_lm_config(mut self, lm: LmConfig) -> Self {
        self.lm = lm;
        self
    }
}

/// Outcome of [`Calibrator::fit_all`].
#[derive(Debug, Default)]
pub struct FitReport {
    /// Names of the models fitted in this run
    pub fitted: Vec<String>,
    /// Models whose fit failed, with the reason
    pub failed: Vec<(String, CalibError)>,
}

impl FitReport {
    /// True when every model was fitted
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Calibration session for one analyte.
#[derive(Debug, Clone)]
pub struct Calibrator {
    analyte_id: String,
    analyte_name: Option<String>,
    samples: Vec<Sample>,
    cutoff: Option<f64>,
    models: Vec<CalibrationModel>,
    config: CalibratorConfig,
    state: CalibratorState,
}

impl Calibrator {
    /// Create a session. `analyte_id` is the symbol the signal laws use for
    /// the concentration.
    ///
    /// # Errors
    /// * `InvalidInput` if the samples do not share one concentration unit
    pub fn new(analyte_id: &str, samples: Vec<Sample>) -> Result<Self> {
        if let Some(first) = samples.first() {
            if let Some(other) = samples.iter().find(|s| s.conc_unit != first.conc_unit) {
                return Err(CalibError::InvalidInput(format!(
                    "All samples must have the same concentration unit, found '{}' and '{}'",
                    first.conc_unit, other.conc_unit
                )));
            }
        }

        Ok(Self {
            analyte_id: analyte_id.to_string(),
            analyte_name: None,
            samples,
            cutoff: None,
            models: Vec::new(),
            config: CalibratorConfig::default(),
            state: CalibratorState::Created,
        })
    }

    /// Create a session from parallel concentration and signal lists.
    pub fn from_arrays(analyte_id: &str, concentrations: &[f64], signals: &[f64], conc_unit: &str) -> Result<Self> {
        if concentrations.len() != signals.len() {
            return Err(CalibError::DimensionMismatch(format!(
                "{} concentrations but {} signals",
                concentrations.len(),
                signals.len()
            )));
        }
        let samples = concentrations
            .iter()
            .zip(signals)
            .map(|(&c, &s)| Sample::new(c, conc_unit, s))
            .collect();
        Self::new(analyte_id, samples)
    }

    /// Rebuild a session from a stored [`Standard`]; its model becomes the
    /// only candidate and keeps its fit results.
    pub fn from_standard(standard: Standard, cutoff: Option<f64>) -> Result<Self> {
        let mut calibrator = Self::new(&standard.analyte_id, standard.samples)?;
        calibrator.analyte_name = standard.analyte_name;
        calibrator.push_model(standard.result)?;
        calibrator.cutoff = cutoff;
        calibrator.apply_cutoff();
        Ok(calibrator)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.analyte_name = Some(name.to_string());
        self
    }

    /// Signals at or above `cutoff` are dropped by [`apply_cutoff`](Self::apply_cutoff).
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_config(mut self, config: CalibratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_models(mut self, models: Vec<CalibrationModel>) -> Result<Self> {
        for model in models {
            self.push_model(model)?;
        }
        Ok(self)
    }

    /// Add the built-in linear, quadratic and cubic laws.
    pub fn with_default_models(self) -> Result<Self> {
        let defaults = models::default_models(&self.analyte_id)?;
        self.with_models(defaults)
    }

    /// Add a model whose parameters are all symbols of `signal_law` other than
    /// the analyte, each starting at `init_value` within `[lower, upper]`.
    ///
    /// # Errors
    /// * `EquationParse` if the law does not parse or lacks the analyte symbol
    /// * `DuplicateModel` if the name is taken
    /// * `InvalidParameter` if `lower > upper`
    pub fn add_model(
        &mut self,
        name: &str,
        signal_law: &str,
        init_value: f64,
        lower: f64,
        upper: f64,
    ) -> Result<&CalibrationModel> {
        let mut model = CalibrationModel::new(name, signal_law, &self.analyte_id)?;
        let symbols: Vec<String> = model.parameters().symbols().into_iter().map(String::from).collect();
        for symbol in &symbols {
            model = model.with_parameter(symbol, init_value, lower, upper)?;
        }
        self.push_model(model)
    }

    /// Add a prebuilt model.
    ///
    /// # Errors
    /// * `DuplicateModel` if the name is taken
    /// * `InvalidInput` if the model's independent symbol is not the analyte
    pub fn push_model(&mut self, model: CalibrationModel) -> Result<&CalibrationModel> {
        if self.models.iter().any(|m| m.name() == model.name()) {
            return Err(CalibError::DuplicateModel(model.name().to_string()));
        }
        if model.independent_symbol() != self.analyte_id {
            return Err(CalibError::InvalidInput(format!(
                "Model '{}' is a law of '{}', not of analyte '{}'",
                model.name(),
                model.independent_symbol(),
                self.analyte_id
            )));
        }
        self.models.push(model);
        let last = self.models.len() - 1;
        Ok(&self.models[last])
    }

    /// Drop samples whose signal is at or above the cutoff, keeping order.
    /// No-op without a cutoff; applying it again changes nothing.
    pub fn apply_cutoff(&mut self) {
        if let Some(cutoff) = self.cutoff {
            let before = self.samples.len();
            // NaN signals are kept
            self.samples.retain(|s| !(s.signal >= cutoff));
            let removed = before - self.samples.len();
            if removed > 0 {
                log::debug!("Cutoff {} removed {} of {} samples", cutoff, removed, before);
            }
        }
        if self.state == CalibratorState::Created {
            self.state = CalibratorState::CutoffApplied;
        }
    }

    /// Fit every model to the samples left after the cutoff.
    ///
    /// A failing model does not stop the others; it is listed in the report
    /// and reset to unfitted, so [`rank`](Self::rank) puts it last.
    pub fn fit_all(&mut self) -> FitReport {
        self.apply_cutoff();

        let x = self.concentrations();
        let y = self.signals();
        let fitter = Fitter::new(self.config.lm.clone());

        // results of an earlier fit belong to other samples
        let fit_one = |model: &mut CalibrationModel| {
            let outcome = fitter.fit(model, &x, &y).map(|_| ());
            if outcome.is_err() {
                model.reset();
            }
            (model.name().to_string(), outcome)
        };

        let outcomes: Vec<(String, Result<()>)> = if self.config.parallel {
            self.models.par_iter_mut().map(&fit_one).collect()
        } else {
            self.models.iter_mut().map(&fit_one).collect()
        };

        let mut report = FitReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => report.fitted.push(name),
                Err(err) => {
                    log::warn!("Model '{}' could not be fitted: {}", name, err);
                    report.failed.push((name, err));
                }
            }
        }

        log::info!(
            "Fitted {} of {} models for '{}'",
            report.fitted.len(),
            self.models.len(),
            self.analyte_id
        );
        self.state = CalibratorState::Fitted;
        report
    }

    /// Order the models by AIC, best first; unfitted models go last. The sort
    /// is stable.
    pub fn rank(&mut self) {
        self.models.sort_by(|a, b| compare_aic(a, b));
        self.state = CalibratorState::Ranked;
    }

    /// Fitted model with the lowest AIC.
    pub fn best_model(&self) -> Option<&CalibrationModel> {
        self.models
            .iter()
            .filter(|m| m.was_fitted())
            .min_by(|a, b| compare_aic(a, b))
    }

    pub fn get_model(&self, name: &str) -> Result<&CalibrationModel> {
        self.models
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| CalibError::ModelNotFound(name.to_string()))
    }

    pub fn get_model_mut(&mut self, name: &str) -> Result<&mut CalibrationModel> {
        self.models
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| CalibError::ModelNotFound(name.to_string()))
    }

    /// Concentrations for `signals` from the named model.
    ///
    /// # Errors
    /// * `ModelNotFound` if there is no such model
    /// * `UnfittedModel` if it has not been fitted
    pub fn calculate_concentrations(&self, name: &str, signals: &Array1<f64>, extrapolate: bool) -> Result<Array1<f64>> {
        let model = self.get_model(name)?;
        inversion::invert_with(model, signals, extrapolate, &self.config.inversion)
    }

    /// Record of the current samples and the named, fitted model.
    pub fn create_standard(&self, name: &str) -> Result<Standard> {
        let model = self.get_model(name)?;
        if !model.was_fitted() {
            return Err(CalibError::UnfittedModel(name.to_string()));
        }
        Ok(Standard {
            analyte_id: self.analyte_id.clone(),
            analyte_name: self.analyte_name.clone(),
            samples: self.samples.clone(),
            result: model.clone(),
        })
    }

    pub fn analyte_id(&self) -> &str {
        &self.analyte_id
    }

    pub fn analyte_name(&self) -> Option<&str> {
        self.analyte_name.as_deref()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn concentrations(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.concentration).collect()
    }

    pub fn signals(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.signal).collect()
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    pub fn models(&self) -> &[CalibrationModel] {
        &self.models
    }

    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }

    pub fn state(&self) -> CalibratorState {
        self.state
    }
}

fn compare_aic(a: &CalibrationModel, b: &CalibrationModel) -> Ordering {
    let aic = |m: &CalibrationModel| m.statistics().filter(|_| m.was_fitted()).map(|s| s.aic);
    match (aic(a), aic(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn format_stat(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        _ => "n.a.".to_string(),
    }
}

/// Model overview: name, AIC, R², RMSD, law and relative parameter standard errors.
impl fmt::Display for Calibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Overview ({})", self.analyte_id)?;
        writeln!(
            f,
            "{:<12} {:>10} {:>8} {:>10}  {:<32} Relative Parameter Standard Errors",
            "Model Name", "AIC", "R²", "RMSD", "Equation"
        )?;

        for model in &self.models {
            let stats = model.statistics().filter(|_| model.was_fitted());
            let errors: Vec<String> = model
                .parameters()
                .iter()
                .map(|p| match p.relative_stderr() {
                    Some(rel) => format!("{}: {:.1}%", p.symbol, rel * 100.0),
                    None => format!("{}: n.a.", p.symbol),
                })
                .collect();

            writeln!(
                f,
                "{:<12} {:>10} {:>8} {:>10}  {:<32} {}",
                model.name(),
                format_stat(stats.map(|s| s.aic), 0),
                format_stat(stats.map(|s| s.r2), 4),
                format_stat(stats.map(|s| s.rmsd), 4),
                model.signal_law(),
                errors.join(", ")
            )?;
        }
        Ok(())
    }
}
