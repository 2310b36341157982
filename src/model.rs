//! Calibration models.
//!
//! A [`CalibrationModel`] is a named signal law together with its parameters
//! and, once fitted, the range of the reference data and the fit statistics.
//! The law is compiled once at construction and recompiled when a model is
//! deserialized.

use crate::equation::CompiledEquation;
use crate::error::{CalibError, Result};
use crate::inversion::{self, InversionOptions};
use crate::parameters::{Parameter, ParameterSet};
use crate::statistics::FitStatistics;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Default initial guess of a parameter discovered in a signal law.
pub const DEFAULT_INIT_VALUE: f64 = 1.0;

/// Concentration and signal range covered by the reference data of the last fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub conc_lower: f64,
    pub conc_upper: f64,
    pub signal_lower: f64,
    pub signal_upper: f64,
}

impl CalibrationRange {
    /// Range of the data, NaN entries ignored.
    pub fn from_data(concentrations: &[f64], signals: &[f64]) -> Self {
        let (conc_lower, conc_upper) = nan_min_max(concentrations);
        let (signal_lower, signal_upper) = nan_min_max(signals);
        Self {
            conc_lower,
            conc_upper,
            signal_lower,
            signal_upper,
        }
    }

    pub fn conc_width(&self) -> f64 {
        self.conc_upper - self.conc_lower
    }

    pub fn contains_concentration(&self, concentration: f64) -> bool {
        concentration >= self.conc_lower && concentration <= self.conc_upper
    }
}

// f64::min/max return the non-NaN operand, so NaN entries drop out
fn nan_min_max(values: &[f64]) -> (f64, f64) {
    let lower = values.iter().copied().fold(f64::NAN, f64::min);
    let upper = values.iter().copied().fold(f64::NAN, f64::max);
    (lower, upper)
}

/// A named signal law with its parameters and fit results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModelRecord", into = "ModelRecord")]
pub struct CalibrationModel {
    name: String,
    signal_law: String,
    parameters: ParameterSet,
    was_fitted: bool,
    calibration_range: Option<CalibrationRange>,
    statistics: Option<FitStatistics>,
    equation: CompiledEquation,
}

impl CalibrationModel {
    /// Create a model whose parameters are all symbols of the law except the
    /// independent one, in sorted order, unbounded, starting at
    /// [`DEFAULT_INIT_VALUE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use calib_rs::model::CalibrationModel;
    ///
    /// let model = CalibrationModel::new("linear", "a * c + b", "c").unwrap();
    /// assert_eq!(model.parameters().symbols(), vec!["a", "b"]);
    /// assert!(!model.was_fitted());
    ///
    /// // the law must contain the independent symbol
    /// assert!(CalibrationModel::new("bad", "a * x", "c").is_err());
    /// ```
    pub fn new(name: &str, signal_law: &str, independent: &str) -> Result<Self> {
        let equation = CompiledEquation::with_independent(signal_law, independent)?;

        let mut parameters = ParameterSet::new();
        for symbol in equation.parameter_symbols() {
            parameters.add(symbol, DEFAULT_INIT_VALUE)?;
        }

        Ok(Self::assemble(name, equation, parameters))
    }

    /// Create a model from declared parameters. The independent symbol is the
    /// one symbol of the law that is not a declared parameter.
    pub fn from_parameters(name: &str, signal_law: &str, parameters: ParameterSet) -> Result<Self> {
        let equation = CompiledEquation::compile(signal_law, &parameters.symbols())?;
        let mut parameters = parameters;
        parameters.reset();
        Ok(Self::assemble(name, equation, parameters))
    }

    fn assemble(name: &str, equation: CompiledEquation, parameters: ParameterSet) -> Self {
        Self {
            name: name.to_string(),
            signal_law: equation.expression().to_string(),
            parameters,
            was_fitted: false,
            calibration_range: None,
            statistics: None,
            equation,
        }
    }

    /// Set the initial guess and bounds of one parameter.
    ///
    /// The initial value is clamped into the bounds; fitted state is untouched.
    pub fn with_parameter(mut self, symbol: &str, init_value: f64, lower: f64, upper: f64) -> Result<Self> {
        let param = self
            .parameters
            .get_mut(symbol)
            .ok_or_else(|| CalibError::ParameterNotFound(symbol.to_string()))?;
        param.set_bounds(lower, upper)?;
        param.set_init_value(init_value);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signal_law(&self) -> &str {
        &self.signal_law
    }

    pub fn independent_symbol(&self) -> &str {
        self.equation.independent_symbol()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameter(&self, symbol: &str) -> Option<&Parameter> {
        self.parameters.get(symbol)
    }

    pub fn was_fitted(&self) -> bool {
        self.was_fitted
    }

    pub fn calibration_range(&self) -> Option<&CalibrationRange> {
        self.calibration_range.as_ref()
    }

    pub fn statistics(&self) -> Option<&FitStatistics> {
        self.statistics.as_ref()
    }

    pub fn equation(&self) -> &CompiledEquation {
        &self.equation
    }

    /// Fitted parameter values in parameter order.
    pub fn fitted_values(&self) -> Result<Vec<f64>> {
        if !self.was_fitted {
            return Err(CalibError::UnfittedModel(self.name.clone()));
        }
        self.parameters
            .values()
            .ok_or_else(|| CalibError::UnfittedModel(self.name.clone()))
    }

    /// Signal predicted by the fitted law for each concentration.
    pub fn evaluate(&self, concentrations: &Array1<f64>) -> Result<Array1<f64>> {
        let values = self.fitted_values()?;
        Ok(self.equation.eval_array(concentrations, &values))
    }

    /// Concentrations for the given signals; see [`inversion::invert`].
    pub fn invert(&self, signals: &Array1<f64>, extrapolate: bool) -> Result<Array1<f64>> {
        inversion::invert(self, signals, extrapolate)
    }

    /// Like [`invert`](Self::invert) with explicit solver options.
    pub fn invert_with(&self, signals: &Array1<f64>, extrapolate: bool, options: &InversionOptions) -> Result<Array1<f64>> {
        inversion::invert_with(self, signals, extrapolate, options)
    }

    /// Forget all fit results.
    pub fn reset(&mut self) {
        self.parameters.reset();
        self.was_fitted = false;
        self.calibration_range = None;
        self.statistics = None;
    }

    pub(crate) fn commit_fit(
        &mut self,
        values: &[f64],
        stderrs: Option<&[f64]>,
        range: CalibrationRange,
        statistics: FitStatistics,
    ) {
        self.parameters.commit(values, stderrs);
        self.calibration_range = Some(range);
        self.statistics = Some(statistics);
        self.was_fitted = true;
    }
}

/// Serialized form of a [`CalibrationModel`]; the compiled equation is rebuilt
/// from `signal_law` on load.
#[derive(Serialize, Deserialize)]
struct ModelRecord {
    name: String,
    signal_law: String,
    independent_symbol: String,
    parameters: ParameterSet,
    #[serde(default)]
    was_fitted: bool,
    #[serde(default)]
    calibration_range: Option<CalibrationRange>,
    #[serde(default)]
    statistics: Option<FitStatistics>,
}

impl TryFrom<ModelRecord> for CalibrationModel {
    type Error = CalibError;

    fn try_from(record: ModelRecord) -> Result<Self> {
        let equation = CompiledEquation::compile(&record.signal_law, &record.parameters.symbols())?;
        if equation.independent_symbol() != record.independent_symbol {
            return Err(CalibError::EquationParse(format!(
                "Law '{}' has independent symbol '{}', record says '{}'",
                record.signal_law,
                equation.independent_symbol(),
                record.independent_symbol
            )));
        }

        let complete = record.parameters.values().is_some()
            && record.calibration_range.is_some()
            && record.statistics.is_some();
        if record.was_fitted && !complete {
            return Err(CalibError::InvalidInput(format!(
                "Model '{}' is marked as fitted but lacks fit results",
                record.name
            )));
        }

        Ok(Self {
            name: record.name,
            signal_law: record.signal_law,
            parameters: record.parameters,
            was_fitted: record.was_fitted,
            calibration_range: record.calibration_range,
            statistics: record.statistics,
            equation,
        })
    }
}

impl From<CalibrationModel> for ModelRecord {
    fn from(model: CalibrationModel) -> Self {
        Self {
            independent_symbol: model.equation.independent_symbol().to_string(),
            name: model.name,
            signal_law: model.signal_law,
            parameters: model.parameters,
            was_fitted: model.was_fitted,
            calibration_range: model.calibration_range,
            statistics: model.statistics,
        }
    }
}
