//! Ordered collection of parameters
//!
//! The fitting engine consumes parameters positionally, so the set keeps
//! insertion order and rejects duplicate symbols.

use crate::error::{CalibError, Result};
use crate::parameters::parameter::Parameter;
use serde::{Deserialize, Serialize};

/// Ordered set of [`Parameter`]s with unique symbols
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unbounded parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use calib_rs::parameters::ParameterSet;
    ///
    /// let mut params = ParameterSet::new();
    /// params.add("a", 1.0).unwrap();
    /// params.add_with_bounds("b", 0.5, 0.0, 1.0).unwrap();
    /// assert!(params.add("a", 2.0).is_err());
    /// assert_eq!(params.symbols(), vec!["a", "b"]);
    /// ```
    pub fn add(&mut self, symbol: &str, init_value: f64) -> Result<&Parameter> {
        self.push(Parameter::new(symbol, init_value))
    }

    /// Add a bounded parameter; the initial value is clamped into the bounds.
    pub fn add_with_bounds(&mut self, symbol: &str, init_value: f64, min: f64, max: f64) -> Result<&Parameter> {
        let param = Parameter::with_bounds(symbol, init_value, min, max)?;
        self.push(param)
    }

    /// Append a prebuilt parameter
    pub fn push(&mut self, param: Parameter) -> Result<&Parameter> {
        if self.contains(&param.symbol) {
            return Err(CalibError::DuplicateParameter(param.symbol));
        }
        self.params.push(param);
        let last = self.params.len() - 1;
        Ok(&self.params[last])
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.params.iter().any(|p| p.symbol == symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.symbol == symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.symbol == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.symbol.as_str()).collect()
    }

    pub fn init_values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.init_value()).collect()
    }

    /// Fitted values in order, `None` if any parameter is unfitted
    pub fn values(&self) -> Option<Vec<f64>> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Clear all fitted values and standard errors
    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
    }

    /// Write fit results back, positionally.
    pub(crate) fn commit(&mut self, values: &[f64], stderrs: Option<&[f64]>) {
        for (i, param) in self.params.iter_mut().enumerate() {
            let stderr = stderrs.map(|s| s[i]);
            param.commit(values[i], stderr);
        }
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
