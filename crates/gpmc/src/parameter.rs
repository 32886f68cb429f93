use crate::dtype::{normalize_num_type, NumType, NumericSettings};
use crate::errors::{GpError, Result};
use crate::param_value::{is_valid_param_value, ParamValue};
use crate::priors::Prior;
use linfa::Float;
use ndarray::{ArrayBase, ArrayD, ArrayViewD, Data, Dimension};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named numeric parameter with an optional prior.
///
/// The shape is fixed at construction, only values may change afterwards.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Parameter<F: Float> {
    name: String,
    value: ArrayD<F>,
    dtype: NumType,
    prior: Option<Prior<F>>,
}

impl<F: Float> Parameter<F> {
    /// Build a parameter from `value`.
    ///
    /// The value has to be valid (see [`is_valid_param_value`]) and of a numeric
    /// type supported by [`normalize_num_type`].
    pub fn new(
        value: impl Into<ParamValue<F>>,
        name: &str,
        settings: &NumericSettings,
    ) -> Result<Self> {
        let value = value.into();
        if !is_valid_param_value(Some(&value)) {
            return Err(GpError::InvalidValueError(format!(
                "Parameter '{name}' can not be built from {value:?}"
            )));
        }
        let num_type = value.num_type().ok_or_else(|| {
            GpError::InvalidValueError(format!("Parameter '{name}' value is not numeric"))
        })?;
        let dtype = normalize_num_type(num_type, settings)?;
        Ok(Parameter {
            name: name.to_string(),
            value: value.to_array()?,
            dtype,
            prior: None,
        })
    }

    /// Attach a prior
    pub fn with_prior(mut self, prior: Prior<F>) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical numeric type of the parameter.
    ///
    /// This is the normalized type of the value it was built from, the value itself
    /// is stored as `F`.
    pub fn dtype(&self) -> NumType {
        self.dtype
    }

    /// Prior if any
    pub fn prior(&self) -> Option<&Prior<F>> {
        self.prior.as_ref()
    }

    /// Shape of the parameter value
    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// Current value as a view
    pub fn value(&self) -> ArrayViewD<F> {
        self.value.view()
    }

    /// Replace the current value, the shape of `value` has to be the parameter shape
    pub fn assign<D: Dimension>(&mut self, value: &ArrayBase<impl Data<Elem = F>, D>) -> Result<()> {
        if value.shape() != self.value.shape() {
            return Err(GpError::InvalidValueError(format!(
                "Parameter '{}' expects shape {:?}, got {:?}",
                self.name,
                self.value.shape(),
                value.shape()
            )));
        }
        self.value.assign(&value.view().into_dyn());
        Ok(())
    }

    /// Log prior density of the current value, zero without prior
    pub fn log_prior(&self) -> F {
        self.prior
            .map(|p| p.log_density(&self.value))
            .unwrap_or_else(F::zero)
    }
}

impl<F: Float> fmt::Display for Parameter<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: shape={:?}, dtype={}", self.name, self.shape(), self.dtype)?;
        if let Some(prior) = self.prior {
            write!(f, ", prior={prior}")?;
        }
        Ok(())
    }
}
