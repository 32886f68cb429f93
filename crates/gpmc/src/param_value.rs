//! Values a [`Parameter`](crate::Parameter) can be built from.
//!
//! A user-supplied value is one of the closed set of [`ParamValue`] variants,
//! predicates below classify it by pattern matching.

use crate::dtype::NumType;
use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{stack, Array, ArcArray, ArrayD, ArrayView, Axis, Dimension, IxDyn};

/// Scalar numeric value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar<F: Float> {
    /// Floating point value
    Float(F),
    /// Integer value
    Int(i64),
}

impl<F: Float> Scalar<F> {
    /// Value in the floating point storage type
    pub fn value(&self) -> F {
        match self {
            Scalar::Float(v) => *v,
            Scalar::Int(i) => F::cast(*i),
        }
    }
}

/// A candidate parameter value
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue<F: Float> {
    /// Scalar numeric value
    Scalar(Scalar<F>),
    /// Textual value, never a valid parameter value
    Text(String),
    /// Dense owned array
    Array(ArrayD<F>),
    /// Shared handle on an array living in the computation
    Tensor(ArcArray<F, IxDyn>),
    /// Sequence of values
    List(Vec<ParamValue<F>>),
}

impl<F: Float> ParamValue<F> {
    /// Floating point scalar
    pub fn float(v: F) -> Self {
        ParamValue::Scalar(Scalar::Float(v))
    }

    /// Integer scalar
    pub fn int(v: i64) -> Self {
        ParamValue::Scalar(Scalar::Int(v))
    }

    /// List of floating point scalars
    pub fn floats(values: &[F]) -> Self {
        ParamValue::List(values.iter().map(|v| Self::float(*v)).collect())
    }

    /// Numeric type the value is stored with, `None` when not numeric
    pub fn num_type(&self) -> Option<NumType> {
        match self {
            ParamValue::Scalar(Scalar::Float(_)) => Some(NumType::of_float::<F>()),
            ParamValue::Scalar(Scalar::Int(_)) => Some(NumType::I64),
            ParamValue::Array(_) | ParamValue::Tensor(_) => Some(NumType::of_float::<F>()),
            ParamValue::List(values) => values.first().and_then(|v| v.num_type()),
            ParamValue::Text(_) => None,
        }
    }

    /// Dense array holding the value.
    ///
    /// Lists are stacked along a new first axis, their items must share the same shape.
    pub fn to_array(&self) -> Result<ArrayD<F>> {
        match self {
            ParamValue::Scalar(s) => Ok(ArrayD::from_elem(IxDyn(&[]), s.value())),
            ParamValue::Array(a) => Ok(a.to_owned()),
            ParamValue::Tensor(t) => Ok(t.to_owned()),
            ParamValue::List(values) => {
                if values.is_empty() {
                    return Err(GpError::InvalidValueError(
                        "Empty list can not be converted to an array".to_string(),
                    ));
                }
                let items = values
                    .iter()
                    .map(|v| v.to_array())
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<ArrayView<F, IxDyn>> = items.iter().map(|a| a.view()).collect();
                Ok(stack(Axis(0), &views)?)
            }
            ParamValue::Text(s) => Err(GpError::InvalidValueError(format!(
                "Text value \"{s}\" is not numeric"
            ))),
        }
    }
}

impl<F: Float, D: Dimension> From<Array<F, D>> for ParamValue<F> {
    fn from(a: Array<F, D>) -> Self {
        ParamValue::Array(a.into_dyn())
    }
}

impl<F: Float> From<ArcArray<F, IxDyn>> for ParamValue<F> {
    fn from(t: ArcArray<F, IxDyn>) -> Self {
        ParamValue::Tensor(t)
    }
}

impl<F: Float> From<i64> for ParamValue<F> {
    fn from(v: i64) -> Self {
        ParamValue::int(v)
    }
}

impl<F: Float> From<&str> for ParamValue<F> {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl<F: Float> From<Vec<ParamValue<F>>> for ParamValue<F> {
    fn from(values: Vec<ParamValue<F>>) -> Self {
        ParamValue::List(values)
    }
}

/// Whether `value` is a dense array
pub fn is_array<F: Float>(value: &ParamValue<F>) -> bool {
    matches!(value, ParamValue::Array(_))
}

/// Whether `value` is a list
pub fn is_list<F: Float>(value: &ParamValue<F>) -> bool {
    matches!(value, ParamValue::List(_))
}

/// Whether `value` is a handle on a computation array
pub fn is_tensor<F: Float>(value: &ParamValue<F>) -> bool {
    matches!(value, ParamValue::Tensor(_))
}

/// Whether `value` is a scalar number (text is never a number)
pub fn is_number<F: Float>(value: &ParamValue<F>) -> bool {
    matches!(value, ParamValue::Scalar(_))
}

/// Whether `value` can be used to build a parameter.
///
/// A list is valid when non empty and homogeneous: either only scalars or
/// only lists and arrays, the kind being given by its first item.
/// Otherwise the value has to be present and be a number, an array or a tensor.
pub fn is_valid_param_value<F: Float>(value: Option<&ParamValue<F>>) -> bool {
    match value {
        Some(ParamValue::List(values)) => match values.split_first() {
            None => false,
            Some((ParamValue::Scalar(_), rest)) => rest.iter().all(is_number),
            Some((ParamValue::List(_) | ParamValue::Array(_), rest)) => {
                rest.iter().all(|v| is_list(v) || is_array(v))
            }
            Some(_) => false,
        },
        Some(v) => is_number(v) || is_array(v) || is_tensor(v),
        None => false,
    }
}
