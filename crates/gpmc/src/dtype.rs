//! Numeric types handling.
//!
//! Parameters are standardized onto exactly two canonical precisions, one for
//! floating point values and one for integer values. Those precisions are held
//! by [`NumericSettings`] which is passed explicitly wherever a parameter is built.

use crate::errors::{GpError, Result};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native numeric types a value may be stored with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum NumType {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 16-bit floating point
    F16,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// Complex made of two 32-bit floats
    Complex64,
    /// Complex made of two 64-bit floats
    Complex128,
}

impl NumType {
    /// Numeric type of the Rust primitive `T`
    pub fn of<T: HasNumType>() -> NumType {
        T::NUM_TYPE
    }

    /// Floating point type matching the storage size of `F` (`f32` or `f64`)
    pub fn of_float<F: linfa::Float>() -> NumType {
        if std::mem::size_of::<F>() == 4 {
            NumType::F32
        } else {
            NumType::F64
        }
    }
}

impl fmt::Display for NumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NumType::Bool => "bool",
            NumType::I8 => "int8",
            NumType::I16 => "int16",
            NumType::I32 => "int32",
            NumType::I64 => "int64",
            NumType::U8 => "uint8",
            NumType::U16 => "uint16",
            NumType::U32 => "uint32",
            NumType::U64 => "uint64",
            NumType::F16 => "float16",
            NumType::F32 => "float32",
            NumType::F64 => "float64",
            NumType::Complex64 => "complex64",
            NumType::Complex128 => "complex128",
        };
        write!(f, "{name}")
    }
}

/// Link between a Rust primitive and its [`NumType`]
pub trait HasNumType {
    /// Numeric type descriptor
    const NUM_TYPE: NumType;
}

macro_rules! declare_num_type {
    ($($t:ty => $v:ident),*) => {
        $(
            impl HasNumType for $t {
                const NUM_TYPE: NumType = NumType::$v;
            }
        )*
    };
}

declare_num_type!(
    bool => Bool, i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, f32 => F32, f64 => F64
);

/// Data type handle as exposed by array storage, wrapping a native [`NumType`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct TensorDType(NumType);

impl TensorDType {
    /// Wrap a native type
    pub fn new(num_type: NumType) -> Self {
        TensorDType(num_type)
    }

    /// Underlying native type
    pub fn as_native(&self) -> NumType {
        self.0
    }
}

impl From<TensorDType> for NumType {
    fn from(dtype: TensorDType) -> NumType {
        dtype.as_native()
    }
}

impl fmt::Display for TensorDType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<dtype: '{}'>", self.0)
    }
}

/// Canonical precisions used for every numeric parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NumericSettings {
    /// Type floating point values are mapped to
    pub float_type: NumType,
    /// Type integer values are mapped to
    pub int_type: NumType,
}

impl Default for NumericSettings {
    fn default() -> Self {
        NumericSettings {
            float_type: NumType::F64,
            int_type: NumType::I32,
        }
    }
}

impl NumericSettings {
    /// Settings whose float precision is the storage precision of `F`
    pub fn for_float<F: linfa::Float>() -> Self {
        NumericSettings {
            float_type: NumType::of_float::<F>(),
            ..Default::default()
        }
    }
}

/// Map `num_type` to one of the two canonical types of `settings`.
///
/// 32 and 64-bit floats are mapped to `settings.float_type`, 16, 32 and 64-bit
/// signed integers to `settings.int_type`. Any other type is rejected.
pub fn normalize_num_type(
    num_type: impl Into<NumType>,
    settings: &NumericSettings,
) -> Result<NumType> {
    let num_type = num_type.into();
    match num_type {
        NumType::F32 | NumType::F64 => Ok(settings.float_type),
        NumType::I16 | NumType::I32 | NumType::I64 => Ok(settings.int_type),
        other => Err(GpError::UnsupportedDType(other.to_string())),
    }
}
