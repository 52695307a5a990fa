//! Dense, typed, row-major arrays.

use num_traits::NumCast;

use crate::error::{CommonError, CommonResult};
use crate::schema::DataType;

/// Typed storage for array elements.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// Applies the same expression to whichever vector an `ArrayValues` holds.
macro_rules! with_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ArrayValues::Byte($v) => $body,
            ArrayValues::Short($v) => $body,
            ArrayValues::Int($v) => $body,
            ArrayValues::Long($v) => $body,
            ArrayValues::Float($v) => $body,
            ArrayValues::Double($v) => $body,
        }
    };
}

/// NaN becomes `fill`; anything else must be a whole number inside `T`.
fn cast_integer<T: NumCast>(value: f64, fill: T, data_type: DataType) -> CommonResult<T> {
    if value.is_nan() {
        return Ok(fill);
    }
    if value.fract() != 0.0 {
        return Err(CommonError::Unrepresentable { value, data_type });
    }
    T::from(value).ok_or(CommonError::Unrepresentable { value, data_type })
}

fn cast_all<T: NumCast + Copy>(
    values: &[f64],
    fill: T,
    data_type: DataType,
) -> CommonResult<Vec<T>> {
    values
        .iter()
        .map(|v| cast_integer(*v, fill, data_type))
        .collect()
}

impl ArrayValues {
    pub fn data_type(&self) -> DataType {
        match self {
            ArrayValues::Byte(_) => DataType::Byte,
            ArrayValues::Short(_) => DataType::Short,
            ArrayValues::Int(_) => DataType::Int,
            ArrayValues::Long(_) => DataType::Long,
            ArrayValues::Float(_) => DataType::Float,
            ArrayValues::Double(_) => DataType::Double,
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `len` copies of the default fill value for `data_type`.
    ///
    /// Floating types fill with NaN; integer types use the NetCDF default
    /// fill values.
    pub fn filled(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Byte => ArrayValues::Byte(vec![-127; len]),
            DataType::Short => ArrayValues::Short(vec![-32767; len]),
            DataType::Int => ArrayValues::Int(vec![-2147483647; len]),
            DataType::Long => ArrayValues::Long(vec![-9223372036854775806; len]),
            DataType::Float => ArrayValues::Float(vec![f32::NAN; len]),
            DataType::Double => ArrayValues::Double(vec![f64::NAN; len]),
        }
    }

    /// Convert `f64` values into storage for `data_type`.
    ///
    /// NaN is the missing value and becomes the type's fill value. Finite
    /// values that the type cannot hold exactly (out of range, or
    /// fractional for integer types) are rejected.
    pub fn from_f64(data_type: DataType, values: &[f64]) -> CommonResult<Self> {
        Ok(match data_type {
            DataType::Byte => ArrayValues::Byte(cast_all(values, -127i8, data_type)?),
            DataType::Short => ArrayValues::Short(cast_all(values, -32767i16, data_type)?),
            DataType::Int => ArrayValues::Int(cast_all(values, -2147483647i32, data_type)?),
            DataType::Long => {
                ArrayValues::Long(cast_all(values, -9223372036854775806i64, data_type)?)
            }
            DataType::Float => {
                if let Some(value) = values
                    .iter()
                    .find(|v| v.is_finite() && v.abs() > f32::MAX as f64)
                {
                    return Err(CommonError::Unrepresentable {
                        value: *value,
                        data_type,
                    });
                }
                ArrayValues::Float(values.iter().map(|v| *v as f32).collect())
            }
            DataType::Double => ArrayValues::Double(values.to_vec()),
        })
    }

    /// Every element widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_values!(self, v => v.iter().map(|x| *x as f64).collect())
    }

    /// Copy of the elements in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> ArrayValues {
        match self {
            ArrayValues::Byte(v) => ArrayValues::Byte(v[start..end].to_vec()),
            ArrayValues::Short(v) => ArrayValues::Short(v[start..end].to_vec()),
            ArrayValues::Int(v) => ArrayValues::Int(v[start..end].to_vec()),
            ArrayValues::Long(v) => ArrayValues::Long(v[start..end].to_vec()),
            ArrayValues::Float(v) => ArrayValues::Float(v[start..end].to_vec()),
            ArrayValues::Double(v) => ArrayValues::Double(v[start..end].to_vec()),
        }
    }

    /// Copy element `src_index` of `src` into element `dst_index` of `self`.
    ///
    /// Both sides must hold the same data type.
    pub fn copy_element(
        &mut self,
        dst_index: usize,
        src: &ArrayValues,
        src_index: usize,
    ) -> CommonResult<()> {
        match (self, src) {
            (ArrayValues::Byte(d), ArrayValues::Byte(s)) => d[dst_index] = s[src_index],
            (ArrayValues::Short(d), ArrayValues::Short(s)) => d[dst_index] = s[src_index],
            (ArrayValues::Int(d), ArrayValues::Int(s)) => d[dst_index] = s[src_index],
            (ArrayValues::Long(d), ArrayValues::Long(s)) => d[dst_index] = s[src_index],
            (ArrayValues::Float(d), ArrayValues::Float(s)) => d[dst_index] = s[src_index],
            (ArrayValues::Double(d), ArrayValues::Double(s)) => d[dst_index] = s[src_index],
            (dst, src) => {
                return Err(CommonError::TypeMismatch {
                    expected: dst.data_type().to_string(),
                    actual: src.data_type().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Append the elements of `other`, which must hold the same data type.
    pub fn extend(&mut self, other: &ArrayValues) -> CommonResult<()> {
        match (self, other) {
            (ArrayValues::Byte(d), ArrayValues::Byte(s)) => d.extend_from_slice(s),
            (ArrayValues::Short(d), ArrayValues::Short(s)) => d.extend_from_slice(s),
            (ArrayValues::Int(d), ArrayValues::Int(s)) => d.extend_from_slice(s),
            (ArrayValues::Long(d), ArrayValues::Long(s)) => d.extend_from_slice(s),
            (ArrayValues::Float(d), ArrayValues::Float(s)) => d.extend_from_slice(s),
            (ArrayValues::Double(d), ArrayValues::Double(s)) => d.extend_from_slice(s),
            (dst, src) => {
                return Err(CommonError::TypeMismatch {
                    expected: dst.data_type().to_string(),
                    actual: src.data_type().to_string(),
                })
            }
        }
        Ok(())
    }
}

/// An n-dimensional array in row-major order (last dimension fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct GridArray {
    shape: Vec<usize>,
    values: ArrayValues,
}

impl GridArray {
    /// Create an array, checking that `values` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, values: ArrayValues) -> CommonResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(CommonError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Create an array of `data_type` from `f64` values.
    pub fn from_f64(data_type: DataType, shape: Vec<usize>, values: &[f64]) -> CommonResult<Self> {
        Self::new(shape, ArrayValues::from_f64(data_type, values)?)
    }

    /// Create a fill-valued array.
    pub fn filled(data_type: DataType, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            values: ArrayValues::filled(data_type, len),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.values.to_f64_vec()
    }

    /// Reinterpret the same elements under a new shape.
    pub fn reshape(self, shape: Vec<usize>) -> CommonResult<Self> {
        Self::new(shape, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = GridArray::new(vec![2, 3], ArrayValues::Float(vec![0.0; 5])).unwrap_err();
        assert!(matches!(err, CommonError::ShapeMismatch { expected: 6, actual: 5, .. }));
    }

    #[test]
    fn test_from_f64_integer_fill() {
        let arr = GridArray::from_f64(DataType::Short, vec![3], &[1.0, f64::NAN, -7.0]).unwrap();
        assert_eq!(arr.values(), &ArrayValues::Short(vec![1, -32767, -7]));
    }

    #[test]
    fn test_from_f64_rejects_unrepresentable() {
        let err = GridArray::from_f64(DataType::Short, vec![2], &[1.0, 1e9]).unwrap_err();
        assert!(matches!(
            err,
            CommonError::Unrepresentable { value, data_type: DataType::Short } if value == 1e9
        ));
        assert!(ArrayValues::from_f64(DataType::Int, &[2.5]).is_err());
        assert!(ArrayValues::from_f64(DataType::Byte, &[f64::INFINITY]).is_err());
        assert!(ArrayValues::from_f64(DataType::Float, &[1e300]).is_err());
        assert_eq!(
            ArrayValues::from_f64(DataType::Float, &[f64::NAN, 0.5]).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_reshape_adds_leading_axis() {
        let arr = GridArray::new(vec![2, 2], ArrayValues::Double(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        let arr = arr.reshape(vec![1, 2, 2]).unwrap();
        assert_eq!(arr.shape(), &[1, 2, 2]);
        assert!(arr.clone().reshape(vec![3]).is_err());
    }

    #[test]
    fn test_copy_element_type_checked() {
        let mut dst = ArrayValues::filled(DataType::Int, 2);
        dst.copy_element(1, &ArrayValues::Int(vec![7]), 0).unwrap();
        assert_eq!(dst, ArrayValues::Int(vec![-2147483647, 7]));
        assert!(dst.copy_element(0, &ArrayValues::Float(vec![1.0]), 0).is_err());
    }
}
