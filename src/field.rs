//! Per-face attribute arrays and their declared schema.
//!
//! Every face field states up front whether it is a scalar or a 3-vector per face. The
//! element type (`i32` or `f64`) is carried by [`FieldData`]. Together they decide the
//! `AttributeType`, `DataType` and `Precision` tags of the field in the metadata document, so
//! a width-3 array is only described as a vector when it was declared as one.

use crate::container::{self, ContainerError, ContainerReader, ContainerWriter, DType};

use derive_more::{Constructor, Display, From};
use ndarray::{ArrayD, Axis, Ix2};
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

/// name of the classification field
pub const COVER_TYPE: &str = "cover_type";
/// name of the per-face rgb field
pub const COVER_COLOR: &str = "cover_color";

/// container attribute holding the declared [`AttributeType`] of a field dataset
pub(crate) const ATTRIBUTE_TYPE: &str = "attribute_type";

/// named face fields, in name order
pub type FaceFields = BTreeMap<String, FaceField>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Scalar,
    Vector,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Vector => "Vector",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// numeric tag of a `DataItem`
pub enum NumberType {
    Int,
    Float,
}

impl NumberType {
    /// value of the `DataType` attribute
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
        }
    }

    /// value of the `Precision` attribute, in bytes
    pub fn precision(&self) -> &'static str {
        match self {
            Self::Int => "4",
            Self::Float => "8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, From)]
/// values of a face field, one row per face
pub enum FieldData {
    Int(ArrayD<i32>),
    Float(ArrayD<f64>),
}

impl FieldData {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Int(array) => array.shape(),
            Self::Float(array) => array.shape(),
        }
    }

    pub fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    pub fn number_type(&self) -> NumberType {
        match self {
            Self::Int(_) => NumberType::Int,
            Self::Float(_) => NumberType::Float,
        }
    }

    /// integer values of a rank 1 (or `M×1`) field, one per face
    ///
    /// floating point fields are accepted when every value is integral
    pub fn to_int_rows(&self, name: &str) -> Result<Vec<i32>, FieldError> {
        let shape = self.shape();
        let per_face = match shape {
            [_] => true,
            [_, 1] => true,
            _ => false,
        };
        if !per_face {
            return Err(WrongShape::new(name.into(), "one value per face", shape.to_vec()).into());
        }

        match self {
            Self::Int(array) => Ok(array.iter().copied().collect()),
            Self::Float(array) => array.iter().map(|value| integral(name, *value)).collect(),
        }
    }

    /// rgb rows of an `M×3` field
    ///
    /// like [`FieldData::to_int_rows`], floating point values must be integral
    pub fn to_rgb_rows(&self, name: &str) -> Result<Vec<[i32; 3]>, FieldError> {
        let shape = self.shape();
        if !matches!(shape, [_, 3]) {
            return Err(WrongShape::new(name.into(), "three values per face", shape.to_vec()).into());
        }

        let ints = match self {
            Self::Int(array) => array.clone(),
            Self::Float(array) => {
                let mut out = ArrayD::zeros(array.raw_dim());
                for (dst, src) in out.iter_mut().zip(array.iter()) {
                    *dst = integral(name, *src)?;
                }
                out
            }
        };

        let ints = ints
            .into_dimensionality::<Ix2>()
            .map_err(|_| WrongShape::new(name.into(), "three values per face", shape.to_vec()))?;

        Ok(ints
            .axis_iter(Axis(0))
            .map(|row| [row[0], row[1], row[2]])
            .collect())
    }

    /// read a numeric dataset back into the matching variant
    pub(crate) fn read_from<R: Read + Seek>(
        reader: &mut ContainerReader<R>,
        path: &str,
    ) -> Result<Self, ContainerError> {
        let dtype = reader.dataset(path)?.dtype.clone();
        match dtype {
            DType::Int32 => Ok(Self::Int(reader.read::<i32>(path)?)),
            _ => Ok(Self::Float(reader.read::<f64>(path)?)),
        }
    }

    pub(crate) fn write_to<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
        path: &str,
    ) -> Result<(), ContainerError> {
        match self {
            Self::Int(array) => writer.write_array(path, array),
            Self::Float(array) => writer.write_array(path, array),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// a face field together with its declared schema
pub struct FaceField {
    attribute_type: AttributeType,
    data: FieldData,
}

impl FaceField {
    /// one value (rank 1) or one row of any width (rank 2) per face
    pub fn scalar<T: Into<FieldData>>(data: T) -> Result<Self, FieldError> {
        let data: FieldData = data.into();
        if !matches!(data.shape(), [_] | [_, _]) {
            let shape = data.shape().to_vec();
            return Err(WrongShape::new("scalar".into(), "rank 1 or 2", shape).into());
        }

        Ok(Self {
            attribute_type: AttributeType::Scalar,
            data,
        })
    }

    /// one 3-vector per face
    pub fn vector<T: Into<FieldData>>(data: T) -> Result<Self, FieldError> {
        let data: FieldData = data.into();
        if !matches!(data.shape(), [_, 3]) {
            let shape = data.shape().to_vec();
            return Err(WrongShape::new("vector".into(), "rank 2 with 3 columns", shape).into());
        }

        Ok(Self {
            attribute_type: AttributeType::Vector,
            data,
        })
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    /// write the dataset and its declared attribute type
    pub(crate) fn write_to<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
        path: &str,
    ) -> Result<(), ContainerError> {
        self.data.write_to(writer, path)?;
        writer.set_attribute(path, ATTRIBUTE_TYPE, self.attribute_type.as_str())
    }

}

/// `value` as an `i32`, if it is one
fn integral(name: &str, value: f64) -> Result<i32, FieldError> {
    let cast: Option<i32> = num_traits::NumCast::from(value);
    cast.filter(|cast| f64::from(*cast) == value)
        .ok_or_else(|| NotIntegral::new(name.into(), value).into())
}

/// path of the dataset holding face field `name`
pub(crate) fn field_path(name: &str) -> String {
    container::join(FACE_FIELDS_GROUP, name)
}

pub(crate) const FACE_FIELDS_GROUP: &str = "/tin/face_fields";

#[derive(Debug, thiserror::Error, From)]
pub enum FieldError {
    #[error("{0}")]
    WrongShape(WrongShape),
    #[error("{0}")]
    NotIntegral(NotIntegral),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "field `{name}` should have {expected}, found shape {actual:?}")]
pub struct WrongShape {
    name: String,
    expected: &'static str,
    actual: Vec<usize>,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "field `{name}` holds {value}, which is not an integer")]
pub struct NotIntegral {
    name: String,
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn declared_schema_is_checked() {
        let colors = arr2(&[[1, 2, 3], [4, 5, 6]]).into_dyn();
        assert!(FaceField::vector(colors.clone()).is_ok());
        assert_eq!(
            FaceField::scalar(colors).unwrap().attribute_type(),
            AttributeType::Scalar
        );

        let per_face = arr1(&[1.0, 2.0]).into_dyn();
        assert!(FaceField::vector(per_face.clone()).is_err());
        assert!(FaceField::scalar(per_face).is_ok());

        let cube = ArrayD::<f64>::zeros(ndarray::IxDyn(&[2, 2, 2]));
        assert!(FaceField::scalar(cube).is_err());
    }

    #[test]
    fn number_types() {
        let ints = FieldData::from(arr1(&[1, 2]).into_dyn());
        assert_eq!(ints.number_type().data_type(), "Int");
        assert_eq!(ints.number_type().precision(), "4");

        let floats = FieldData::from(arr1(&[1.0]).into_dyn());
        assert_eq!(floats.number_type().data_type(), "Float");
        assert_eq!(floats.number_type().precision(), "8");
    }

    #[test]
    fn int_rows_accept_integral_floats() {
        let floats = FieldData::from(arr1(&[10.0, 20.0]).into_dyn());
        assert_eq!(floats.to_int_rows("cover_type").unwrap(), vec![10, 20]);

        let fractional = FieldData::from(arr1(&[1.5]).into_dyn());
        assert!(matches!(
            fractional.to_int_rows("cover_type"),
            Err(FieldError::NotIntegral(_))
        ));

        let column = FieldData::from(arr2(&[[4], [5]]).into_dyn());
        assert_eq!(column.to_int_rows("cover_type").unwrap(), vec![4, 5]);
    }

    #[test]
    fn rgb_rows() {
        let colors = FieldData::from(arr2(&[[255, 0, 0], [0, 128, 0]]).into_dyn());
        assert_eq!(
            colors.to_rgb_rows("cover_color").unwrap(),
            vec![[255, 0, 0], [0, 128, 0]]
        );

        let flat = FieldData::from(arr1(&[1, 2, 3]).into_dyn());
        assert!(flat.to_rgb_rows("cover_color").is_err());

        let floats = FieldData::from(arr2(&[[255.0, 0.0, 0.0]]).into_dyn());
        assert_eq!(floats.to_rgb_rows("cover_color").unwrap(), vec![[255, 0, 0]]);

        // fractional colors are rejected, not truncated
        let fractional = FieldData::from(arr2(&[[0.5, 0.0, 0.0]]).into_dyn());
        assert!(matches!(
            fractional.to_rgb_rows("cover_color"),
            Err(FieldError::NotIntegral(_))
        ));
    }
}
