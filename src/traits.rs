//! # Traits
//!
//! The element types that can be stored in the binary container and referenced from the
//! metadata document. Only `i32` and `f64` are supported since those are the two layouts the
//! metadata schema can describe (`Int`/`4` and `Float`/`8`).

use crate::container::DType;
use crate::field::NumberType;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// numeric element type of a dataset
///
/// Implementations describe how the element is tagged in both files and how a slice of
/// elements is encoded as little endian bytes.
pub trait Numeric:
    num_traits::Num + num_traits::NumCast + Copy + PartialOrd + std::fmt::Debug + 'static
{
    /// the tag written to the `DataType` / `Precision` attributes of a `DataItem`
    fn number_type() -> NumberType;

    /// the on-disk data type of the dataset
    fn dtype() -> DType {
        match Self::number_type() {
            NumberType::Int => DType::Int32,
            NumberType::Float => DType::Float64,
        }
    }

    fn write_slice<W: Write>(values: &[Self], writer: &mut W) -> std::io::Result<()>;

    fn read_vec<R: Read>(reader: &mut R, len: usize) -> std::io::Result<Vec<Self>>;
}

impl Numeric for f64 {
    fn number_type() -> NumberType {
        NumberType::Float
    }

    fn write_slice<W: Write>(values: &[Self], writer: &mut W) -> std::io::Result<()> {
        for value in values {
            writer.write_f64::<LittleEndian>(*value)?;
        }
        Ok(())
    }

    fn read_vec<R: Read>(reader: &mut R, len: usize) -> std::io::Result<Vec<Self>> {
        let mut out = vec![0.0; len];
        reader.read_f64_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }
}

impl Numeric for i32 {
    fn number_type() -> NumberType {
        NumberType::Int
    }

    fn write_slice<W: Write>(values: &[Self], writer: &mut W) -> std::io::Result<()> {
        for value in values {
            writer.write_i32::<LittleEndian>(*value)?;
        }
        Ok(())
    }

    fn read_vec<R: Read>(reader: &mut R, len: usize) -> std::io::Result<Vec<Self>> {
        let mut out = vec![0; len];
        reader.read_i32_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }
}
