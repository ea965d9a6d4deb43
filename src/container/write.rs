use super::error::{self, ContainerError};
use super::{AttrValue, DType, Member, MemberKind};
use crate::Numeric;

use byteorder::{LittleEndian, WriteBytesExt};
use ndarray::{ArrayBase, Data, Dimension};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

/// Appends groups, attributes and datasets to a container stream.
///
/// The writer keeps track of which objects exist so that every record it emits refers to an
/// existing parent group. Writing a dataset to a path that already holds a dataset appends a
/// replacement record.
pub struct ContainerWriter<W: Write> {
    writer: Counting<W>,
    groups: BTreeSet<String>,
    /// payload offset of the latest record of every dataset
    datasets: BTreeMap<String, u64>,
}

/// keeps the number of bytes written so far
struct Counting<W> {
    inner: W,
    position: u64,
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> ContainerWriter<W> {
    /// start a new container, writing the file header to `writer`
    pub fn new(mut writer: W) -> Result<Self, ContainerError> {
        writer.write_all(&super::MAGIC)?;
        writer.write_u16::<LittleEndian>(super::VERSION)?;

        let mut groups = BTreeSet::new();
        groups.insert(super::ROOT.to_string());

        Ok(Self {
            writer: Counting {
                inner: writer,
                position: (super::MAGIC.len() + 2) as u64,
            },
            groups,
            datasets: BTreeMap::new(),
        })
    }

    pub fn create_group(&mut self, path: &str) -> Result<(), ContainerError> {
        self.check_new_object(path)?;
        if self.datasets.contains_key(path) {
            return Err(error::ObjectExists::new(path.into()).into());
        }

        self.writer.write_u8(super::TAG_GROUP)?;
        write_str(&mut self.writer, path)?;
        self.groups.insert(path.into());

        Ok(())
    }

    /// attach an attribute to an existing group or dataset
    pub fn set_attribute<V: Into<AttrValue>>(
        &mut self,
        path: &str,
        name: &str,
        value: V,
    ) -> Result<(), ContainerError> {
        if !self.groups.contains(path) && !self.datasets.contains_key(path) {
            return Err(error::MissingObject::new("group or dataset", path.into()).into());
        }

        self.writer.write_u8(super::TAG_ATTRIBUTE)?;
        write_str(&mut self.writer, path)?;
        write_str(&mut self.writer, name)?;

        match value.into() {
            AttrValue::Float(value) => {
                self.writer.write_u8(0)?;
                self.writer.write_f64::<LittleEndian>(value)?;
            }
            AttrValue::Int(value) => {
                self.writer.write_u8(1)?;
                self.writer.write_i32::<LittleEndian>(value)?;
            }
            AttrValue::Str(value) => {
                self.writer.write_u8(2)?;
                write_str(&mut self.writer, &value)?;
            }
        }

        Ok(())
    }

    /// write a dataset of `shape` from values in row major order
    pub fn write_dataset<T: Numeric>(
        &mut self,
        path: &str,
        shape: &[usize],
        values: &[T],
    ) -> Result<(), ContainerError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            let err = error::ShapeMismatch::new(path.into(), shape.to_vec(), expected, values.len());
            return Err(err.into());
        }

        let dtype = T::dtype();
        self.write_dataset_header(path, &dtype, shape)?;
        T::write_slice(values, &mut self.writer)?;

        tracing::trace!(path, ?shape, %dtype, "wrote dataset");

        Ok(())
    }

    /// write an n-dimensional array as a dataset with the same shape
    pub fn write_array<T, S, D>(
        &mut self,
        path: &str,
        array: &ArrayBase<S, D>,
    ) -> Result<(), ContainerError>
    where
        T: Numeric,
        S: Data<Elem = T>,
        D: Dimension,
    {
        match array.as_slice() {
            Some(values) => self.write_dataset(path, array.shape(), values),
            None => {
                // not in standard layout: copy out in logical order
                let values: Vec<T> = array.iter().copied().collect();
                self.write_dataset(path, array.shape(), &values)
            }
        }
    }

    /// write a rank 1 dataset of fixed size records
    ///
    /// every row must already be encoded to exactly `DType::Compound(members).element_size()`
    /// bytes
    pub fn write_compound(
        &mut self,
        path: &str,
        members: Vec<Member>,
        rows: &[Vec<u8>],
    ) -> Result<(), ContainerError> {
        let dtype = DType::Compound(members);
        let row_size = dtype.element_size();

        if let Some(bad_row) = rows.iter().find(|row| row.len() != row_size) {
            let err = error::ShapeMismatch::new(path.into(), vec![row_size], row_size, bad_row.len());
            return Err(err.into());
        }

        self.write_dataset_header(path, &dtype, &[rows.len()])?;
        for row in rows {
            self.writer.write_all(row)?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ContainerError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.inner
    }

    /// Byte offset of the payload of the dataset at `path`, from the start of the container.
    ///
    /// Payloads are stored as plain little endian arrays in row major order, so this is enough
    /// for other readers to address a dataset inside the file.
    pub fn payload_offset(&self, path: &str) -> Result<u64, ContainerError> {
        self.datasets
            .get(path)
            .copied()
            .ok_or_else(|| error::MissingObject::new("dataset", path.into()).into())
    }

    fn write_dataset_header(
        &mut self,
        path: &str,
        dtype: &DType,
        shape: &[usize],
    ) -> Result<(), ContainerError> {
        if !self.datasets.contains_key(path) {
            self.check_new_object(path)?;
        }
        if self.groups.contains(path) {
            return Err(error::ObjectExists::new(path.into()).into());
        }

        self.writer.write_u8(super::TAG_DATASET)?;
        write_str(&mut self.writer, path)?;
        write_dtype(&mut self.writer, dtype)?;

        self.writer.write_u8(shape.len() as u8)?;
        for dim in shape {
            self.writer.write_u64::<LittleEndian>(*dim as u64)?;
        }

        let byte_len = shape.iter().product::<usize>() * dtype.element_size();
        self.writer.write_u64::<LittleEndian>(byte_len as u64)?;

        self.datasets.insert(path.into(), self.writer.position);

        Ok(())
    }

    /// the path must be well formed, unused by a group, and inside an existing group
    fn check_new_object(&self, path: &str) -> Result<(), ContainerError> {
        if !super::is_valid_path(path) || path == super::ROOT {
            return Err(error::InvalidPath::new(path.into()).into());
        }
        if self.groups.contains(path) {
            return Err(error::ObjectExists::new(path.into()).into());
        }

        // is_valid_path guarantees a parent for anything but the root
        let parent = super::parent(path).unwrap_or(super::ROOT);
        if !self.groups.contains(parent) {
            return Err(error::MissingParent::new(path.into(), parent.into()).into());
        }

        Ok(())
    }
}

fn write_str<W: Write>(writer: &mut W, value: &str) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())
}

fn write_dtype<W: Write>(writer: &mut W, dtype: &DType) -> std::io::Result<()> {
    match dtype {
        DType::Float64 => writer.write_u8(0),
        DType::Int32 => writer.write_u8(1),
        DType::Compound(members) => {
            writer.write_u8(2)?;
            writer.write_u16::<LittleEndian>(members.len() as u16)?;
            for member in members {
                write_str(writer, &member.name)?;
                match member.kind {
                    MemberKind::Int32 => writer.write_u8(0)?,
                    MemberKind::FixedString(len) => {
                        writer.write_u8(1)?;
                        writer.write_u32::<LittleEndian>(len as u32)?;
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_need_a_parent() {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();

        let out = writer.write_dataset("/tin/points", &[1], &[1.0f64]);
        assert!(matches!(out, Err(ContainerError::MissingParent(_))));

        writer.create_group("/tin").unwrap();
        writer.write_dataset("/tin/points", &[1], &[1.0f64]).unwrap();

        let out = writer.create_group("/tin");
        assert!(matches!(out, Err(ContainerError::ObjectExists(_))));

        let out = writer.create_group("/tin/points");
        assert!(matches!(out, Err(ContainerError::ObjectExists(_))));
    }

    #[test]
    fn shape_must_match_values() {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();

        let out = writer.write_dataset("/faces", &[2, 3], &[0i32, 1, 2]);
        assert!(matches!(out, Err(ContainerError::ShapeMismatch(_))));
    }

    #[test]
    fn attributes_need_an_object() {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();

        writer.set_attribute("/", "timestamp", 1.5).unwrap();

        let out = writer.set_attribute("/tin", "projection", "+proj=longlat");
        assert!(matches!(out, Err(ContainerError::MissingObject(_))));
    }

    #[test]
    fn payload_offsets_follow_headers() {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();
        writer.create_group("/tin").unwrap();
        writer.write_dataset("/tin/faces", &[1, 3], &[0i32, 1, 2]).unwrap();
        writer.write_dataset("/tin/faces", &[1, 3], &[3i32, 4, 5]).unwrap();

        let offset = writer.payload_offset("/tin/faces").unwrap() as usize;
        assert!(matches!(
            writer.payload_offset("/tin"),
            Err(ContainerError::MissingObject(_))
        ));

        // the latest record is addressed
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), offset + 12);
        assert_eq!(&bytes[offset..offset + 4], &3i32.to_le_bytes());
    }

    #[test]
    fn header_is_written_first() {
        let writer = ContainerWriter::new(Vec::new()).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(&bytes[0..4], b"TINC");
        assert_eq!(&bytes[4..6], &1u16.to_le_bytes());
    }
}
