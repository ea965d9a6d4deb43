use super::error::{self, ContainerError};
use super::{AttrValue, DType, Member, MemberKind};
use crate::Numeric;

use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::{Array2, ArrayD, Ix2, IxDyn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
/// Header information of a dataset. The payload itself is only read on request.
pub struct DatasetInfo {
    pub dtype: DType,
    pub shape: Vec<usize>,
    offset: u64,
    byte_len: u64,
}

impl DatasetInfo {
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// position of the payload, in bytes from the start of the container
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Random access to a container through an index built from its record headers.
pub struct ContainerReader<R> {
    reader: R,
    /// every group and dataset path, in the order it was first written
    objects: Vec<String>,
    groups: BTreeSet<String>,
    datasets: BTreeMap<String, DatasetInfo>,
    attributes: BTreeMap<String, BTreeMap<String, AttrValue>>,
}

impl ContainerReader<BufReader<File>> {
    /// open and index the container at `path`
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn new(mut reader: R) -> Result<Self, ContainerError> {
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        let version = reader.read_u16::<LittleEndian>()?;

        if magic != super::MAGIC || version != super::VERSION {
            let err = error::BadHeader::new(super::MAGIC, super::VERSION, magic, version);
            return Err(err.into());
        }

        let mut container = Self {
            reader,
            objects: vec![super::ROOT.to_string()],
            groups: BTreeSet::new(),
            datasets: BTreeMap::new(),
            attributes: BTreeMap::new(),
        };
        container.groups.insert(super::ROOT.to_string());

        container.scan(end)?;

        Ok(container)
    }

    /// walk every record header until the end of the stream
    fn scan(&mut self, end: u64) -> Result<(), ContainerError> {
        loop {
            let tag = match self.reader.read_u8() {
                Ok(tag) => tag,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };

            let path = read_str(&mut self.reader)?;

            match tag {
                super::TAG_GROUP => {
                    if self.groups.insert(path.clone()) {
                        self.objects.push(path);
                    }
                }
                super::TAG_ATTRIBUTE => {
                    let name = read_str(&mut self.reader)?;
                    let value = read_attr_value(&mut self.reader)?;
                    self.attributes
                        .entry(path)
                        .or_default()
                        .insert(name, value);
                }
                super::TAG_DATASET => {
                    let dtype = read_dtype(&mut self.reader)?;
                    let rank = self.reader.read_u8()?;
                    let mut dims = Vec::with_capacity(rank as usize);
                    for _ in 0..rank {
                        dims.push(self.reader.read_u64::<LittleEndian>()?);
                    }
                    let byte_len = self.reader.read_u64::<LittleEndian>()?;
                    let offset = self.reader.stream_position()?;

                    let payload_end = match offset.checked_add(byte_len) {
                        Some(payload_end) if payload_end <= end => payload_end,
                        _ => return Err(error::Truncated::new(path, offset, byte_len, end).into()),
                    };

                    // the payload must hold exactly the elements the shape declares
                    let expected = dims
                        .iter()
                        .try_fold(dtype.element_size() as u64, |acc, dim| acc.checked_mul(*dim));
                    let shape: Option<Vec<usize>> =
                        dims.iter().map(|dim| usize::try_from(*dim).ok()).collect();
                    let shape = match shape {
                        Some(shape) if expected == Some(byte_len) => shape,
                        _ => return Err(error::BadLength::new(path, dims, byte_len).into()),
                    };

                    self.reader.seek(SeekFrom::Start(payload_end))?;

                    let info = DatasetInfo {
                        dtype,
                        shape,
                        offset,
                        byte_len,
                    };

                    if self.datasets.insert(path.clone(), info).is_none() {
                        self.objects.push(path);
                    }
                }
                other => return Err(error::UnknownTag::new("record", other).into()),
            }
        }

        Ok(())
    }

    pub fn is_group(&self, path: &str) -> bool {
        self.groups.contains(path)
    }

    pub fn is_dataset(&self, path: &str) -> bool {
        self.datasets.contains_key(path)
    }

    /// names of the groups and datasets directly inside `group`, in creation order
    pub fn children(&self, group: &str) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|path| super::parent(path) == Some(group))
            .map(|path| super::base_name(path))
            .collect()
    }

    pub fn dataset(&self, path: &str) -> Result<&DatasetInfo, ContainerError> {
        self.datasets
            .get(path)
            .ok_or_else(|| error::MissingObject::new("dataset", path.into()).into())
    }

    pub fn attribute(&self, path: &str, name: &str) -> Option<&AttrValue> {
        self.attributes.get(path).and_then(|attrs| attrs.get(name))
    }

    /// a float attribute that every container of its kind carries
    pub fn require_f64(&self, path: &str, name: &'static str) -> Result<f64, ContainerError> {
        self.attribute(path, name)
            .and_then(AttrValue::as_f64)
            .ok_or_else(|| error::MissingAttribute::new(path.into(), name, "float").into())
    }

    /// a string attribute that every container of its kind carries
    pub fn require_str(&self, path: &str, name: &'static str) -> Result<&str, ContainerError> {
        self.attribute(path, name)
            .and_then(AttrValue::as_str)
            .ok_or_else(|| error::MissingAttribute::new(path.into(), name, "string").into())
    }

    /// read a numeric dataset into an array of its stored shape
    pub fn read<T: Numeric>(&mut self, path: &str) -> Result<ArrayD<T>, ContainerError> {
        let info = self.dataset(path)?.clone();

        let expected = T::dtype();
        if info.dtype != expected {
            return Err(error::TypeMismatch::new(path.into(), expected, info.dtype).into());
        }

        self.reader.seek(SeekFrom::Start(info.offset))?;
        let values = T::read_vec(&mut self.reader, info.len())?;

        // the element count is the product of the shape, so this cannot fail
        let array = ArrayD::from_shape_vec(IxDyn(&info.shape), values).map_err(|_| {
            let len = info.len();
            error::ShapeMismatch::new(path.to_string(), info.shape.clone(), len, len)
        })?;

        Ok(array)
    }

    /// read a rank 2 numeric dataset
    pub fn read_2d<T: Numeric>(&mut self, path: &str) -> Result<Array2<T>, ContainerError> {
        let array = self.read::<T>(path)?;
        let shape = array.shape().to_vec();
        array
            .into_dimensionality::<Ix2>()
            .map_err(|_| error::RankMismatch::new(path.into(), shape, 2).into())
    }

    /// read a compound dataset as its member layout and one byte buffer per record
    pub fn read_compound(
        &mut self,
        path: &str,
    ) -> Result<(Vec<Member>, Vec<Vec<u8>>), ContainerError> {
        let info = self.dataset(path)?.clone();

        let members = match &info.dtype {
            DType::Compound(members) => members.clone(),
            other => {
                let expected = DType::Compound(Vec::new());
                return Err(error::TypeMismatch::new(path.into(), expected, other.clone()).into());
            }
        };

        let row_size = info.dtype.element_size();
        self.reader.seek(SeekFrom::Start(info.offset))?;

        let mut rows = Vec::with_capacity(info.len());
        for _ in 0..info.len() {
            let mut row = vec![0; row_size];
            self.reader.read_exact(&mut row)?;
            rows.push(row);
        }

        Ok((members, rows))
    }
}

fn read_str<R: Read>(reader: &mut R) -> Result<String, ContainerError> {
    let len = u64::from(reader.read_u32::<LittleEndian>()?);

    // a corrupt length must not turn into a huge allocation
    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    Ok(String::from_utf8(bytes)?)
}

fn read_attr_value<R: Read>(reader: &mut R) -> Result<AttrValue, ContainerError> {
    let value = match reader.read_u8()? {
        0 => AttrValue::Float(reader.read_f64::<LittleEndian>()?),
        1 => AttrValue::Int(reader.read_i32::<LittleEndian>()?),
        2 => AttrValue::Str(read_str(reader)?),
        other => return Err(error::UnknownTag::new("attribute", other).into()),
    };
    Ok(value)
}

fn read_dtype<R: Read>(reader: &mut R) -> Result<DType, ContainerError> {
    let dtype = match reader.read_u8()? {
        0 => DType::Float64,
        1 => DType::Int32,
        2 => {
            let count = reader.read_u16::<LittleEndian>()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = read_str(reader)?;
                let kind = match reader.read_u8()? {
                    0 => MemberKind::Int32,
                    1 => MemberKind::FixedString(reader.read_u32::<LittleEndian>()? as usize),
                    other => return Err(error::UnknownTag::new("member", other).into()),
                };
                members.push(Member { name, kind });
            }
            DType::Compound(members)
        }
        other => return Err(error::UnknownTag::new("dtype", other).into()),
    };
    Ok(dtype)
}
