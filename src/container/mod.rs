//! The binary half of an archive entry.
//!
//! A container is a small hierarchical store of groups, attributes and n-dimensional
//! datasets, laid out as an append-only stream of records:
//!
//! ```text
//! "TINC" u16:version
//! u8:tag  u32:len path   (group)
//! u8:tag  u32:len path   u32:len name  u8:kind value                      (attribute)
//! u8:tag  u32:len path   dtype  u8:rank  u64:dims..  u64:len  payload      (dataset)
//! ```
//!
//! All integers are little endian. Because records are only ever appended, a
//! [`ContainerWriter`] can stay open for an entire writer session and grow the file one
//! dataset at a time. A [`ContainerReader`] scans the record headers once, seeking over the
//! payloads, so metadata such as shapes and attributes can be queried without reading any
//! array data. If two dataset records share a path, the later one wins.

pub mod error;
mod read;
mod write;

pub use error::ContainerError;
pub use read::{ContainerReader, DatasetInfo};
pub use write::ContainerWriter;

use std::fmt;

pub(crate) const MAGIC: [u8; 4] = *b"TINC";
pub(crate) const VERSION: u16 = 1;

pub(crate) const TAG_GROUP: u8 = 1;
pub(crate) const TAG_ATTRIBUTE: u8 = 2;
pub(crate) const TAG_DATASET: u8 = 3;

/// path of the root group, which always exists
pub const ROOT: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
/// element type of a dataset
pub enum DType {
    Float64,
    Int32,
    /// fixed size records, such as the land cover palette table
    Compound(Vec<Member>),
}

impl DType {
    /// number of bytes in a single element
    pub fn element_size(&self) -> usize {
        match self {
            Self::Float64 => 8,
            Self::Int32 => 4,
            Self::Compound(members) => members.iter().map(|m| m.kind.size()).sum(),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float64 => write!(f, "float64"),
            Self::Int32 => write!(f, "int32"),
            Self::Compound(members) => {
                write!(f, "compound(")?;
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", member.name, member.kind)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// named field of a compound record
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
}

impl Member {
    pub fn new<T: Into<String>>(name: T, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Int32,
    /// zero padded utf-8 bytes
    FixedString(usize),
}

impl MemberKind {
    pub fn size(&self) -> usize {
        match self {
            Self::Int32 => 4,
            Self::FixedString(len) => *len,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32 => write!(f, "int32"),
            Self::FixedString(len) => write!(f, "S{len}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// value of an attribute attached to a group or dataset
pub enum AttrValue {
    Float(f64),
    Int(i32),
    Str(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(f64::from(*value)),
            Self::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<i32> for AttrValue {
    fn from(x: i32) -> Self {
        Self::Int(x)
    }
}

impl From<&str> for AttrValue {
    fn from(x: &str) -> Self {
        Self::Str(x.into())
    }
}

impl From<String> for AttrValue {
    fn from(x: String) -> Self {
        Self::Str(x)
    }
}

/// join a group path and a child name
pub fn join(group: &str, name: &str) -> String {
    if group == ROOT {
        format!("/{name}")
    } else {
        format!("{group}/{name}")
    }
}

/// parent group of an absolute path; the root has no parent
pub(crate) fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// last segment of an absolute path
pub(crate) fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub(crate) fn is_valid_path(path: &str) -> bool {
    if path == ROOT {
        return true;
    }
    path.starts_with('/') && path[1..].split('/').all(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(join(ROOT, "tin"), "/tin");
        assert_eq!(join("/tin", "points"), "/tin/points");

        assert_eq!(parent("/tin/points"), Some("/tin"));
        assert_eq!(parent("/tin"), Some(ROOT));
        assert_eq!(parent(ROOT), None);

        assert_eq!(base_name("/tin/face_fields/cover_type"), "cover_type");
        assert_eq!(base_name("/1577836800.0000"), "1577836800.0000");

        assert!(is_valid_path("/tin/points"));
        assert!(!is_valid_path("tin/points"));
        assert!(!is_valid_path("/tin//points"));
        assert!(!is_valid_path("/tin/"));
    }

    #[test]
    fn compound_size() {
        let dtype = DType::Compound(vec![
            Member::new("value", MemberKind::Int32),
            Member::new("name", MemberKind::FixedString(100)),
        ]);

        assert_eq!(dtype.element_size(), 104);
        assert_eq!(dtype.to_string(), "compound(value: int32, name: S100)");
    }
}
