use super::DType;

use derive_more::{Constructor, Display, From};

#[derive(Debug, thiserror::Error, From)]
pub enum ContainerError {
    #[error("{0}")]
    BadHeader(BadHeader),
    #[error("{0}")]
    UnknownTag(UnknownTag),
    #[error("{0}")]
    InvalidPath(InvalidPath),
    #[error("{0}")]
    MissingParent(MissingParent),
    #[error("{0}")]
    MissingObject(MissingObject),
    #[error("{0}")]
    ObjectExists(ObjectExists),
    #[error("{0}")]
    TypeMismatch(TypeMismatch),
    #[error("{0}")]
    ShapeMismatch(ShapeMismatch),
    #[error("{0}")]
    RankMismatch(RankMismatch),
    #[error("{0}")]
    Truncated(Truncated),
    #[error("{0}")]
    BadLength(BadLength),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("failed to read or write container bytes: {0}")]
    Io(std::io::Error),
    #[error("container string is not valid utf-8: {0}")]
    Utf8(std::string::FromUtf8Error),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "not a tin container: expected magic {expected:?} version {version}, found {found:?} version {found_version}")]
pub struct BadHeader {
    expected: [u8; 4],
    version: u16,
    found: [u8; 4],
    found_version: u16,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "unknown {kind} tag {tag}")]
pub struct UnknownTag {
    kind: &'static str,
    tag: u8,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "`{path}` is not an absolute container path")]
pub struct InvalidPath {
    path: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "parent group `{parent}` of `{path}` does not exist")]
pub struct MissingParent {
    path: String,
    parent: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "no {kind} at `{path}`")]
pub struct MissingObject {
    kind: &'static str,
    path: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "no {kind} attribute `{name}` on `{path}`")]
pub struct MissingAttribute {
    path: String,
    name: &'static str,
    kind: &'static str,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "an object already exists at `{path}`")]
pub struct ObjectExists {
    path: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "dataset `{path}` holds {actual}, expected {expected}")]
pub struct TypeMismatch {
    path: String,
    expected: DType,
    actual: DType,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "dataset `{path}` has shape {shape:?} ({expected} elements) but {actual} were supplied")]
pub struct ShapeMismatch {
    path: String,
    shape: Vec<usize>,
    expected: usize,
    actual: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "dataset `{path}` has shape {shape:?}, expected rank {expected}")]
pub struct RankMismatch {
    path: String,
    shape: Vec<usize>,
    expected: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "dataset `{path}` needs {needed} bytes at offset {offset} but the container ends at {end}")]
pub struct Truncated {
    path: String,
    offset: u64,
    needed: u64,
    end: u64,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "dataset `{path}` declares shape {shape:?} but holds {byte_len} payload bytes")]
pub struct BadLength {
    path: String,
    shape: Vec<u64>,
    byte_len: u64,
}
