//! Persistence for triangulated terrain meshes (TINs).
//!
//! A [`MeshArchive`] stores every mesh as a pair of files sharing a base name: a compact
//! binary [container](`crate::container`) with the point, face and face-field arrays, and an
//! XML [metadata document](`crate::xdmf`) describing where those arrays live. A
//! [`ShadeArchive`] attaches time series of per-face values to an existing mesh entry through
//! a [`ShadeWriter`] session.
//!
//! ```no_run
//! use tin_archive::{Geometry, MeshArchive};
//! use ndarray::array;
//!
//! let archive = MeshArchive::new("./tins")?;
//! let geometry = Geometry::new(
//!     array![[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
//!     array![[0, 1, 2]],
//!     "+proj=utm +zone=33 +ellps=WGS84 +units=m +no_defs",
//! )?;
//!
//! archive.save("m1", &geometry, None, None)?;
//! let info = archive.info("m1")?;
//! assert_eq!(info.tin.num_faces, 1);
//! # Ok::<(), tin_archive::Error>(())
//! ```

mod commit;
mod config;
pub mod container;
pub mod field;
pub mod geometry;
pub mod js_export;
pub mod land_cover;
mod mesh_archive;
pub mod prelude;
mod shade_archive;
mod traits;
mod utils;
pub mod xdmf;

pub use config::ArchiveConfig;

pub use traits::Numeric;

pub use field::{AttributeType, FaceField, FaceFields, FieldData, NumberType};
pub use geometry::Geometry;
pub use land_cover::{LandCoverClassifier, LandCoverEntry, LandCoverInfo, LandCoverTable};

pub use mesh_archive::{MeshArchive, MeshInfo, TinInfo};
pub use shade_archive::{ShadeArchive, ShadeInfo, ShadeWriter};

pub use utils::timestamp_key;

pub use ndarray;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("archive already has a data set with uid `{uid}`")]
    AlreadyExists { uid: String },
    #[error("entry with uid `{uid}` not found in archive {}", .path.display())]
    NotFound { uid: String, path: std::path::PathBuf },
    #[error("entry `{uid}` has no face field `{field}`")]
    MissingField { uid: String, field: String },
    #[error("face id {face_id} not found in entry `{uid}`")]
    EmptyResult { uid: String, face_id: i32 },
    #[error("timestamp `{key}` was already written in this session")]
    DuplicateTimestamp { key: String },
    #[error("expected {expected} values (one per face), got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("face field `{field}` has {rows} rows but the mesh has {faces} faces")]
    FieldRows {
        field: String,
        rows: usize,
        faces: usize,
    },
    #[error("cover type {value} is not part of the `{classifier}` palette")]
    UnknownCoverType { value: i32, classifier: String },
    #[error("classifier `{classifier}` has no color for cover type {value}")]
    MissingColor { value: i32, classifier: String },
    #[error("no sample `{key}` in shade entry `{uid}`")]
    MissingSample { uid: String, key: String },
    #[error("shade session `{uid}` has already been closed")]
    SessionClosed { uid: String },
    #[error("`{0}` is not a valid uid")]
    InvalidUid(String),
    #[error("archive path {} is not a directory", .0.display())]
    NotADirectory(std::path::PathBuf),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] geometry::InvalidGeometry),
    #[error("Invalid face field: {0}")]
    Field(#[from] field::FieldError),
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Error in binary container: {0}")]
    Container(#[from] container::ContainerError),
    #[error("Error in metadata document: {0}")]
    Document(#[from] xdmf::DocumentError),
    #[error("Could not convert file to uf8 encoding: `{0}`")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Could not write XML data to file: `{0}`")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("Could not move staged file into place: `{0}`")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
