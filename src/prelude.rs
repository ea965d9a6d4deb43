//! Common traits and types that are useful for working with tin archives

pub use crate::field::{COVER_COLOR, COVER_TYPE};
pub use crate::{
    ArchiveConfig, AttributeType, Error, FaceField, FaceFields, FieldData, Geometry,
    LandCoverClassifier, LandCoverEntry, LandCoverInfo, LandCoverTable, MeshArchive, MeshInfo,
    Numeric, ShadeArchive, ShadeInfo, ShadeWriter,
};

pub use ndarray::{Array1, Array2, ArrayD};
