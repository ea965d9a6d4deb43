#![allow(dead_code)]

use tin_archive::prelude::*;

use ndarray::{arr1, arr2, array};

pub const PROJECTION: &str = "+proj=utm +zone=33 +ellps=WGS84 +datum=WGS84 +units=m +no_defs";

/// send library logs to the test output, filtered by `RUST_LOG`
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// a strip of four triangles over six points
///
/// ```text
/// 0---1---2
/// | \ | \ |
/// 3---4---5
/// ```
pub fn strip() -> Geometry {
    let points = array![
        [0., 1., 10.],
        [1., 1., 11.],
        [2., 1., 12.],
        [0., 0., 13.],
        [1., 0., 14.],
        [2., 0., 15.],
    ];
    let faces = array![[0, 4, 1], [0, 3, 4], [1, 5, 2], [1, 4, 5]];
    Geometry::new(points, faces, PROJECTION).unwrap()
}

pub fn single_triangle() -> Geometry {
    Geometry::new(
        array![[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
        array![[0, 1, 2]],
        PROJECTION,
    )
    .unwrap()
}

pub fn globcover() -> LandCoverTable {
    LandCoverTable::new(
        "GlobCover",
        vec![
            LandCoverEntry::new(14, "Rainfed croplands", [255, 255, 100]),
            LandCoverEntry::new(70, "Closed needleleaved forest", [0, 60, 0]),
            LandCoverEntry::new(210, "Water bodies", [0, 70, 200]),
            LandCoverEntry::new(220, "Permanent snow and ice", [255, 255, 255]),
        ],
    )
}

/// cover type and color fields for [`strip`]: the left half is forest, the right half water
pub fn strip_fields() -> FaceFields {
    let mut fields = FaceFields::new();
    fields.insert(
        COVER_TYPE.into(),
        FaceField::scalar(arr1(&[70, 70, 210, 210]).into_dyn()).unwrap(),
    );
    fields.insert(
        COVER_COLOR.into(),
        FaceField::vector(
            arr2(&[[0, 60, 0], [0, 60, 0], [0, 70, 200], [0, 70, 200]]).into_dyn(),
        )
        .unwrap(),
    );
    fields
}
