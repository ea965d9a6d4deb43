//! Points, faces and coordinate reference of a triangulated mesh.

use derive_more::{Constructor, Display, From};
use ndarray::{Array2, Axis};

#[derive(Debug, Clone, PartialEq)]
/// A triangulated mesh in a given projection.
///
/// `points` is `N×3` (x, y, z) and `faces` is `M×3`, each row holding three indices into
/// `points`. `colors`, when present, holds one rgb row per face. `base_color` is a single
/// representative color, used for sub-meshes that cover only one class.
pub struct Geometry {
    pub points: Array2<f64>,
    pub faces: Array2<i32>,
    /// proj4 description of the coordinate reference system
    pub projection: String,
    pub colors: Option<Array2<i32>>,
    pub base_color: Option<[i32; 3]>,
}

impl Geometry {
    /// build a geometry, checking that every face refers to existing points
    pub fn new<T: Into<String>>(
        points: Array2<f64>,
        faces: Array2<i32>,
        projection: T,
    ) -> Result<Self, InvalidGeometry> {
        let geometry = Self {
            points,
            faces,
            projection: projection.into(),
            colors: None,
            base_color: None,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// check array widths and that every face index is within the point array
    ///
    /// The fields are public, so a geometry can change after [`Geometry::new`] checked it.
    pub fn validate(&self) -> Result<(), InvalidGeometry> {
        if self.points.ncols() != 3 {
            return Err(WrongWidth::new("points", self.points.ncols()).into());
        }
        if self.faces.ncols() != 3 {
            return Err(WrongWidth::new("faces", self.faces.ncols()).into());
        }

        let num_points = self.num_points();
        for (face, row) in self.faces.axis_iter(Axis(0)).enumerate() {
            if let Some(&index) = row.iter().find(|&&idx| idx < 0 || idx as usize >= num_points) {
                return Err(IndexOutOfBounds::new(face, index, num_points).into());
            }
        }

        if let Some(colors) = &self.colors {
            check_colors(colors, self.num_faces())?;
        }

        Ok(())
    }

    /// attach one rgb color per face
    pub fn with_colors(mut self, colors: Array2<i32>) -> Result<Self, InvalidGeometry> {
        check_colors(&colors, self.num_faces())?;
        self.colors = Some(colors);
        Ok(self)
    }

    pub fn with_base_color(mut self, color: [i32; 3]) -> Self {
        self.base_color = Some(color);
        self
    }

    pub fn num_points(&self) -> usize {
        self.points.nrows()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.nrows()
    }

    /// The mesh made of the faces at `face_indices`.
    ///
    /// Points that none of the selected faces refer to are dropped; the remaining points keep
    /// their relative order and face indices are remapped onto them. Per-face colors follow
    /// their faces. `base_color` is carried over unchanged.
    pub fn extract_sub_mesh(&self, face_indices: &[usize]) -> Result<Self, InvalidGeometry> {
        self.validate()?;

        let num_faces = self.num_faces();
        if let Some(&face) = face_indices.iter().find(|&&face| face >= num_faces) {
            return Err(FaceOutOfBounds::new(face, num_faces).into());
        }

        // new index of every point that is kept, in original order
        let mut used = vec![false; self.num_points()];
        for &face in face_indices {
            for &idx in self.faces.row(face) {
                used[idx as usize] = true;
            }
        }

        let mut remap = vec![-1i32; self.num_points()];
        let mut kept = Vec::new();
        for (old, _) in used.iter().enumerate().filter(|(_, used)| **used) {
            remap[old] = kept.len() as i32;
            kept.push(old);
        }

        let points = self.points.select(Axis(0), &kept);
        let mut faces = self.faces.select(Axis(0), face_indices);
        faces.mapv_inplace(|idx| remap[idx as usize]);

        let colors = self
            .colors
            .as_ref()
            .map(|colors| colors.select(Axis(0), face_indices));

        Ok(Self {
            points,
            faces,
            projection: self.projection.clone(),
            colors,
            base_color: self.base_color,
        })
    }
}

fn check_colors(colors: &Array2<i32>, num_faces: usize) -> Result<(), InvalidGeometry> {
    if colors.ncols() != 3 {
        return Err(WrongWidth::new("colors", colors.ncols()).into());
    }
    if colors.nrows() != num_faces {
        return Err(WrongRowCount::new("colors", colors.nrows(), num_faces).into());
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, From)]
pub enum InvalidGeometry {
    #[error("{0}")]
    WrongWidth(WrongWidth),
    #[error("{0}")]
    WrongRowCount(WrongRowCount),
    #[error("{0}")]
    IndexOutOfBounds(IndexOutOfBounds),
    #[error("{0}")]
    FaceOutOfBounds(FaceOutOfBounds),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "`{name}` must have 3 columns, found {columns}")]
pub struct WrongWidth {
    name: &'static str,
    columns: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "`{name}` has {rows} rows, expected {expected}")]
pub struct WrongRowCount {
    name: &'static str,
    rows: usize,
    expected: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "face {face} refers to point {index} but there are only {num_points} points")]
pub struct IndexOutOfBounds {
    face: usize,
    index: i32,
    num_points: usize,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "face {face} selected but there are only {num_faces} faces")]
pub struct FaceOutOfBounds {
    face: usize,
    num_faces: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_triangles() -> Geometry {
        // 0---1---3
        //  \ / \ /
        //   2   4
        let points = array![
            [0., 0., 0.],
            [1., 0., 0.],
            [0.5, -1., 0.],
            [2., 0., 1.],
            [1.5, -1., 1.],
        ];
        let faces = array![[0, 1, 2], [1, 3, 4]];

        Geometry::new(points, faces, "+proj=longlat +datum=WGS84")
            .unwrap()
            .with_colors(array![[10, 20, 30], [40, 50, 60]])
            .unwrap()
    }

    #[test]
    fn rejects_dangling_indices() {
        let out = Geometry::new(array![[0., 0., 0.]], array![[0, 0, 1]], "");
        assert!(matches!(out, Err(InvalidGeometry::IndexOutOfBounds(_))));

        let out = Geometry::new(array![[0., 0., 0.]], array![[0, 0, -1]], "");
        assert!(matches!(out, Err(InvalidGeometry::IndexOutOfBounds(_))));

        let out = Geometry::new(array![[0., 0.]], array![[0, 0, 0]], "");
        assert!(matches!(out, Err(InvalidGeometry::WrongWidth(_))));
    }

    #[test]
    fn validate_catches_later_edits() {
        let mut geometry = two_triangles();
        assert!(geometry.validate().is_ok());

        geometry.faces[[1, 2]] = 5;
        assert!(matches!(
            geometry.validate(),
            Err(InvalidGeometry::IndexOutOfBounds(_))
        ));
    }

    #[test]
    fn sub_mesh_drops_and_remaps_points() {
        let geometry = two_triangles();
        let sub = geometry.extract_sub_mesh(&[1]).unwrap();

        assert_eq!(sub.num_faces(), 1);
        assert_eq!(sub.num_points(), 3);
        assert_eq!(sub.faces, array![[0, 1, 2]]);
        assert_eq!(
            sub.points,
            array![[1., 0., 0.], [2., 0., 1.], [1.5, -1., 1.]]
        );
        assert_eq!(sub.colors, Some(array![[40, 50, 60]]));
        assert_eq!(sub.projection, geometry.projection);
    }

    #[test]
    fn sub_mesh_keeps_shared_points_once() {
        let geometry = two_triangles();
        let sub = geometry.extract_sub_mesh(&[1, 0]).unwrap();

        assert_eq!(sub.num_points(), 5);
        assert_eq!(sub.faces, array![[1, 3, 4], [0, 1, 2]]);
    }

    #[test]
    fn sub_mesh_face_out_of_bounds() {
        let out = two_triangles().extract_sub_mesh(&[2]);
        assert!(matches!(out, Err(InvalidGeometry::FaceOutOfBounds(_))));
    }
}
