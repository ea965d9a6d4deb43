//! Render meshes as JavaScript constants for the browser viewer.
//!
//! Every function produces lines without a trailing newline; [`write_lines`] adds them.
//!
//! ```
//! use tin_archive::js_export::face_vector_to_lines;
//! use tin_archive::ndarray::array;
//!
//! let lines = face_vector_to_lines("faces", &array![[0, 1, 2], [1, 3, 2]]);
//! assert_eq!(lines, vec!["const faces = [", "    0, 1, 2,", "    1, 3, 2,", "];\n"]);
//! ```

use crate::geometry::{IndexOutOfBounds, InvalidGeometry};
use crate::utils::format_float;

use ndarray::{Array2, ArrayView1, Axis};
use std::io::{self, Write};

/// a `const` array literal with one line per face
pub fn face_vector_to_lines(name: &str, faces: &Array2<i32>) -> Vec<String> {
    let mut lines = Vec::with_capacity(faces.nrows() + 2);
    lines.push(format!("const {name} = ["));
    for face in faces.axis_iter(Axis(0)) {
        let indices: Vec<String> = face.iter().map(|idx| idx.to_string()).collect();
        lines.push(format!("    {},", indices.join(", ")));
    }
    lines.push("];\n".into());
    lines
}

/// a `Float32Array` with one line per point; anonymous when `name` is `None`
pub fn point_vector_to_lines(name: Option<&str>, points: &Array2<f64>) -> Vec<String> {
    let mut lines = Vec::with_capacity(points.nrows() + 2);
    lines.push(open_float_array(name));
    for point in points.axis_iter(Axis(0)) {
        lines.push(point_line(point));
    }
    lines.push(close_float_array(name));
    lines
}

/// a `Float32Array` listing the three corner points of every face in turn
pub fn face_and_point_vector_to_lines(
    name: Option<&str>,
    faces: &Array2<i32>,
    points: &Array2<f64>,
) -> Result<Vec<String>, InvalidGeometry> {
    let num_points = points.nrows();

    let mut lines = Vec::with_capacity(faces.len() + 2);
    lines.push(open_float_array(name));
    for (face_idx, face) in faces.axis_iter(Axis(0)).enumerate() {
        for &idx in face {
            if idx < 0 || idx as usize >= num_points {
                return Err(IndexOutOfBounds::new(face_idx, idx, num_points).into());
            }
            lines.push(point_line(points.row(idx as usize)));
        }
    }
    lines.push(close_float_array(name));

    Ok(lines)
}

/// write every line followed by a newline
pub fn write_lines<W: Write, S: AsRef<str>>(writer: &mut W, lines: &[S]) -> io::Result<()> {
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn open_float_array(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("const {name} = new Float32Array( ["),
        None => "new Float32Array( [".into(),
    }
}

fn close_float_array(name: Option<&str>) -> String {
    match name {
        Some(_) => "] );".into(),
        None => "] )".into(),
    }
}

fn point_line(point: ArrayView1<f64>) -> String {
    let coordinates: Vec<String> = point.iter().map(|x| format_float(*x)).collect();
    format!("    {},", coordinates.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn named_and_anonymous_points() {
        let points = array![[0., 0.5, 1.], [2., 3., 4.25]];

        assert_eq!(
            point_vector_to_lines(Some("vertices"), &points),
            vec![
                "const vertices = new Float32Array( [",
                "    0.0, 0.5, 1.0,",
                "    2.0, 3.0, 4.25,",
                "] );",
            ]
        );

        let anonymous = point_vector_to_lines(None, &points);
        assert_eq!(anonymous.first().unwrap(), "new Float32Array( [");
        assert_eq!(anonymous.last().unwrap(), "] )");
    }

    #[test]
    fn faces_expanded_to_points() {
        let points = array![[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]];
        let faces = array![[2, 0, 1]];

        let lines = face_and_point_vector_to_lines(None, &faces, &points).unwrap();
        assert_eq!(
            lines,
            vec![
                "new Float32Array( [",
                "    0.0, 1.0, 0.0,",
                "    0.0, 0.0, 0.0,",
                "    1.0, 0.0, 0.0,",
                "] )",
            ]
        );

        let out = face_and_point_vector_to_lines(None, &array![[0, 1, 3]], &points);
        assert!(matches!(out, Err(InvalidGeometry::IndexOutOfBounds(_))));
    }

    #[test]
    fn lines_are_newline_terminated() {
        let mut out = Vec::new();
        write_lines(&mut out, &face_vector_to_lines("f", &array![[0, 1, 2]])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "const f = [\n    0, 1, 2,\n];\n\n");
    }
}
