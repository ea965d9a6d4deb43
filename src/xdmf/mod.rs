//! The XML half of an archive entry.
//!
//! Metadata documents follow the XDMF layout: a `Domain` holding either one static `Grid` or a
//! temporal collection of grids. Every `DataItem` addresses the payload of one container
//! dataset with XDMF's own `Binary` format (file, byte offset and endianness), so any XDMF
//! reader can load the arrays, and names the dataset path it came from. Documents are handled
//! as an in-memory [`Element`] tree so that an existing document can be loaded, used as a
//! template, extended and written back.

mod document;
mod element;
pub mod error;

pub use document::{indent, Document};
pub use element::Element;
pub use error::DocumentError;

use crate::field::{AttributeType, NumberType};

pub const DOCTYPE: &str = r#"Xdmf SYSTEM "Xdmf.dtd" []"#;
pub const VERSION: &str = "3.0";

/// the grid of a static document, relative to the root
pub const GRID: &str = "Domain/Grid";
pub const GEOMETRY_ITEM: &str = "Geometry/DataItem";
pub const TOPOLOGY: &str = "Topology";
pub const TOPOLOGY_ITEM: &str = "Topology/DataItem";

/// an empty `Xdmf` document around `domain`
pub fn xdmf_document(domain: Element) -> Document {
    let root = Element::new("Xdmf")
        .with_attribute("Version", VERSION)
        .with_child(domain);
    Document::new(Some(DOCTYPE.into()), root)
}

/// space separated dimensions, slowest varying first
pub fn dimensions(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|dim| dim.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A `DataItem` for dataset `path` of container `file`, whose payload starts `seek` bytes
/// into the file.
///
/// ```
/// use tin_archive::{xdmf, NumberType};
///
/// let item = xdmf::data_item("m1.tbc", "/tin/faces", 120, NumberType::Int, &[4, 3]);
/// assert_eq!(item.attribute("Format"), Some("Binary"));
/// assert_eq!(item.attribute("Seek"), Some("120"));
/// assert_eq!(item.attribute("Name"), Some("/tin/faces"));
/// assert_eq!(item.trimmed_text(), "m1.tbc");
/// ```
pub fn data_item(
    file: &str,
    path: &str,
    seek: u64,
    number_type: NumberType,
    shape: &[usize],
) -> Element {
    Element::new("DataItem")
        .with_attribute("Name", path)
        .with_attribute("Format", "Binary")
        .with_attribute("Endian", "Little")
        .with_attribute("Seek", seek.to_string())
        .with_attribute("DataType", number_type.data_type())
        .with_attribute("Precision", number_type.precision())
        .with_attribute("Dimensions", dimensions(shape))
        .with_text(file)
}

/// a per-face `Attribute` wrapping `item`
pub fn cell_attribute(name: &str, attribute_type: AttributeType, item: Element) -> Element {
    Element::new("Attribute")
        .with_attribute("Name", name)
        .with_attribute("Center", "Cell")
        .with_attribute("AttributeType", attribute_type.as_str())
        .with_child(item)
}

pub fn information<N: Into<String>, V: Into<String>>(name: N, value: V) -> Element {
    Element::new("Information")
        .with_attribute("Name", name)
        .with_attribute("Value", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_data_item() {
        let item = data_item(
            "m1.tbc",
            "/tin/face_fields/cover_color",
            512,
            NumberType::Int,
            &[12, 3],
        );

        assert_eq!(item.attribute("Name"), Some("/tin/face_fields/cover_color"));
        assert_eq!(item.attribute("Endian"), Some("Little"));
        assert_eq!(item.attribute("Seek"), Some("512"));
        assert_eq!(item.attribute("DataType"), Some("Int"));
        assert_eq!(item.attribute("Precision"), Some("4"));
        assert_eq!(item.attribute("Dimensions"), Some("12 3"));
        assert_eq!(item.trimmed_text(), "m1.tbc");

        let attribute = cell_attribute("cover_color", AttributeType::Vector, item);
        assert_eq!(attribute.attribute("AttributeType"), Some("Vector"));
        assert_eq!(attribute.attribute("Center"), Some("Cell"));
    }

    #[test]
    fn document_skeleton() {
        let document = xdmf_document(Element::new("Domain"));
        let text = document.to_xml_string().unwrap();
        assert!(text.starts_with(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE Xdmf SYSTEM \"Xdmf.dtd\" []>\n"
        ));
        assert!(text.contains("<Xdmf Version=\"3.0\"><Domain/></Xdmf>"));
    }
}
