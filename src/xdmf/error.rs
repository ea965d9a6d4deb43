use derive_more::{Constructor, Display, From};

#[derive(Debug, thiserror::Error, From)]
pub enum DocumentError {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingElement(MissingElement),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    InvalidAttributeValue(InvalidAttributeValue),
    #[error("{0}")]
    Unclosed(Unclosed),
    #[error("xml document is not valid utf-8: {0}")]
    Utf8(std::string::FromUtf8Error),
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {xml_err}")]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {att_err}")]
pub struct MalformedAttribute {
    att_err: quick_xml::events::attributes::AttrError,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "missing element `{name}` in {parent}")]
pub struct MissingElement {
    parent: String,
    name: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "missing attribute `{attribute_name}` in {element_name} element")]
pub struct MissingAttribute {
    element_name: String,
    attribute_name: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "attribute `{attribute_name}` of {element_name} element has unusable value `{value}`")]
pub struct InvalidAttributeValue {
    element_name: String,
    attribute_name: String,
    value: String,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "document ended before element `{name}` was closed")]
pub struct Unclosed {
    name: String,
}
