use super::error::{self, DocumentError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// A node of the metadata document.
///
/// Character data is kept the way `ElementTree` keeps it: `text` is what comes directly after
/// the opening tag, and `tail` is what follows the closing tag inside the parent. This keeps
/// mixed content (a `DataItem` file name followed by an `Information` child) intact when a
/// document is read, edited and written back.
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub tail: Option<String>,
}

impl Element {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// set an attribute, keeping its position if it already exists
    pub fn set_attribute<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// like [`Element::attribute`], but a missing attribute is an error
    pub fn require_attribute(&self, key: &str) -> Result<&str, DocumentError> {
        self.attribute(key)
            .ok_or_else(|| error::MissingAttribute::new(self.name.clone(), key.into()).into())
    }

    /// append a child and return a handle to it
    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn sub_element<T: Into<String>>(&mut self, name: T) -> &mut Element {
        self.push(Element::new(name))
    }

    pub fn insert(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// first direct child named `name`
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// follow a `/` separated chain of child names, such as `Domain/Grid`
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        path.split('/').try_fold(self, |element, name| element.find(name))
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut Element> {
        path.split('/')
            .try_fold(self, |element, name| element.find_mut(name))
    }

    /// like [`Element::find_path`], but a missing element is an error
    pub fn require_path(&self, path: &str) -> Result<&Element, DocumentError> {
        self.find_path(path)
            .ok_or_else(|| error::MissingElement::new(self.name.clone(), path.into()).into())
    }

    pub fn require_path_mut(&mut self, path: &str) -> Result<&mut Element, DocumentError> {
        let parent = self.name.clone();
        self.find_path_mut(path)
            .ok_or_else(|| error::MissingElement::new(parent, path.into()).into())
    }

    /// drop every direct child for which `keep` returns false
    pub fn retain_children<F: FnMut(&Element) -> bool>(&mut self, keep: F) {
        self.children.retain(keep);
    }

    /// text with surrounding whitespace removed
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Element {
        Element::new("Grid")
            .with_attribute("Name", "tin")
            .with_child(Element::new("Geometry").with_child(Element::new("DataItem")))
            .with_child(Element::new("Attribute").with_attribute("Name", "a"))
            .with_child(Element::new("Attribute").with_attribute("Name", "b"))
    }

    #[test]
    fn attributes_keep_their_order() {
        let mut element = Element::new("DataItem")
            .with_attribute("Format", "Binary")
            .with_attribute("Dimensions", "3 3");
        element.set_attribute("Format", "XML");

        let attributes: Vec<_> = element.attributes().collect();
        assert_eq!(attributes, vec![("Format", "XML"), ("Dimensions", "3 3")]);
        assert!(element.require_attribute("Precision").is_err());
    }

    #[test]
    fn lookups() {
        let mut grid = grid();
        assert!(grid.find_path("Geometry/DataItem").is_some());
        assert!(grid.find_path("Topology/DataItem").is_none());
        assert_eq!(grid.find_all("Attribute").count(), 2);

        grid.find_path_mut("Geometry/DataItem")
            .unwrap()
            .set_attribute("Format", "Binary");
        assert_eq!(
            grid.require_path("Geometry/DataItem").unwrap().attribute("Format"),
            Some("Binary")
        );
    }

    #[test]
    fn retain_children_by_name() {
        let mut grid = grid();
        grid.retain_children(|child| child.name != "Attribute");
        assert_eq!(grid.children.len(), 1);

        grid.insert(0, Element::new("Time"));
        assert_eq!(grid.children[0].name, "Time");
    }
}
