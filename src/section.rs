use serde::Serialize;

use crate::parser::ParseWarning;

/// An ordered collection of sections, in order of first appearance in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    sections: Vec<Section>,
    #[serde(skip)]
    warnings: Vec<ParseWarning>,
}

impl Document {
    #[must_use]
    pub(crate) fn new(sections: Vec<Section>, warnings: Vec<ParseWarning>) -> Self {
        Self { sections, warnings }
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title == title)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(Section::title)
    }

    #[must_use]
    pub fn get(&self, title: &str, key: &str) -> Option<&str> {
        self.section(title).and_then(|section| section.get(key))
    }

    /// Lines that were skipped or adjusted while parsing.
    #[must_use]
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    properties: Vec<Property>,
}

impl Section {
    #[must_use]
    pub(crate) fn new(title: String) -> Self {
        Self {
            title,
            properties: Vec::with_capacity(16),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|property| property.key == key)
            .map(Property::value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.iter().any(|property| property.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(Property::key)
    }

    /// Set `key` to `value`, returning the value it replaced. A replaced key keeps its position.
    pub(crate) fn insert(&mut self, key: String, value: String) -> Option<String> {
        if let Some(property) = self.properties.iter_mut().find(|p| p.key == key) {
            Some(std::mem::replace(&mut property.value, value))
        } else {
            self.properties.push(Property { key, value });
            None
        }
    }

    pub(crate) fn clear(&mut self) {
        self.properties.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The raw, trimmed value. Typed interpretation happens in the accessors.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}
