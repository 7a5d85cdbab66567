//! Decision requests.

use serde::{Deserialize, Serialize};

use super::attribute::Attribute;
use super::identifier::Identifier;

/// One category's worth of request material: attributes plus an optional
/// structured-content blob the attribute selectors query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAttributes {
    pub category: Identifier,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<serde_json::Value>,
}

impl RequestAttributes {
    pub fn new(category: impl Into<Identifier>) -> Self {
        RequestAttributes {
            category: category.into(),
            attributes: Vec::new(),
            content: None,
        }
    }
}

/// A single-decision request: attribute groups keyed by category. Multi-
/// decision wrappers iterate this type and are out of scope for the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub groups: Vec<RequestAttributes>,
}

impl Request {
    pub fn new() -> Self {
        Request::default()
    }

    /// Add an attribute, grouping it under its category.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.add_attribute(attribute);
        self
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        let category = attribute.category().clone();
        match self.groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.attributes.push(attribute),
            None => {
                let mut group = RequestAttributes::new(category);
                group.attributes.push(attribute);
                self.groups.push(group);
            }
        }
    }

    /// Attach structured content to a category group.
    pub fn with_content(mut self, category: impl Into<Identifier>, content: serde_json::Value) -> Self {
        let category = category.into();
        match self.groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.content = Some(content),
            None => {
                let mut group = RequestAttributes::new(category);
                group.content = Some(content);
                self.groups.push(group);
            }
        }
        self
    }

    pub fn attributes_in<'a>(
        &'a self,
        category: &'a Identifier,
    ) -> impl Iterator<Item = &'a Attribute> {
        self.groups
            .iter()
            .filter(move |g| &g.category == category)
            .flat_map(|g| g.attributes.iter())
    }

    pub fn content(&self, category: &Identifier) -> Option<&serde_json::Value> {
        self.groups
            .iter()
            .find(|g| &g.category == category)
            .and_then(|g| g.content.as_ref())
    }
}
