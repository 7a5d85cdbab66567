//! Named attributes as supplied by requests and attribute sources.

use serde::{Deserialize, Serialize};

use super::attribute_value::AttributeValue;
use super::identifier::Identifier;

/// An attribute: a categorized, named set of values with an optional issuer.
/// Values within one attribute need not share a data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    category: Identifier,
    attribute_id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    issuer: Option<String>,
    #[serde(default)]
    include_in_result: bool,
    values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(
        category: impl Into<Identifier>,
        attribute_id: impl Into<Identifier>,
        values: Vec<AttributeValue>,
    ) -> Self {
        Attribute {
            category: category.into(),
            attribute_id: attribute_id.into(),
            issuer: None,
            include_in_result: false,
            values,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_include_in_result(mut self, include: bool) -> Self {
        self.include_in_result = include;
        self
    }

    pub fn category(&self) -> &Identifier {
        &self.category
    }

    pub fn attribute_id(&self) -> &Identifier {
        &self.attribute_id
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn include_in_result(&self) -> bool {
        self.include_in_result
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// The values carrying the given data type.
    pub fn values_of_type<'a>(
        &'a self,
        data_type: &'a Identifier,
    ) -> impl Iterator<Item = &'a AttributeValue> {
        self.values.iter().filter(move |v| v.data_type() == data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::identifier::ids;

    #[test]
    fn test_values_of_type_filters() {
        let attribute = Attribute::new(
            ids::CATEGORY_SUBJECT,
            "urn:example:role",
            vec![
                AttributeValue::string("admin"),
                AttributeValue::integer(3),
                AttributeValue::string("auditor"),
            ],
        );
        let dt = Identifier::from(ids::DT_STRING);
        let strings: Vec<_> = attribute.values_of_type(&dt).collect();
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn test_builder_defaults() {
        let attribute = Attribute::new(ids::CATEGORY_SUBJECT, "urn:example:role", vec![]);
        assert!(attribute.issuer().is_none());
        assert!(!attribute.include_in_result());

        let issued = attribute.with_issuer("https://idp.example.org");
        assert_eq!(issued.issuer(), Some("https://idp.example.org"));
    }
}
