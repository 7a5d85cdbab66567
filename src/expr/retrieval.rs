//! Attribute retrieval: designators against the attribute source, selectors
//! against request content.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::EvaluationContext;
use crate::traits::AttributeQuery;
use crate::types::{
    AttributeValue, Bag, Identifier, MissingAttributeDetail, Status,
};

use super::ExpressionResult;

/// Retrieves a bag of attribute values by `(category, attribute id, data
/// type, issuer?)`. Request attributes are consulted first, then the
/// attribute source; responses are cached for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDesignator {
    category: Identifier,
    attribute_id: Identifier,
    data_type: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    issuer: Option<String>,
    #[serde(default)]
    must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(
        category: impl Into<Identifier>,
        attribute_id: impl Into<Identifier>,
        data_type: impl Into<Identifier>,
    ) -> Self {
        AttributeDesignator {
            category: category.into(),
            attribute_id: attribute_id.into(),
            data_type: data_type.into(),
            issuer: None,
            must_be_present: false,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Absence becomes `Error(missing-attribute)` instead of `Empty`.
    pub fn required(mut self) -> Self {
        self.must_be_present = true;
        self
    }

    pub fn data_type(&self) -> &Identifier {
        &self.data_type
    }

    fn query(&self) -> AttributeQuery {
        AttributeQuery {
            category: self.category.clone(),
            attribute_id: self.attribute_id.clone(),
            data_type: self.data_type.clone(),
            issuer: self.issuer.clone(),
        }
    }

    fn missing_detail(&self) -> MissingAttributeDetail {
        MissingAttributeDetail {
            category: self.category.clone(),
            attribute_id: self.attribute_id.clone(),
            data_type: self.data_type.clone(),
            issuer: self.issuer.clone(),
        }
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> ExpressionResult {
        let (status, attributes) = ctx.attributes(&self.query());
        if !status.is_ok() {
            return ExpressionResult::Error(status);
        }

        let values: Bag = attributes
            .iter()
            .flat_map(|attribute| attribute.values_of_type(&self.data_type))
            .cloned()
            .collect();

        if values.is_empty() {
            debug!(
                event = "Designator",
                phase = "Miss",
                category = self.category.as_str(),
                attribute_id = self.attribute_id.as_str(),
                required = self.must_be_present,
            );
            return self.none_found();
        }
        ExpressionResult::Bag(values)
    }

    fn none_found(&self) -> ExpressionResult {
        if self.must_be_present {
            ExpressionResult::Error(Status::missing_attribute(
                format!(
                    "no value for mandatory attribute {} in {}",
                    self.attribute_id, self.category
                ),
                self.missing_detail(),
            ))
        } else {
            ExpressionResult::Empty
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        if self.category.as_str().is_empty() {
            return Err(Status::syntax_error("designator is missing its category"));
        }
        if self.attribute_id.as_str().is_empty() {
            return Err(Status::syntax_error("designator is missing its attribute id"));
        }
        if self.data_type.as_str().is_empty() {
            return Err(Status::syntax_error("designator is missing its data type"));
        }
        Ok(())
    }
}

/// Retrieves a bag of attribute values by evaluating a structured-content
/// query (a JSON pointer) against the category's content blob, coercing each
/// matched value to the selector's data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelector {
    category: Identifier,
    path: String,
    data_type: Identifier,
    #[serde(default)]
    must_be_present: bool,
}

impl AttributeSelector {
    pub fn new(
        category: impl Into<Identifier>,
        path: impl Into<String>,
        data_type: impl Into<Identifier>,
    ) -> Self {
        AttributeSelector {
            category: category.into(),
            path: path.into(),
            data_type: data_type.into(),
            must_be_present: false,
        }
    }

    /// Absence becomes `Error(missing-attribute)` instead of `Empty`.
    pub fn required(mut self) -> Self {
        self.must_be_present = true;
        self
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> ExpressionResult {
        let Some(content) = ctx.content(&self.category) else {
            return self.none_found();
        };
        let Some(found) = content.pointer(&self.path) else {
            return self.none_found();
        };

        let matched: Vec<&serde_json::Value> = match found {
            serde_json::Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        if matched.is_empty() {
            return self.none_found();
        }

        let mut values = Bag::new();
        for item in matched {
            match self.coerce(item) {
                Ok(value) => values.add(value),
                Err(status) => return ExpressionResult::Error(status),
            }
        }
        ExpressionResult::Bag(values)
    }

    fn coerce(&self, item: &serde_json::Value) -> Result<AttributeValue, Status> {
        use crate::types::ids;
        match item {
            serde_json::Value::String(s) => AttributeValue::from_lexical(&self.data_type, s),
            serde_json::Value::Bool(b) if self.data_type.as_str() == ids::DT_BOOLEAN => {
                Ok(AttributeValue::boolean(*b))
            }
            serde_json::Value::Number(n) if self.data_type.as_str() == ids::DT_INTEGER => n
                .as_i64()
                .map(AttributeValue::integer)
                .ok_or_else(|| {
                    Status::syntax_error(format!("content value {n} is not an integer"))
                }),
            serde_json::Value::Number(n) if self.data_type.as_str() == ids::DT_DOUBLE => n
                .as_f64()
                .map(AttributeValue::double)
                .ok_or_else(|| Status::syntax_error(format!("content value {n} is not a double"))),
            other => Err(Status::syntax_error(format!(
                "content value {other} cannot be read as {}",
                self.data_type
            ))),
        }
    }

    fn none_found(&self) -> ExpressionResult {
        if self.must_be_present {
            ExpressionResult::Error(Status::missing_attribute(
                format!(
                    "no content at '{}' in {} for mandatory selector",
                    self.path, self.category
                ),
                MissingAttributeDetail {
                    category: self.category.clone(),
                    attribute_id: Identifier::from(self.path.as_str()),
                    data_type: self.data_type.clone(),
                    issuer: None,
                },
            ))
        } else {
            ExpressionResult::Empty
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        if self.category.as_str().is_empty() {
            return Err(Status::syntax_error("selector is missing its category"));
        }
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return Err(Status::syntax_error(format!(
                "selector path '{}' is not a JSON pointer",
                self.path
            )));
        }
        if self.data_type.as_str().is_empty() {
            return Err(Status::syntax_error("selector is missing its data type"));
        }
        Ok(())
    }
}
