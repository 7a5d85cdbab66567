//! Boundary contracts: the attribute source (PIP) and the document loader.

use serde::{Deserialize, Serialize};

use crate::error::PdpError;
use crate::policy::PolicyDef;
use crate::types::{Attribute, Identifier, Status};

/// One attribute retrieval request, as issued by an attribute designator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeQuery {
    pub category: Identifier,
    pub attribute_id: Identifier,
    pub data_type: Identifier,
    pub issuer: Option<String>,
}

/// Supplies attribute values not present in the request. Implementations must
/// tolerate repeated identical queries within one request; the evaluation
/// context caches responses per request on top of whatever caching the source
/// itself does.
pub trait AttributeSource: Send + Sync {
    fn attributes(&self, query: &AttributeQuery) -> (Status, Vec<Attribute>);
}

/// An attribute source with nothing to say. Requests evaluated against it see
/// only their own attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyAttributeSource;

impl AttributeSource for EmptyAttributeSource {
    fn attributes(&self, _query: &AttributeQuery) -> (Status, Vec<Attribute>) {
        (Status::ok(), Vec::new())
    }
}

/// Loads a policy definition from an absolute-URI location, consulted only
/// when a policy reference cannot be satisfied from the in-memory index.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, id: &Identifier) -> Result<PolicyDef, PdpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_returns_ok_and_nothing() {
        let query = AttributeQuery {
            category: Identifier::from(crate::types::ids::CATEGORY_SUBJECT),
            attribute_id: Identifier::from("urn:example:role"),
            data_type: Identifier::from(crate::types::ids::DT_STRING),
            issuer: None,
        };
        let (status, attributes) = EmptyAttributeSource.attributes(&query);
        assert!(status.is_ok());
        assert!(attributes.is_empty());
    }
}
