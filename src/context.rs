//! Per-request evaluation state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::policy::{PolicyDef, PolicyFinder};
use crate::expr::ExpressionResult;
use crate::traits::{AttributeQuery, AttributeSource};
use crate::types::{
    Attribute, IdReferenceMatch, Identifier, PolicyIdentifier, Request, Status,
};

/// Binds one decision request to its attribute source and policy finder, and
/// owns everything request-scoped: the attribute-response cache, the
/// variable memo table, and the policy-id trail. Dropped when the request
/// completes; nothing here outlives it.
pub(crate) struct EvaluationContext<'a> {
    request: &'a Request,
    source: &'a dyn AttributeSource,
    finder: &'a PolicyFinder,
    attribute_cache: HashMap<AttributeQuery, (Status, Vec<Attribute>)>,
    variable_cache: HashMap<(Identifier, String), ExpressionResult>,
    variables_in_flight: Vec<(Identifier, String)>,
    policy_trail: Vec<PolicyIdentifier>,
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn new(
        request: &'a Request,
        source: &'a dyn AttributeSource,
        finder: &'a PolicyFinder,
    ) -> Self {
        EvaluationContext {
            request,
            source,
            finder,
            attribute_cache: HashMap::new(),
            variable_cache: HashMap::new(),
            variables_in_flight: Vec::new(),
            policy_trail: Vec::new(),
        }
    }

    /// Resolve an attribute query: request attributes first, then the
    /// attribute source, with responses cached for the rest of the request.
    /// An unset query issuer accepts any issuer; a set one must match
    /// exactly.
    pub(crate) fn attributes(&mut self, query: &AttributeQuery) -> (Status, Vec<Attribute>) {
        if let Some(hit) = self.attribute_cache.get(query) {
            return hit.clone();
        }

        let from_request: Vec<Attribute> = self
            .request
            .attributes_in(&query.category)
            .filter(|attribute| attribute.attribute_id() == &query.attribute_id)
            .filter(|attribute| match &query.issuer {
                None => true,
                Some(issuer) => attribute.issuer() == Some(issuer.as_str()),
            })
            .cloned()
            .collect();

        let response = if from_request.is_empty() {
            self.source.attributes(query)
        } else {
            (Status::ok(), from_request)
        };
        self.attribute_cache.insert(query.clone(), response.clone());
        response
    }

    /// The structured content attached to a category, if any.
    pub(crate) fn content(&self, category: &Identifier) -> Option<&serde_json::Value> {
        self.request.content(category)
    }

    pub(crate) fn resolve_policy(
        &self,
        reference: &IdReferenceMatch,
    ) -> Result<Arc<PolicyDef>, Status> {
        self.finder.policy(reference)
    }

    pub(crate) fn resolve_policy_set(
        &self,
        reference: &IdReferenceMatch,
    ) -> Result<Arc<PolicyDef>, Status> {
        self.finder.policy_set(reference)
    }

    pub(crate) fn variable_cached(
        &self,
        key: &(Identifier, String),
    ) -> Option<ExpressionResult> {
        self.variable_cache.get(key).cloned()
    }

    pub(crate) fn cache_variable(&mut self, key: (Identifier, String), result: ExpressionResult) {
        self.variable_cache.insert(key, result);
    }

    /// Mark a variable as being resolved; false when it already is, which
    /// means the definitions are circular.
    pub(crate) fn push_variable(&mut self, key: (Identifier, String)) -> bool {
        if self.variables_in_flight.contains(&key) {
            return false;
        }
        self.variables_in_flight.push(key);
        true
    }

    pub(crate) fn pop_variable(&mut self) {
        self.variables_in_flight.pop();
    }

    /// Record a policy that contributed a Permit or Deny, in evaluation
    /// order.
    pub(crate) fn record_policy(&mut self, id: PolicyIdentifier) {
        self.policy_trail.push(id);
    }

    pub(crate) fn take_policy_trail(&mut self) -> Vec<PolicyIdentifier> {
        std::mem::take(&mut self.policy_trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EmptyAttributeSource;
    use crate::types::{AttributeValue, ids};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn query() -> AttributeQuery {
        AttributeQuery {
            category: Identifier::from(ids::CATEGORY_SUBJECT),
            attribute_id: Identifier::from("urn:example:role"),
            data_type: Identifier::from(ids::DT_STRING),
            issuer: None,
        }
    }

    #[test]
    fn test_source_responses_are_cached_per_request() {
        struct CountingSource(AtomicUsize);
        impl AttributeSource for CountingSource {
            fn attributes(&self, query: &AttributeQuery) -> (Status, Vec<Attribute>) {
                self.0.fetch_add(1, Ordering::SeqCst);
                (
                    Status::ok(),
                    vec![Attribute::new(
                        query.category.clone(),
                        query.attribute_id.clone(),
                        vec![AttributeValue::string("admin")],
                    )],
                )
            }
        }

        let request = Request::new();
        let finder = PolicyFinder::new(vec![]).unwrap();
        let source = CountingSource(AtomicUsize::new(0));
        let mut ctx = EvaluationContext::new(&request, &source, &finder);

        let (status, first) = ctx.attributes(&query());
        assert!(status.is_ok());
        assert_eq!(first.len(), 1);
        let (_, second) = ctx.attributes(&query());
        assert_eq!(second.len(), 1);
        assert_eq!(source.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_attributes_shadow_the_source() {
        struct LoudSource;
        impl AttributeSource for LoudSource {
            fn attributes(&self, _query: &AttributeQuery) -> (Status, Vec<Attribute>) {
                panic!("request-provided attributes must win");
            }
        }

        let request = Request::new().with_attribute(Attribute::new(
            ids::CATEGORY_SUBJECT,
            "urn:example:role",
            vec![AttributeValue::string("auditor")],
        ));
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(&request, &LoudSource, &finder);
        let (_, attributes) = ctx.attributes(&query());
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn test_variable_cycle_guard() {
        let request = Request::new();
        let finder = PolicyFinder::new(vec![]).unwrap();
        let mut ctx = EvaluationContext::new(&request, &EmptyAttributeSource, &finder);
        let key = (Identifier::from("urn:example:policy"), "x".to_string());
        assert!(ctx.push_variable(key.clone()));
        assert!(!ctx.push_variable(key.clone()));
        ctx.pop_variable();
        assert!(ctx.push_variable(key));
    }
}
