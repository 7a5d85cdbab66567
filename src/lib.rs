// src/lib.rs
pub use engine::PdpEngine;
pub use error::PdpError;
pub use expr::{
    AttributeDesignator, AttributeSelector, Expression, ExpressionResult, QuantifiedExpression,
    Quantifier, VariableDefinition,
};
pub use loader::{policies_from_json, policy_from_json};
pub use combining::CombiningAlgorithm;
pub use policy::{
    AdviceExpression, AllOf, AnyOf, AttributeAssignmentExpression, Match, ObligationExpression,
    Policy, PolicyDef, PolicyFinder, PolicySet, PolicySetChild, Rule, Target,
};
pub use traits::{AttributeQuery, AttributeSource, DocumentLoader, EmptyAttributeSource};
pub use types::{
    Advice, Attribute, AttributeAssignment, AttributeValue, Bag, DayTimeDuration, Decision,
    Effect, ExtendedIndeterminate, IdReferenceMatch, Identifier, MissingAttributeDetail,
    Obligation, PolicyIdentifier, Request, RequestAttributes, Response, Rfc822Name, Status,
    StatusCode, StatusDetail, Value, Version, VersionMatch, X500Name, YearMonthDuration, ids,
};

mod combining;
mod context;
mod engine;
mod error;
mod expr;
mod functions;
mod loader;
mod policy;
mod traits;
mod types;
