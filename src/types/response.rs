//! Decision responses.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use super::attribute_value::AttributeValue;
use super::decision::Decision;
use super::identifier::Identifier;
use super::status::Status;
use super::version::Version;

/// An evaluated attribute assignment inside an obligation or advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssignment {
    pub attribute_id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer: Option<String>,
    pub value: AttributeValue,
}

/// A directive the enforcement point must discharge along with the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: Identifier,
    #[serde(default)]
    pub assignments: Vec<AttributeAssignment>,
}

/// A directive the enforcement point may act on; ignorable, unlike an
/// obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub id: Identifier,
    #[serde(default)]
    pub assignments: Vec<AttributeAssignment>,
}

/// Identifies one policy or policy set that contributed to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIdentifier {
    pub id: Identifier,
    pub version: Version,
}

impl Display for PolicyIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} v{}", self.id, self.version)
    }
}

/// The outcome of one decision request. Always carries a decision — faults
/// degrade to `Indeterminate` with a readable status, they never escape as
/// errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub decision: Decision,
    pub status: Status,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    #[serde(default)]
    pub advice: Vec<Advice>,
    #[serde(default)]
    pub policy_ids: Vec<PolicyIdentifier>,
}

impl Response {
    pub fn new(decision: Decision, status: Status) -> Self {
        Response {
            decision,
            status,
            obligations: Vec::new(),
            advice: Vec::new(),
            policy_ids: Vec::new(),
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.decision, self.status)
    }
}
