use crate::error::PdpError;
use crate::policy::PolicyDef;

/// Parse one policy definition from its JSON representation.
///
/// The XACML XML wire format belongs to a separate binding layer; this is
/// the crate's native load-from-text entry point.
///
/// Example:
/// ```rust
/// use canopy_core::{Effect, Policy, Rule, policy_from_json};
/// let policy = Policy::new(
///     "urn:example:policy",
///     "1.0".parse().unwrap(),
///     "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides",
/// )
/// .with_rule(Rule::new("permit-all", Effect::Permit));
/// let text = serde_json::to_string(&canopy_core::PolicyDef::Policy(policy)).unwrap();
/// assert!(policy_from_json(&text).is_ok());
/// ```
pub fn policy_from_json(text: &str) -> Result<PolicyDef, PdpError> {
    serde_json::from_str(text).map_err(|e| PdpError::ParseError(e.to_string()))
}

/// Parse a list of root policy definitions from JSON.
pub fn policies_from_json(text: &str) -> Result<Vec<PolicyDef>, PdpError> {
    serde_json::from_str(text).map_err(|e| PdpError::ParseError(e.to_string()))
}
